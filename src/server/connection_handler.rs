use super::{Connection, ConnectionId, Hub, RelayError};
use axum::extract::ws::Message;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, instrument, warn};

/// Drives one participant through the hub: admission, inbound frames, departure.
#[derive(Clone)]
pub struct ConnectionHandler {
    hub: Hub,
    connection: Option<Connection>,
}

impl ConnectionHandler {
    pub fn new(hub: Hub) -> Self {
        ConnectionHandler {
            hub,
            connection: None,
        }
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    /// Admits a participant writing through `sender`, then sends it the active
    /// session, if any.
    ///
    /// Admission comes first so a session created concurrently reaches the
    /// newcomer through either the broadcast or the catch-up.
    #[instrument(skip(self, sender))]
    pub async fn connect(&self, sender: Sender<Message>) -> Self {
        let connection = Connection::new(sender);
        self.hub.registry().admit(connection.clone()).await;
        let synced = self.hub.lifecycle().on_admit(&connection).await;
        info!(connection_id = %connection.id, synced, "Participant connected");

        ConnectionHandler {
            hub: self.hub.clone(),
            connection: Some(connection),
        }
    }

    /// Relays a text frame from this participant. Rejected frames are logged and dropped.
    #[instrument(skip(self, text), fields(connection_id = ?self.connection_id()))]
    pub async fn handle_text(&self, text: &str) {
        let Some(from) = self.connection_id() else {
            warn!("Frame received before admission");
            return;
        };
        match self.hub.relay().dispatch(text, from).await {
            Ok(report) => debug!(
                delivered = report.delivered,
                failed = report.failed,
                "Frame relayed"
            ),
            Err(RelayError::Protocol(e)) => warn!(error = %e, text, "Dropping malformed frame"),
            Err(e @ RelayError::HubOnly(_)) => warn!(error = %e, "Dropping frame"),
        }
    }

    #[instrument(skip(self), fields(connection_id = ?self.connection_id()))]
    pub async fn disconnect(&self) {
        if let Some(id) = self.connection_id() {
            if self.hub.registry().remove(id).await {
                info!("Participant disconnected");
            }
        }
    }
}
