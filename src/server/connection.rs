use axum::extract::ws::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Outgoing half of a participant's channel.
///
/// Frames queued on `sender` are written to the socket by a single writer task,
/// so writes belonging to one connection never interleave.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: Sender<Message>,
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Connection {
    pub fn new(sender: Sender<Message>) -> Self {
        Self::with_id(ConnectionId::new_v4(), sender)
    }

    pub fn with_id(id: ConnectionId, sender: Sender<Message>) -> Self {
        Connection { id, sender }
    }

    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues a text frame without waiting. Returns whether it was accepted.
    pub fn deliver(&self, text: String) -> bool {
        match self.sender.try_send(Message::Text(text)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Outgoing buffer full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %self.id, "Connection closed, frame dropped");
                false
            }
        }
    }
}
