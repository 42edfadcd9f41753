use super::{BroadcastReport, Connection, ConnectionId, ConnectionRegistry};
use crate::model::{FanOut, ProtocolError, RelayEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0} events may only be sent by the hub")]
    HubOnly(&'static str),
}

/// Routes events to participants according to their fan-out policy.
#[derive(Clone)]
pub struct EventRelay {
    registry: Arc<dyn ConnectionRegistry>,
}

impl EventRelay {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        EventRelay { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Handles a raw frame received from `from`.
    ///
    /// Nothing is fanned out when the frame is rejected.
    #[instrument(skip(self, raw))]
    pub async fn dispatch(
        &self,
        raw: &str,
        from: ConnectionId,
    ) -> Result<BroadcastReport, RelayError> {
        let event = RelayEvent::parse(raw)?;
        debug!(kind = event.kind(), "Dispatching inbound event");

        let report = match event.inbound_fan_out() {
            FanOut::All => self.registry.broadcast(&event, None).await?,
            FanOut::AllExceptSender => self.registry.broadcast(&event, Some(from)).await?,
            FanOut::Nobody => return Err(RelayError::HubOnly(event.kind())),
        };
        Ok(report)
    }

    /// Sends a hub-originated event to every participant.
    #[instrument(skip(self, event), fields(kind = event.kind()))]
    pub async fn publish(&self, event: &RelayEvent) -> Result<BroadcastReport, RelayError> {
        Ok(self.registry.broadcast(event, None).await?)
    }

    /// Sends a hub-originated event to a single participant.
    pub fn send_to(&self, connection: &Connection, event: &RelayEvent) -> Result<bool, RelayError> {
        Ok(connection.deliver(event.to_json()?))
    }
}
