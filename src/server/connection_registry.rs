use super::{Connection, ConnectionId};
use crate::model::{ProtocolError, RelayEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Outcome of one fan-out pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Membership of currently connected participants.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    async fn admit(&self, connection: Connection);

    /// Returns whether the connection was registered. Removing twice is a no-op.
    async fn remove(&self, id: ConnectionId) -> bool;

    /// Copy of the membership; callers iterate it without holding any lock.
    async fn snapshot(&self) -> Vec<Connection>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Serializes `event` once and queues it on every open connection but `exclude`.
    ///
    /// A connection that cannot take the frame counts as a failure for that
    /// connection alone; delivery to the rest continues.
    async fn broadcast(
        &self,
        event: &RelayEvent,
        exclude: Option<ConnectionId>,
    ) -> Result<BroadcastReport, ProtocolError> {
        let text = event.to_json()?;
        let mut report = BroadcastReport::default();

        for connection in self.snapshot().await {
            if Some(connection.id) == exclude {
                continue;
            }
            if connection.is_open() && connection.deliver(text.clone()) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        debug!(
            kind = event.kind(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast event"
        );
        Ok(report)
    }
}

#[derive(Default)]
pub struct MemoryRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryRegistry {
    #[instrument(skip(self, connection), fields(connection_id = %connection.id))]
    async fn admit(&self, connection: Connection) {
        let mut connections = self.connections.write().await;
        connections.insert(connection.id, connection);
        debug!(total = connections.len(), "Connection admitted");
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&id).is_some();
        debug!(removed, total = connections.len(), "Connection removed");
        removed
    }

    async fn snapshot(&self) -> Vec<Connection> {
        self.connections.read().await.values().cloned().collect()
    }

    async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
