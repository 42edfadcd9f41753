use super::{
    ConnectionHandler, ConnectionRegistry, EventRelay, LifecycleManager, MemoryRegistry,
    Provisioner, SessionStore,
};
use std::sync::Arc;
use std::time::Duration;

/// The single party: one registry, one session cell, one lifecycle manager.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<dyn ConnectionRegistry>,
    relay: EventRelay,
    lifecycle: Arc<LifecycleManager>,
}

impl Hub {
    pub fn new(provisioner: Arc<dyn Provisioner>, provisioning_timeout: Duration) -> Self {
        Self::with_registry(
            Arc::new(MemoryRegistry::new()),
            provisioner,
            provisioning_timeout,
        )
    }

    pub fn with_registry(
        registry: Arc<dyn ConnectionRegistry>,
        provisioner: Arc<dyn Provisioner>,
        provisioning_timeout: Duration,
    ) -> Self {
        let relay = EventRelay::new(registry.clone());
        let lifecycle = LifecycleManager::new(
            Arc::new(SessionStore::new()),
            relay.clone(),
            provisioner,
            provisioning_timeout,
        );
        Hub {
            registry,
            relay,
            lifecycle: Arc::new(lifecycle),
        }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    pub fn relay(&self) -> &EventRelay {
        &self.relay
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn connection_handler(&self) -> ConnectionHandler {
        ConnectionHandler::new(self.clone())
    }
}
