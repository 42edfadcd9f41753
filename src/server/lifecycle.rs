use super::{Connection, EventRelay, ProvisioningError, Provisioner, SessionStore};
use crate::model::{RelayEvent, SessionDescriptor};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("A session operation is already in progress")]
    Busy,

    #[error("No session is active")]
    NoActiveSession,

    #[error("Session {requested} is not the active session")]
    SessionMismatch { requested: String },

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error("Provisioning service did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Active,
}

/// Creates and tears down the shared session and tells participants about it.
///
/// At most one create/destroy runs at a time; a second request made while one
/// is in flight fails with [`LifecycleError::Busy`] instead of queueing.
pub struct LifecycleManager {
    store: Arc<SessionStore>,
    relay: EventRelay,
    provisioner: Arc<dyn Provisioner>,
    in_flight: Mutex<()>,
    timeout: Duration,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<SessionStore>,
        relay: EventRelay,
        provisioner: Arc<dyn Provisioner>,
        timeout: Duration,
    ) -> Self {
        LifecycleManager {
            store,
            relay,
            provisioner,
            in_flight: Mutex::new(()),
            timeout,
        }
    }

    pub async fn state(&self) -> LifecycleState {
        match self.store.get().await {
            Some(_) => LifecycleState::Active,
            None => LifecycleState::Idle,
        }
    }

    pub async fn current(&self) -> Option<SessionDescriptor> {
        self.store.get().await
    }

    /// Provisions a new session, replacing the active one if there is one.
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionDescriptor, LifecycleError> {
        let _guard = self.in_flight.try_lock().map_err(|_| LifecycleError::Busy)?;

        let replaced = match self.store.get().await {
            Some(existing) => {
                info!(session_id = %existing.session_id, "Tearing down session before replacing it");
                if let Err(e) = self
                    .bounded(self.provisioner.destroy_remote_session(&existing.session_id))
                    .await
                {
                    warn!(error = %e, session_id = %existing.session_id, "Failed to tear down replaced session");
                }
                self.store.set(None).await;
                true
            }
            None => false,
        };

        let descriptor = match self.bounded(self.provisioner.create_remote_session()).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(error = %e, "Failed to create session");
                if replaced {
                    // participants still show the session torn down above
                    self.announce(&RelayEvent::SessionEnded).await;
                }
                return Err(e);
            }
        };

        self.store.set(Some(descriptor.clone())).await;
        info!(session_id = %descriptor.session_id, "Session created");
        self.announce(&RelayEvent::SessionAvailable(descriptor.clone()))
            .await;
        Ok(descriptor)
    }

    /// Tears down the active session. `session_id` must name it.
    #[instrument(skip(self))]
    pub async fn destroy_session(
        &self,
        session_id: &str,
    ) -> Result<SessionDescriptor, LifecycleError> {
        let _guard = self.in_flight.try_lock().map_err(|_| LifecycleError::Busy)?;

        let current = self
            .store
            .get()
            .await
            .ok_or(LifecycleError::NoActiveSession)?;
        if current.session_id != session_id {
            return Err(LifecycleError::SessionMismatch {
                requested: session_id.to_string(),
            });
        }

        self.bounded(self.provisioner.destroy_remote_session(session_id))
            .await?;

        self.store.set(None).await;
        info!("Session destroyed");
        self.announce(&RelayEvent::SessionEnded).await;
        Ok(current)
    }

    /// Brings a newly admitted participant up to date with the active session.
    ///
    /// Returns whether a descriptor was sent.
    pub async fn on_admit(&self, connection: &Connection) -> bool {
        let Some(descriptor) = self.store.get().await else {
            return false;
        };
        match self
            .relay
            .send_to(connection, &RelayEvent::SessionAvailable(descriptor))
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, connection_id = %connection.id, "Failed to sync session to new connection");
                false
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProvisioningError>>,
    ) -> Result<T, LifecycleError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(LifecycleError::Timeout(self.timeout)),
        }
    }

    async fn announce(&self, event: &RelayEvent) {
        if let Err(e) = self.relay.publish(event).await {
            warn!(error = %e, kind = event.kind(), "Failed to announce session change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ConnectionRegistry, MemoryRegistry};
    use async_trait::async_trait;
    use axum::extract::ws::Message;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::mpsc::{channel, Receiver};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct StubProvisioner {
        created: AtomicUsize,
        destroyed: AtomicUsize,
        fail_create: AtomicBool,
        fail_destroy: AtomicBool,
        hang: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Provisioner for StubProvisioner {
        async fn create_remote_session(&self) -> Result<SessionDescriptor, ProvisioningError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(ProvisioningError::Unavailable("quota exceeded".to_string()));
            }
            Ok(SessionDescriptor::new(
                format!("vm-{n}"),
                format!("https://embed/vm-{n}"),
            ))
        }

        async fn destroy_remote_session(&self, _session_id: &str) -> Result<(), ProvisioningError> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail_destroy.load(Ordering::SeqCst) {
                return Err(ProvisioningError::Unavailable("down".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        manager: Arc<LifecycleManager>,
        provisioner: Arc<StubProvisioner>,
        registry: Arc<MemoryRegistry>,
        rx: Receiver<Message>,
    }

    async fn fixture(provisioner: StubProvisioner, timeout: Duration) -> Fixture {
        let provisioner = Arc::new(provisioner);
        let registry = Arc::new(MemoryRegistry::new());
        let (tx, rx) = channel(16);
        registry.admit(Connection::new(tx)).await;
        let manager = LifecycleManager::new(
            Arc::new(SessionStore::new()),
            EventRelay::new(registry.clone()),
            provisioner.clone(),
            timeout,
        );
        Fixture {
            manager: Arc::new(manager),
            provisioner,
            registry,
            rx,
        }
    }

    fn drain(rx: &mut Receiver<Message>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            events.push(RelayEvent::parse(&text).unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_create_announces_session() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;

        let descriptor = f.manager.create_session().await.unwrap();

        assert_eq!(f.manager.state().await, LifecycleState::Active);
        assert_eq!(f.manager.current().await, Some(descriptor.clone()));
        assert_eq!(drain(&mut f.rx), vec![RelayEvent::SessionAvailable(descriptor)]);
    }

    #[tokio::test]
    async fn test_second_create_replaces_first() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;

        let first = f.manager.create_session().await.unwrap();
        let second = f.manager.create_session().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(f.manager.current().await, Some(second.clone()));
        assert_eq!(f.provisioner.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(
            drain(&mut f.rx),
            vec![
                RelayEvent::SessionAvailable(first),
                RelayEvent::SessionAvailable(second)
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_survives_failed_teardown() {
        let f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;
        f.manager.create_session().await.unwrap();
        f.provisioner.fail_destroy.store(true, Ordering::SeqCst);

        let second = f.manager.create_session().await.unwrap();
        assert_eq!(f.manager.current().await, Some(second));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_store_empty() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;
        f.provisioner.fail_create.store(true, Ordering::SeqCst);

        let result = f.manager.create_session().await;

        assert!(matches!(result, Err(LifecycleError::Provisioning(_))));
        assert_eq!(f.manager.state().await, LifecycleState::Idle);
        assert!(drain(&mut f.rx).is_empty());
    }

    #[tokio::test]
    async fn test_failed_replacement_announces_end() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;
        let first = f.manager.create_session().await.unwrap();
        f.provisioner.fail_create.store(true, Ordering::SeqCst);

        assert!(f.manager.create_session().await.is_err());

        assert_eq!(f.manager.current().await, None);
        assert_eq!(
            drain(&mut f.rx),
            vec![RelayEvent::SessionAvailable(first), RelayEvent::SessionEnded]
        );
    }

    #[tokio::test]
    async fn test_destroy_requires_matching_id() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;
        let active = f.manager.create_session().await.unwrap();
        drain(&mut f.rx);

        let result = f.manager.destroy_session("wrong-id").await;
        assert!(matches!(
            result,
            Err(LifecycleError::SessionMismatch { requested }) if requested == "wrong-id"
        ));
        assert_eq!(f.manager.current().await, Some(active.clone()));
        assert_eq!(f.provisioner.destroyed.load(Ordering::SeqCst), 0);

        f.manager.destroy_session(&active.session_id).await.unwrap();
        assert_eq!(f.manager.current().await, None);
        assert_eq!(drain(&mut f.rx), vec![RelayEvent::SessionEnded]);
    }

    #[tokio::test]
    async fn test_destroy_while_idle() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;

        assert!(matches!(
            f.manager.destroy_session("anything").await,
            Err(LifecycleError::NoActiveSession)
        ));
        assert!(drain(&mut f.rx).is_empty());
    }

    #[tokio::test]
    async fn test_failed_destroy_keeps_session() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;
        let active = f.manager.create_session().await.unwrap();
        drain(&mut f.rx);
        f.provisioner.fail_destroy.store(true, Ordering::SeqCst);

        assert!(matches!(
            f.manager.destroy_session(&active.session_id).await,
            Err(LifecycleError::Provisioning(_))
        ));
        assert_eq!(f.manager.state().await, LifecycleState::Active);
        assert!(drain(&mut f.rx).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_operation_is_busy() {
        let gate = Arc::new(Notify::new());
        let provisioner = StubProvisioner {
            gate: Some(gate.clone()),
            ..Default::default()
        };
        let f = fixture(provisioner, Duration::from_secs(5)).await;

        let manager = f.manager.clone();
        let first = tokio::spawn(async move { manager.create_session().await });
        while f.provisioner.created.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            f.manager.create_session().await,
            Err(LifecycleError::Busy)
        ));
        assert!(matches!(
            f.manager.destroy_session("vm-1").await,
            Err(LifecycleError::Busy)
        ));

        gate.notify_one();
        let created = first.await.unwrap().unwrap();
        assert_eq!(f.manager.current().await, Some(created));
    }

    #[tokio::test]
    async fn test_provisioning_timeout() {
        let provisioner = StubProvisioner::default();
        provisioner.hang.store(true, Ordering::SeqCst);
        let f = fixture(provisioner, Duration::from_millis(50)).await;

        assert!(matches!(
            f.manager.create_session().await,
            Err(LifecycleError::Timeout(_))
        ));
        assert_eq!(f.manager.state().await, LifecycleState::Idle);

        // the section is released after a timeout
        f.provisioner.hang.store(false, Ordering::SeqCst);
        assert!(f.manager.create_session().await.is_ok());
    }

    #[tokio::test]
    async fn test_on_admit_unicasts_to_newcomer_only() {
        let mut f = fixture(StubProvisioner::default(), Duration::from_secs(1)).await;

        let (tx, mut early_rx) = channel(4);
        let early = Connection::new(tx);
        assert!(!f.manager.on_admit(&early).await);

        let active = f.manager.create_session().await.unwrap();
        drain(&mut f.rx);

        let (tx, mut late_rx) = channel(4);
        let late = Connection::new(tx);
        f.registry.admit(late.clone()).await;
        assert!(f.manager.on_admit(&late).await);

        assert_eq!(
            drain(&mut late_rx),
            vec![RelayEvent::SessionAvailable(active)]
        );
        assert!(drain(&mut f.rx).is_empty());
        assert!(drain(&mut early_rx).is_empty());
    }
}
