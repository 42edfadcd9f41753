use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use watch_party::client::PartyClient;
use watch_party::model::{RelayEvent, SessionDescriptor};
use watch_party::server::{create_router, Hub, Provisioner, ProvisioningError};

/// In-memory stand-in for the hosted session service.
#[derive(Default)]
pub struct FakeProvisioner {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl Provisioner for FakeProvisioner {
    async fn create_remote_session(&self) -> Result<SessionDescriptor, ProvisioningError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProvisioningError::Unavailable("no capacity".to_string()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionDescriptor::new(
            format!("vm-{n}"),
            format!("https://embed.test/vm-{n}"),
        ))
    }

    async fn destroy_remote_session(&self, _session_id: &str) -> Result<(), ProvisioningError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProvisioningError::Unavailable("no capacity".to_string()));
        }
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Hub,
    pub provisioner: Arc<FakeProvisioner>,
}

impl TestServer {
    pub async fn start() -> Self {
        let provisioner = Arc::new(FakeProvisioner::default());
        let hub = Hub::new(provisioner.clone(), Duration::from_secs(5));
        let app = create_router(hub.clone(), 32);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            hub,
            provisioner,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Connects a participant and waits until the hub has admitted it.
    pub async fn join(&self) -> PartyClient {
        let before = self.hub.registry().len().await;
        let client = PartyClient::connect(&self.ws_url()).await.unwrap();
        self.wait_for_connections(before + 1).await;
        client
    }

    pub async fn wait_for_connections(&self, n: usize) {
        for _ in 0..200 {
            if self.hub.registry().len().await == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("hub never reached {} connections", n);
    }
}

pub async fn next_event(client: &mut PartyClient) -> RelayEvent {
    tokio::time::timeout(Duration::from_secs(2), client.next_event())
        .await
        .expect("timed out waiting for event")
        .unwrap()
        .expect("connection closed")
}

/// Asserts nothing arrives within a short window.
pub async fn assert_silent(client: &mut PartyClient) {
    if let Ok(event) = tokio::time::timeout(Duration::from_millis(200), client.next_event()).await
    {
        panic!("expected no event, got {:?}", event);
    }
}
