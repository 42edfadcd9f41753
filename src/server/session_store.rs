use crate::model::SessionDescriptor;
use tokio::sync::RwLock;

/// Holds at most one active session descriptor.
///
/// Only the lifecycle manager writes, from inside its single-flight section.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<SessionDescriptor>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<SessionDescriptor> {
        self.current.read().await.clone()
    }

    /// Overwrites the cell and returns what it held before.
    pub(crate) async fn set(
        &self,
        descriptor: Option<SessionDescriptor>,
    ) -> Option<SessionDescriptor> {
        std::mem::replace(&mut *self.current.write().await, descriptor)
    }
}
