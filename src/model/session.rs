use serde::{Deserialize, Serialize};

/// Identifier and embeddable access URL of the shared remote session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub session_id: String,
    pub embed_url: String,
}

impl SessionDescriptor {
    pub fn new(session_id: impl Into<String>, embed_url: impl Into<String>) -> Self {
        SessionDescriptor {
            session_id: session_id.into(),
            embed_url: embed_url.into(),
        }
    }
}
