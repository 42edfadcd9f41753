use crate::config::Config;
use crate::model::SessionDescriptor;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Provisioning request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provisioning service answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provisioning service unavailable: {0}")]
    Unavailable(String),
}

/// External service that hosts the shared interactive session.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create_remote_session(&self) -> Result<SessionDescriptor, ProvisioningError>;

    async fn destroy_remote_session(&self, session_id: &str) -> Result<(), ProvisioningError>;
}

#[derive(Debug, Deserialize)]
struct CreatedVm {
    #[serde(alias = "vmId")]
    session_id: String,
    #[serde(alias = "embedUrl")]
    embed_url: String,
}

/// Hyperbeam virtual browser API.
#[derive(Clone)]
pub struct HyperbeamProvisioner {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HyperbeamProvisioner {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProvisioningError> {
        let client = Client::builder()
            .user_agent(concat!("watch-party/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HyperbeamProvisioner {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ProvisioningError> {
        Self::new(&config.hyperbeam_api_url, &config.hyperbeam_api_key)
    }
}

#[async_trait]
impl Provisioner for HyperbeamProvisioner {
    #[instrument(skip(self))]
    async fn create_remote_session(&self) -> Result<SessionDescriptor, ProvisioningError> {
        let response = self
            .client
            .post(format!("{}/vm", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let vm: CreatedVm = ensure_success(response).await?.json().await?;
        debug!(session_id = %vm.session_id, "Remote session created");
        Ok(SessionDescriptor::new(vm.session_id, vm.embed_url))
    }

    #[instrument(skip(self))]
    async fn destroy_remote_session(&self, session_id: &str) -> Result<(), ProvisioningError> {
        let response = self
            .client
            .delete(format!("{}/vm/{}", self.api_url, session_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!("Remote session destroyed");
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProvisioningError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProvisioningError::Status {
        status: status.as_u16(),
        body,
    })
}
