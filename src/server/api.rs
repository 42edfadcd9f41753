use super::route::AppState;
use super::LifecycleError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroySessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session_id: String,
    pub embed_url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DestroySessionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub session_active: bool,
}

/// Failure reported to an HTTP caller as `{ success: false, error }`.
#[derive(Debug)]
pub enum ApiError {
    MissingSessionId,
    Lifecycle(LifecycleError),
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        ApiError::Lifecycle(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingSessionId => StatusCode::BAD_REQUEST,
            ApiError::Lifecycle(LifecycleError::Busy) => StatusCode::CONFLICT,
            ApiError::Lifecycle(LifecycleError::SessionMismatch { .. }) => StatusCode::CONFLICT,
            ApiError::Lifecycle(LifecycleError::NoActiveSession) => StatusCode::NOT_FOUND,
            ApiError::Lifecycle(LifecycleError::Provisioning(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Lifecycle(LifecycleError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match &self {
            ApiError::MissingSessionId => "sessionId is required".to_string(),
            ApiError::Lifecycle(e) => e.to_string(),
        };
        let body = FailureResponse {
            success: false,
            error,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    info!("Create session requested");
    let descriptor = state
        .hub
        .lifecycle()
        .create_session()
        .await
        .inspect_err(|e| warn!(error = %e, "Create session failed"))?;
    Ok(Json(CreateSessionResponse {
        success: true,
        session_id: descriptor.session_id,
        embed_url: descriptor.embed_url,
    }))
}

#[instrument(skip(state, payload))]
pub async fn destroy_session(
    State(state): State<AppState>,
    payload: Option<Json<DestroySessionRequest>>,
) -> Result<Json<DestroySessionResponse>, ApiError> {
    let session_id = payload
        .and_then(|Json(request)| request.session_id)
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingSessionId)?;
    info!(%session_id, "Destroy session requested");

    state
        .hub
        .lifecycle()
        .destroy_session(&session_id)
        .await
        .inspect_err(|e| warn!(error = %e, "Destroy session failed"))?;
    Ok(Json(DestroySessionResponse {
        success: true,
        message: format!("Session {} destroyed.", session_id),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.hub.registry().len().await,
        session_active: state.hub.lifecycle().current().await.is_some(),
    })
}
