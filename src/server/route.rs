use super::{api, websocket_listener, Hub};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct AppState {
    pub hub: Hub,
    pub connection_buffer: usize,
}

#[instrument(skip(hub))]
pub fn create_router(hub: Hub, connection_buffer: usize) -> Router {
    debug!("Creating routes");
    let state = AppState {
        hub,
        connection_buffer,
    };
    Router::new()
        .route("/", get(upgrade))
        .route("/ws", get(upgrade))
        .route("/api/create-session", post(api::create_session))
        .route("/api/destroy-session", post(api::destroy_session))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    websocket_listener::handle_websocket(
        ws,
        state.hub.connection_handler(),
        state.connection_buffer,
    )
    .await
}
