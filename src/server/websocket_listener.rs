use super::ConnectionHandler;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::WebSocketUpgrade;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, instrument, warn};

#[instrument(skip(ws, connection_handler))]
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    connection_handler: ConnectionHandler,
    buffer: usize,
) -> impl IntoResponse {
    debug!("New WebSocket upgrade request");
    ws.on_upgrade(move |socket| listen(socket, connection_handler, buffer))
}

async fn listen(socket: WebSocket, connection_handler: ConnectionHandler, buffer: usize) {
    let (ws_sender, ws_receiver) = socket.split();
    let (tx, rx) = tokio::sync::mpsc::channel(buffer);
    let connection_handler = connection_handler.connect(tx).await;

    let sender_task = handle_outgoing_messages(rx, ws_sender);
    let receiver_task = handle_incoming_messages(ws_receiver, &connection_handler);

    tokio::select! {
        _ = sender_task => {
            info!(connection_id = ?connection_handler.connection_id(), "Sender task completed");
        }
        _ = receiver_task => {
            info!(connection_id = ?connection_handler.connection_id(), "Receiver task completed");
        }
    }
    connection_handler.disconnect().await;
}

#[instrument(skip(rx, ws_sender))]
pub async fn handle_outgoing_messages(
    mut rx: Receiver<Message>,
    mut ws_sender: SplitSink<WebSocket, Message>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = ws_sender.send(msg).await {
            error!(error = ?e, "Failed to send message");
            break;
        }
    }
}

/// Frames from one socket are handled one at a time, in arrival order.
#[instrument(skip(receiver, connection_handler), fields(connection_id = ?connection_handler.connection_id()))]
pub async fn handle_incoming_messages(
    mut receiver: SplitStream<WebSocket>,
    connection_handler: &ConnectionHandler,
) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => connection_handler.handle_text(&text).await,
            Ok(Message::Close(_)) => {
                info!("Client closed the connection");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(message @ Message::Binary(_)) => {
                warn!(?message, "Unsupported message type");
            }
            Err(e) => {
                error!(error = ?e, "Failed to receive message");
                break;
            }
        }
    }
}
