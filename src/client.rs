//! Native participant for the hub's real-time channel.

use crate::model::{ChatMessage, PointerPosition, ProtocolError, RelayEvent};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(e))
    }
}

pub struct PartyClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PartyClient {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _response) = connect_async(url).await?;
        debug!(url, "Connected to hub");
        Ok(PartyClient { stream })
    }

    pub async fn send(&mut self, event: &RelayEvent) -> Result<(), ClientError> {
        self.send_raw(&event.to_json()?).await
    }

    /// Sends a text frame as-is, valid or not.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ClientError> {
        self.stream.send(Message::text(text.to_string())).await?;
        Ok(())
    }

    pub async fn send_chat(&mut self, sender: &str, message: &str) -> Result<(), ClientError> {
        self.send(&RelayEvent::ChatMessage(ChatMessage::new(sender, message)))
            .await
    }

    pub async fn send_pointer(&mut self, x: f64, y: f64) -> Result<(), ClientError> {
        self.send(&RelayEvent::PointerPosition(PointerPosition { x, y }))
            .await
    }

    /// Waits for the next event. Returns `None` once the hub closes the channel.
    ///
    /// Frames that do not parse are skipped.
    pub async fn next_event(&mut self) -> Result<Option<RelayEvent>, ClientError> {
        while let Some(message) = self.stream.next().await {
            let message = message?;
            if message.is_close() {
                return Ok(None);
            }
            if !message.is_text() {
                continue;
            }
            match RelayEvent::parse(message.to_text()?) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => warn!(error = %e, "Skipping unreadable frame"),
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
