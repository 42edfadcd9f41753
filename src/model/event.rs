use super::{ProtocolError, SessionDescriptor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const CHAT_MESSAGE: &str = "chat_message";
const MOUSE_POSITION: &str = "mouse_position";
const SESSION_INFO: &str = "session_info";
const SESSION_DESTROYED: &str = "session_destroyed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        ChatMessage {
            sender: sender.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

/// How an event arriving from a participant is fanned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    All,
    AllExceptSender,
    /// Only the hub may originate the event; inbound copies are dropped.
    Nobody,
}

/// Wire envelope shared by every frame: `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A typed message exchanged over the real-time channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Envelope", try_from = "Envelope")]
pub enum RelayEvent {
    ChatMessage(ChatMessage),
    PointerPosition(PointerPosition),
    SessionAvailable(SessionDescriptor),
    SessionEnded,
}

impl RelayEvent {
    /// Parses a raw text frame, telling malformed JSON apart from unknown tags.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        RelayEvent::try_from(envelope)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wire tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::ChatMessage(_) => CHAT_MESSAGE,
            RelayEvent::PointerPosition(_) => MOUSE_POSITION,
            RelayEvent::SessionAvailable(_) => SESSION_INFO,
            RelayEvent::SessionEnded => SESSION_DESTROYED,
        }
    }

    /// Fan-out policy for a copy of this event received from a participant.
    ///
    /// Chat reaches every participant, the sender included, so the sender's
    /// other observers see it too. Pointer moves skip the sender, which already
    /// knows where its own pointer is. Session events are hub-originated only.
    pub fn inbound_fan_out(&self) -> FanOut {
        match self {
            RelayEvent::ChatMessage(_) => FanOut::All,
            RelayEvent::PointerPosition(_) => FanOut::AllExceptSender,
            RelayEvent::SessionAvailable(_) => FanOut::Nobody,
            RelayEvent::SessionEnded => FanOut::Nobody,
        }
    }
}

impl From<RelayEvent> for Envelope {
    fn from(event: RelayEvent) -> Self {
        let kind = event.kind().to_string();
        let data = match event {
            RelayEvent::ChatMessage(chat) => json!({
                "sender": chat.sender,
                "message": chat.message,
            }),
            RelayEvent::PointerPosition(position) => json!({
                "x": position.x,
                "y": position.y,
            }),
            RelayEvent::SessionAvailable(descriptor) => json!({
                "sessionId": descriptor.session_id,
                "embedUrl": descriptor.embed_url,
            }),
            RelayEvent::SessionEnded => json!({}),
        };
        Envelope { kind, data }
    }
}

impl TryFrom<Envelope> for RelayEvent {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.kind.as_str() {
            CHAT_MESSAGE => payload(CHAT_MESSAGE, envelope.data).map(RelayEvent::ChatMessage),
            MOUSE_POSITION => {
                payload(MOUSE_POSITION, envelope.data).map(RelayEvent::PointerPosition)
            }
            SESSION_INFO => payload(SESSION_INFO, envelope.data).map(RelayEvent::SessionAvailable),
            // `data` is `{}` or absent depending on the sender
            SESSION_DESTROYED => Ok(RelayEvent::SessionEnded),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload { kind, source })
}
