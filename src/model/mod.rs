mod error;
mod event;
mod party_view;
mod session;

pub use error::ProtocolError;
pub use event::{ChatMessage, Envelope, FanOut, PointerPosition, RelayEvent};
pub use party_view::{PartyView, SYSTEM_SENDER};
pub use session::SessionDescriptor;
