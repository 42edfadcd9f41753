use super::{ChatMessage, PointerPosition, ProtocolError, RelayEvent, SessionDescriptor};

/// Sender name used for notices the client generates locally.
pub const SYSTEM_SENDER: &str = "System";

/// What one participant sees of the party, built from the events it receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartyView {
    chat: Vec<ChatMessage>,
    session: Option<SessionDescriptor>,
    remote_pointer: Option<PointerPosition>,
}

impl PartyView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::ChatMessage(chat) => self.chat.push(chat.clone()),
            RelayEvent::PointerPosition(position) => self.remote_pointer = Some(*position),
            RelayEvent::SessionAvailable(descriptor) => {
                self.session = Some(descriptor.clone());
                self.notice("Session loaded.");
            }
            RelayEvent::SessionEnded => {
                self.session = None;
                self.notice("Session ended.");
            }
        }
    }

    /// Applies a raw frame. A frame that fails to parse leaves the view untouched.
    pub fn apply_raw(&mut self, raw: &str) -> Result<(), ProtocolError> {
        let event = RelayEvent::parse(raw)?;
        self.apply(&event);
        Ok(())
    }

    pub fn connected(&mut self) {
        self.notice("Connected to chat.");
    }

    pub fn disconnected(&mut self) {
        self.notice("Disconnected from chat.");
    }

    pub fn connection_error(&mut self) {
        self.notice("Chat connection error.");
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn session(&self) -> Option<&SessionDescriptor> {
        self.session.as_ref()
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn embed_url(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.embed_url.as_str())
    }

    pub fn remote_pointer(&self) -> Option<PointerPosition> {
        self.remote_pointer
    }

    /// Identifier to hand to the destroy action, if a session is showing.
    pub fn destroy_target(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    fn notice(&mut self, message: &str) {
        self.chat.push(ChatMessage::new(SYSTEM_SENDER, message));
    }
}
