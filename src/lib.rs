#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod model;

#[cfg(feature = "server")]
pub mod server;

pub mod prelude {
    #[cfg(feature = "client")]
    pub use crate::client::PartyClient;
    pub use crate::config::Config;
    pub use crate::model::ChatMessage;
    pub use crate::model::FanOut;
    pub use crate::model::PartyView;
    pub use crate::model::PointerPosition;
    pub use crate::model::ProtocolError;
    pub use crate::model::RelayEvent;
    pub use crate::model::SessionDescriptor;
    #[cfg(feature = "server")]
    pub use crate::server::Hub;
    #[cfg(feature = "server")]
    pub use crate::server::LifecycleError;
}
