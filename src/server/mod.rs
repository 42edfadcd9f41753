pub mod api;
mod connection;
mod connection_handler;
mod connection_registry;
mod hub;
mod lifecycle;
mod provisioning;
mod relay;
pub mod route;
mod session_store;
pub mod telemetry;
pub mod websocket_listener;

pub use connection::{Connection, ConnectionId};
pub use connection_handler::ConnectionHandler;
pub use connection_registry::{BroadcastReport, ConnectionRegistry, MemoryRegistry};
pub use hub::Hub;
pub use lifecycle::{LifecycleError, LifecycleManager, LifecycleState};
pub use provisioning::{HyperbeamProvisioner, Provisioner, ProvisioningError};
pub use relay::{EventRelay, RelayError};
pub use route::create_router;
pub use session_store::SessionStore;
