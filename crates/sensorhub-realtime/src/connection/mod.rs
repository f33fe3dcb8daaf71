//! WebSocket connection management: coordinator, handles, delivery, heartbeat, upgrade.

pub(crate) mod delivery;
pub mod handle;
pub mod heartbeat;
pub mod lifecycle;
pub mod manager;
pub mod origin;
pub mod registry;
pub mod transport;

pub use handle::{ConnectionHandle, ConnectionId};
pub use lifecycle::{ConnectionContext, ConnectionSettings};
pub use manager::ConnectionManager;
pub use origin::OriginPolicy;
