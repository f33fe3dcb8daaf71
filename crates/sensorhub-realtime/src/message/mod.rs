//! Wire messages pushed to clients.

pub mod serializer;
pub mod types;

pub use serializer::encode;
pub use types::WireMessage;
