//! Realtime push: the connection registry and everything that feeds it.

pub mod binder;
pub mod connection;
pub mod events;
pub mod publisher;
pub mod registry;
pub mod router;
pub mod server;

pub use connection::{Connection, ConnectionStatus, DeliveryError, Frame};
pub use events::{Event, EventKind};
pub use publisher::EventPublisher;
pub use registry::{ConnectionRegistry, DeliveryReport};
