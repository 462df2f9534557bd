//! Domain layer
//!
//! Value objects exchanged between the hub, its clients, and the snapshot
//! producer, plus the transport seam the hub core is written against.

mod client_id;
mod command;
mod snapshot;
pub mod transport;

pub use client_id::{ClientId, ClientIdError};
pub use command::Command;
pub use snapshot::Snapshot;
pub use transport::{Frame, MessageSink, MessageSource, TransportError};

#[cfg(test)]
pub use transport::MockMessageSink;
