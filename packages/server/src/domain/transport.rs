//! Transport abstraction
//!
//! The hub never touches wire-level WebSocket framing. A connection is
//! consumed only as two halves: a [`MessageSource`] the read task pulls
//! frames from, and a [`MessageSink`] the write task pushes frames to.
//! Concrete implementations live in the infrastructure layer.

use async_trait::async_trait;
use thiserror::Error;

/// A discrete message on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Transport-level failures. Always local to one client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to receive frame: {0}")]
    Receive(String),

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("transport already closed")]
    Closed,
}

/// Inbound half of a connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next frame. `None` means the peer ended the stream.
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Outbound half of a connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the underlying transport. Called once per connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}
