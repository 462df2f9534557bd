//! Infrastructure layer
//!
//! - `dto`: JSON wire formats exchanged with clients
//! - `websocket`: axum WebSocket adapters for the transport traits

pub mod dto;
pub mod websocket;

pub use websocket::{WebSocketSink, WebSocketSource};
