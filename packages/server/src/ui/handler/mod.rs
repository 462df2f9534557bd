//! Request handlers.

mod http;
mod websocket;

pub use http::{health_check, stats};
pub use websocket::websocket_handler;
