//! HTTP / WebSocket surface of the hub server.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, create_router};
pub use signal::shutdown_signal;
