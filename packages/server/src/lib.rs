//! Broadcast hub over WebSocket.
//!
//! Accepts many concurrent WebSocket clients, fans every broadcast out to
//! all of them, and tears down per-connection resources on disconnect or
//! cancellation. A snapshot producer feeds periodic game state into the
//! same hub.

// layers
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod ui;

pub mod config;
