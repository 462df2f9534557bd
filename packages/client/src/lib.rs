//! CLI client for the Fanout broadcast hub.
//!
//! Prints every snapshot and relayed command it receives and sends
//! `cmd payload` lines typed at the prompt.

pub mod error;
pub mod formatter;
pub mod input;
pub mod runner;
pub mod session;
pub mod ui;

pub use runner::run_client;
