//! Utilities shared by the Fanout server and client binaries.

pub mod logger;
pub mod time;
