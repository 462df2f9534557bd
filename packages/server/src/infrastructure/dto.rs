//! JSON wire formats.
//!
//! - client → server: [`IncomingMessage`] `{"cmd": "...", "payload": "..."}`
//! - server → clients: [`RelayedMessage`] (an inbound command re-wrapped
//!   with its sender and receive time) or a [`Snapshot`](crate::domain::Snapshot)

use serde::{Deserialize, Serialize};

use crate::domain::{ClientId, Command};

/// Message sent by a client. `payload` is treated as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub cmd: String,
    pub payload: String,
}

/// Inbound command as broadcast to every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedMessage {
    pub from: String,
    pub cmd: String,
    pub payload: String,
    /// Unix timestamp (milliseconds) at which the hub received the command
    pub timestamp: i64,
}

impl From<IncomingMessage> for Command {
    fn from(dto: IncomingMessage) -> Self {
        Command::new(dto.cmd, dto.payload.into_bytes())
    }
}

impl RelayedMessage {
    pub fn new(from: &ClientId, command: &Command, timestamp: i64) -> Self {
        Self {
            from: from.as_str().to_string(),
            cmd: command.cmd.clone(),
            payload: command.payload_text(),
            timestamp,
        }
    }
}

/// Decode an inbound text frame into a [`Command`].
pub fn decode_command(text: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str::<IncomingMessage>(text).map(Command::from)
}
