//! Inbound command sent by a client.

/// A decoded inbound message: a command name and its opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cmd: String,
    pub payload: Vec<u8>,
}

impl Command {
    pub fn new(cmd: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            cmd: cmd.into(),
            payload: payload.into(),
        }
    }

    /// Payload rendered as text; invalid UTF-8 sequences are replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
