//! Parsing of prompt lines into outbound commands.

use serde::Serialize;

/// Outbound command in the hub's inbound wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingCommand {
    pub cmd: String,
    pub payload: String,
}

/// Parse a prompt line of the form `cmd payload...`.
///
/// The first whitespace-separated word is the command; the rest of the
/// line (trimmed) is the payload, which may be empty. Blank lines yield
/// `None`.
pub fn parse_line(line: &str) -> Option<OutgoingCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (cmd, payload) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    Some(OutgoingCommand {
        cmd: cmd.to_string(),
        payload: payload.to_string(),
    })
}
