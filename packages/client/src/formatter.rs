//! Message formatting utilities for client display.

use fanout_server::{domain::Snapshot, infrastructure::dto::RelayedMessage};
use fanout_shared::time::format_local_clock;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a game state snapshot
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The decoded snapshot
    /// * `received_at` - Unix timestamp when the snapshot arrived (milliseconds)
    pub fn format_snapshot(snapshot: &Snapshot, received_at: i64) -> String {
        let players = if snapshot.players.is_empty() {
            "(no players)".to_string()
        } else {
            snapshot.players.join(", ")
        };
        format!(
            "\n[{}] round {} | {} | players: {}\n",
            format_local_clock(received_at),
            snapshot.round,
            snapshot.status,
            players
        )
    }

    /// Format a command relayed from another client
    pub fn format_relayed(message: &RelayedMessage) -> String {
        format!(
            "\n[{}] {} <{}> {}\n",
            format_local_clock(message.timestamp),
            short_id(&message.from),
            message.cmd,
            message.payload
        )
    }

    /// Format a text message that is neither a snapshot nor a relayed command
    pub fn format_raw_message(text: &str) -> String {
        format!("\n{}\n", text)
    }

    /// Format a binary message notification
    pub fn format_binary_message(len: usize) -> String {
        format!("\n(binary message: {} bytes)\n", len)
    }

    /// Format any inbound text frame
    pub fn format_text(text: &str, received_at: i64) -> String {
        if let Ok(snapshot) = serde_json::from_str::<Snapshot>(text) {
            Self::format_snapshot(&snapshot, received_at)
        } else if let Ok(relayed) = serde_json::from_str::<RelayedMessage>(text) {
            Self::format_relayed(&relayed)
        } else {
            Self::format_raw_message(text)
        }
    }
}

/// First eight characters of a client id; UUIDs are unwieldy at the prompt.
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((index, _)) => &id[..index],
        None => id,
    }
}
