//! Periodic game state snapshot.

use serde::{Deserialize, Serialize};

/// Point-in-time game state broadcast by the snapshot producer.
///
/// Wire format: `{"round": 1, "players": ["Alice", "Bob"], "status": "playing"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub round: u64,
    pub players: Vec<String>,
    pub status: String,
}

impl Snapshot {
    pub fn new(round: u64, players: Vec<String>, status: impl Into<String>) -> Self {
        Self {
            round,
            players,
            status: status.into(),
        }
    }

    /// Serialize to the JSON text pushed onto the hub's broadcast queue.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
