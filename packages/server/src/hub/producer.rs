//! Snapshot producer ("game loop").
//!
//! Broadcasts a [`Snapshot`] on a fixed interval. It knows nothing about
//! which clients exist; delivery is entirely the hub's concern.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::HubHandle;
use crate::{config::ProducerConfig, domain::Snapshot};

pub struct SnapshotProducer {
    hub: HubHandle,
    interval: Duration,
    players: Vec<String>,
    status: String,
}

impl SnapshotProducer {
    pub fn new(hub: HubHandle, config: &ProducerConfig) -> Self {
        Self {
            hub,
            interval: config.interval,
            players: config.players.clone(),
            status: config.status.clone(),
        }
    }

    /// Broadcast one snapshot immediately and then one per interval until
    /// `cancel` fires. Returns the number of rounds produced.
    ///
    /// A full or stopped broadcast queue skips that round's delivery; the
    /// round counter still advances.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut round: u64 = 1;

        tracing::info!(
            "Snapshot producer started (interval={:?}, players={:?})",
            self.interval,
            self.players
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = Snapshot::new(round, self.players.clone(), self.status.clone());
            match snapshot.to_json() {
                Ok(json) => match self.hub.broadcast(json) {
                    Ok(()) => tracing::debug!("Broadcast snapshot round {}", round),
                    Err(e) => tracing::error!("Snapshot round {} not delivered: {}", round, e),
                },
                Err(e) => tracing::error!("Failed to serialize snapshot round {}: {}", round, e),
            }
            round += 1;
        }

        let produced = round - 1;
        tracing::info!("Snapshot producer stopped after {} round(s)", produced);
        produced
    }
}
