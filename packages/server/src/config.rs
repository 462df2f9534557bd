//! Runtime configuration.
//!
//! There is no configuration file; the server binary maps its CLI flags
//! onto these structs. `Default` carries the same values as the flag
//! defaults.

use std::time::Duration;

use thiserror::Error;

/// A setting that would make the server unable to start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Hub and per-connection settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each client's outbound queue
    pub outbound_capacity: usize,
    /// Capacity of each of the hub's register/unregister/broadcast queues
    pub intake_capacity: usize,
    /// Interval between liveness pings sent by each write task
    pub ping_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            intake_capacity: 1024,
            ping_interval: Duration::from_secs(15),
        }
    }
}

/// Snapshot producer settings.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub interval: Duration,
    pub players: Vec<String>,
    pub status: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            players: vec!["Alice".to_string(), "Bob".to_string(), "Cathy".to_string()],
            status: "playing".to_string(),
        }
    }
}

/// Complete server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hub: HubConfig,
    pub producer: ProducerConfig,
    /// Maximum size of one inbound WebSocket message, in bytes
    pub max_message_size: usize,
}

impl ServerConfig {
    /// Reject settings the hub and its tasks cannot run with.
    ///
    /// Queue capacities and timer periods must all be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.outbound_capacity == 0 {
            return Err(ConfigError::Zero("outbound_capacity"));
        }
        if self.hub.intake_capacity == 0 {
            return Err(ConfigError::Zero("intake_capacity"));
        }
        if self.hub.ping_interval.is_zero() {
            return Err(ConfigError::Zero("ping_interval"));
        }
        if self.producer.interval.is_zero() {
            return Err(ConfigError::Zero("producer interval"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            producer: ProducerConfig::default(),
            max_message_size: 1024,
        }
    }
}
