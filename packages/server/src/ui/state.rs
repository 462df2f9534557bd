//! Server state shared by the HTTP handlers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::hub::HubHandle;

/// Shared application state
pub struct AppState {
    /// Intake side of the broadcast hub
    pub hub: HubHandle,
    /// Capacity of each new client's outbound queue
    pub outbound_capacity: usize,
    /// Interval between liveness pings
    pub ping_interval: Duration,
    /// Maximum inbound message size, in bytes
    pub max_message_size: usize,
    /// Root token; every client token is a child of it
    pub shutdown: CancellationToken,
}
