//! CLI client for the broadcast hub with reconnection support.
//!
//! Connects to the hub, prints snapshots and relayed commands, and sends
//! each `cmd payload` line typed at the ">" prompt.
//! Reconnects from scratch on disconnection (5 attempts, 5 seconds apart by default).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin fanout-client
//! cargo run --bin fanout-client -- --url ws://127.0.0.1:3000/ws
//! ```

use std::time::Duration;

use clap::Parser;

use fanout_client::{run_client, runner::ReconnectPolicy};
use fanout_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "fanout-client")]
#[command(about = "WebSocket client for the broadcast hub", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Maximum number of connection attempts
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    reconnect_attempts: u32,

    /// Seconds to wait between connection attempts
    #[arg(long, default_value = "5")]
    reconnect_interval_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&[env!("CARGO_CRATE_NAME")], "info");

    let args = Args::parse();
    let policy = ReconnectPolicy {
        max_attempts: args.reconnect_attempts,
        interval: Duration::from_secs(args.reconnect_interval_secs),
    };

    if let Err(e) = run_client(args.url, policy).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
