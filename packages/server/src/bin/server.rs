//! Broadcast hub server.
//!
//! Accepts WebSocket clients on `/ws`, relays every `{"cmd", "payload"}`
//! message to all connected clients, and broadcasts a game state snapshot
//! on a fixed interval.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin fanout-server
//! cargo run --bin fanout-server -- --host 0.0.0.0 --port 3000 --snapshot-interval-secs 1
//! ```

use std::time::Duration;

use clap::Parser;

use fanout_server::{
    config::{HubConfig, ProducerConfig, ServerConfig},
    ui::Server,
};
use fanout_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "fanout-server")]
#[command(about = "WebSocket broadcast hub with periodic game state snapshots", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Capacity of each client's outbound queue; a full queue disconnects the client
    #[arg(long, default_value = "256", value_parser = clap::value_parser!(u32).range(1..))]
    outbound_capacity: u32,

    /// Capacity of each of the hub's intake queues
    #[arg(long, default_value = "1024", value_parser = clap::value_parser!(u32).range(1..))]
    intake_capacity: u32,

    /// Seconds between liveness pings sent to each client
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
    ping_interval_secs: u64,

    /// Seconds between game state snapshots
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u64).range(1..))]
    snapshot_interval_secs: u64,

    /// Maximum size of one inbound message, in bytes
    #[arg(long, default_value = "1024")]
    max_message_size: usize,

    /// Players listed in each snapshot
    #[arg(long, value_delimiter = ',', default_value = "Alice,Bob,Cathy")]
    players: Vec<String>,

    /// Status reported in each snapshot
    #[arg(long, default_value = "playing")]
    status: String,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            hub: HubConfig {
                outbound_capacity: args.outbound_capacity as usize,
                intake_capacity: args.intake_capacity as usize,
                ping_interval: Duration::from_secs(args.ping_interval_secs),
            },
            producer: ProducerConfig {
                interval: Duration::from_secs(args.snapshot_interval_secs),
                players: args.players,
                status: args.status,
            },
            max_message_size: args.max_message_size,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(&[env!("CARGO_CRATE_NAME"), "tower_http"], "debug");

    let args = Args::parse();
    let host = args.host.clone();
    let port = args.port;

    let server = Server::new(ServerConfig::from(args));
    if let Err(e) = server.run(host, port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
