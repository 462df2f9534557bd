//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    hub::{Hub, SnapshotProducer},
};

use super::{
    handler::{health_check, stats, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the router with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Broadcast hub server
///
/// Owns the hub control loop, the snapshot producer and the HTTP listener.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bind to `host:port` and serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(
        self,
        host: String,
        port: u16,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    ///
    /// When the signal fires, the root cancellation token is cancelled,
    /// which stops the snapshot producer and closes every client.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::config::ConfigError) before anything
    /// is spawned if the configuration is invalid.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.validate()?;
        let shutdown = CancellationToken::new();

        let (hub, hub_task) = Hub::spawn(self.config.hub.intake_capacity);
        let producer = SnapshotProducer::new(hub.clone(), &self.config.producer);
        let producer_task = tokio::spawn(producer.run(shutdown.child_token()));

        let app_state = Arc::new(AppState {
            hub,
            outbound_capacity: self.config.hub.outbound_capacity,
            ping_interval: self.config.hub.ping_interval,
            max_message_size: self.config.max_message_size,
            shutdown: shutdown.clone(),
        });
        let app = create_router(app_state);

        tracing::info!("Broadcast hub listening on {}", listener.local_addr()?);

        let token = shutdown.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                signal.await;
                token.cancel();
            })
            .await;

        shutdown.cancel();
        match producer_task.await {
            Ok(rounds) => tracing::debug!("Snapshot producer joined after {} round(s)", rounds),
            Err(e) => tracing::error!("Snapshot producer failed: {}", e),
        }
        // The hub stops on its own once the last client task drops its handle
        drop(hub_task);

        result?;
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
