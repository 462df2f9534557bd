//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};

use crate::{
    domain::{ClientId, MessageSink},
    hub::Client,
    infrastructure::websocket,
    ui::state::AppState,
};

/// `GET /ws`: upgrade and hand the connection to the hub.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let id = ClientId::generate();
    let (client, handle) = Client::new(
        id.clone(),
        state.outbound_capacity,
        state.shutdown.child_token(),
    );
    let (source, mut sink) = websocket::split(socket);

    if let Err(e) = state.hub.register(handle) {
        tracing::error!("Rejecting client '{}': {}", id, e);
        if let Err(e) = sink.close().await {
            tracing::debug!("Closing rejected client '{}' failed: {}", id, e);
        }
        return;
    }
    tracing::info!("Client '{}' connected", id);

    client
        .serve(source, sink, state.hub.clone(), state.ping_interval)
        .await;
}
