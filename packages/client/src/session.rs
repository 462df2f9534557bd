//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use fanout_shared::time::now_millis;

use crate::{
    error::ClientError, formatter::MessageFormatter, input::parse_line, ui::redisplay_prompt,
};

/// Run one WebSocket session until the user exits or the connection is lost.
///
/// Lines arrive on `input_rx` from the prompt thread. The receiver outlives
/// the session so a reconnect keeps reading from the same prompt.
///
/// # Returns
///
/// * `Ok(())` - The user ended input (Ctrl+C / Ctrl+D)
/// * `Err(ClientError)` - Connecting failed or the connection was lost
pub async fn run_client_session(
    url: &str,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to broadcast hub!");
    println!("\nType `cmd payload` and press Enter to send. Press Ctrl+C to exit.\n");
    redisplay_prompt();

    let (mut write, mut read) = ws_stream.split();

    // Spawn a task to handle incoming messages
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    print!("{}", MessageFormatter::format_text(text.as_str(), now_millis()));
                    redisplay_prompt();
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt();
                }
                Ok(Message::Close(_)) => {
                    return "server closed the connection".to_string();
                }
                Err(e) => {
                    return e.to_string();
                }
                // Pings are answered by tungstenite
                _ => {}
            }
        }
        "stream ended".to_string()
    });

    loop {
        tokio::select! {
            reason = &mut read_task => {
                let reason = reason.unwrap_or_else(|e| e.to_string());
                return Err(ClientError::ConnectionLost(reason));
            }
            line = input_rx.recv() => {
                let Some(line) = line else {
                    // Prompt closed: user exit
                    if let Err(e) = write.close().await {
                        tracing::debug!("Failed to close connection: {}", e);
                    }
                    read_task.abort();
                    return Ok(());
                };

                let Some(command) = parse_line(&line) else {
                    redisplay_prompt();
                    continue;
                };
                let json = match serde_json::to_string(&command) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize command: {}", e);
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(json.into())).await {
                    read_task.abort();
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
                redisplay_prompt();
            }
        }
    }
}
