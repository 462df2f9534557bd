//! Per-connection read/write task pair.
//!
//! Every connection runs two tasks that share one [`CancellationToken`]:
//!
//! - the read task pulls frames off the transport and submits decoded
//!   commands to the hub's broadcast queue
//! - the write task drains the client's outbound queue onto the transport
//!   and sends periodic liveness pings
//!
//! Either task firing the token ends both. Only the write task owns the
//! sink, so the transport is closed exactly once.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use fanout_shared::time::now_millis;

use super::{ClientHandle, HubHandle, OutboundReceiver};
use crate::{
    domain::{ClientId, Frame, MessageSink, MessageSource, TransportError},
    infrastructure::dto::{RelayedMessage, decode_command},
};

/// Per-connection state owned by the connection's own tasks.
pub struct Client {
    id: ClientId,
    outbound: OutboundReceiver,
    cancel: CancellationToken,
}

impl Client {
    /// Create a client with an outbound queue of `outbound_capacity` messages.
    ///
    /// Returns the client and the [`ClientHandle`] to register with the hub.
    ///
    /// # Panics
    ///
    /// Panics if `outbound_capacity` is zero; [`ServerConfig::validate`]
    /// rejects that before the server starts.
    ///
    /// [`ServerConfig::validate`]: crate::config::ServerConfig::validate
    pub fn new(
        id: ClientId,
        outbound_capacity: usize,
        cancel: CancellationToken,
    ) -> (Self, ClientHandle) {
        let (tx, rx) = mpsc::channel(outbound_capacity);
        let handle = ClientHandle::new(id.clone(), tx, cancel.clone());
        let client = Self {
            id,
            outbound: rx,
            cancel,
        };
        (client, handle)
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Spawn the read and write tasks and wait until both have exited.
    pub async fn serve<R, W>(self, source: R, sink: W, hub: HubHandle, ping_interval: Duration)
    where
        R: MessageSource + 'static,
        W: MessageSink + 'static,
    {
        let Client {
            id,
            outbound,
            cancel,
        } = self;

        let read_task = tokio::spawn(read_loop(id.clone(), source, hub, cancel.clone()));
        let write_task = tokio::spawn(write_loop(
            id.clone(),
            sink,
            outbound,
            cancel.clone(),
            ping_interval,
        ));

        let (read_result, write_result) = tokio::join!(read_task, write_task);
        if let Err(e) = read_result {
            tracing::error!("Read task for client '{}' failed: {}", id, e);
        }
        if let Err(e) = write_result {
            tracing::error!("Write task for client '{}' failed: {}", id, e);
        }
        // Covers a panicked task that never reached its own cancel
        cancel.cancel();

        tracing::info!("Client '{}' disconnected", id);
    }
}

/// Read frames until the peer closes, the transport fails, or `cancel` fires.
///
/// Text frames are decoded as `{"cmd", "payload"}` and re-broadcast as a
/// [`RelayedMessage`]. Malformed JSON is dropped without ending the loop.
/// On exit the token is fired and the client is unregistered from the hub.
pub async fn read_loop<R: MessageSource>(
    id: ClientId,
    mut source: R,
    hub: HubHandle,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Read task for client '{}' cancelled", id);
                break;
            }
            frame = source.next_frame() => frame,
        };

        match frame {
            Some(Ok(Frame::Text(text))) => {
                tracing::debug!("Received from '{}': {}", id, text);

                let command = match decode_command(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        tracing::warn!("Dropping malformed message from '{}': {}", id, e);
                        continue;
                    }
                };

                let relayed = RelayedMessage::new(&id, &command, now_millis());
                let json = match serde_json::to_string(&relayed) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize relayed message: {}", e);
                        continue;
                    }
                };

                if let Err(e) = hub.broadcast(json) {
                    tracing::error!("Cannot relay message from '{}': {}", id, e);
                    break;
                }
            }
            Some(Ok(Frame::Close)) => {
                tracing::info!("Client '{}' requested close", id);
                break;
            }
            Some(Ok(other)) => {
                tracing::debug!("Ignoring frame from '{}': {:?}", id, other);
            }
            Some(Err(e)) => {
                tracing::warn!("Transport error on client '{}': {}", id, e);
                break;
            }
            None => {
                tracing::info!("Client '{}' stream ended", id);
                break;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = hub.unregister(id.clone()) {
        tracing::error!("Failed to unregister client '{}': {}", id, e);
    }
}

/// Drain the outbound queue onto the sink and ping every `ping_interval`.
///
/// Ends when `cancel` fires, a send fails, or the outbound queue closes
/// without a cancellation (the hub control loop stopped), in which case a
/// close frame is sent first. On exit the token is fired and the sink is
/// closed; `sink.close()` performs the close handshake, so a client evicted
/// by the hub (token fired and queue closed together) still gets a close
/// frame on the wire.
///
/// # Panics
///
/// Panics if `ping_interval` is zero.
pub async fn write_loop<W: MessageSink>(
    id: ClientId,
    mut sink: W,
    mut outbound: OutboundReceiver,
    cancel: CancellationToken,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Write task for client '{}' cancelled", id);
                break;
            }
            message = outbound.recv() => match message {
                Some(text) => send_frame(&mut sink, Frame::Text(text), &cancel).await,
                None => {
                    tracing::info!("Outbound queue of client '{}' closed by hub", id);
                    if let Err(e) = send_frame(&mut sink, Frame::Close, &cancel).await {
                        tracing::debug!("Failed to send close frame to '{}': {}", id, e);
                    }
                    break;
                }
            },
            _ = ticker.tick() => {
                tracing::trace!("Ping client '{}'", id);
                send_frame(&mut sink, Frame::Ping(Vec::new()), &cancel).await
            }
        };

        if let Err(e) = result {
            tracing::warn!("Write to client '{}' failed: {}", id, e);
            break;
        }
    }

    cancel.cancel();
    if let Err(e) = sink.close().await {
        tracing::debug!("Closing transport of client '{}' failed: {}", id, e);
    }
}

/// Send one frame, giving up as soon as `cancel` fires.
async fn send_frame<W: MessageSink>(
    sink: &mut W,
    frame: Frame,
    cancel: &CancellationToken,
) -> Result<(), TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Closed),
        result = sink.send_frame(frame) => result,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{MockMessageSink, TransportError},
        hub::Hub,
    };

    const TIMEOUT: Duration = Duration::from_secs(2);
    const LONG_PING: Duration = Duration::from_secs(3600);

    /// Source fed from a channel; pending until the test pushes a frame.
    struct ChannelSource {
        rx: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    }

    #[async_trait]
    impl MessageSource for ChannelSource {
        async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
            self.rx.recv().await
        }
    }

    /// Sink that records frames and counts close calls.
    struct RecordingSink {
        frames: mpsc::UnboundedSender<Frame>,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
            self.frames.send(frame).map_err(|_| TransportError::Closed)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn channel_source() -> (
        ChannelSource,
        mpsc::UnboundedSender<Result<Frame, TransportError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSource { rx }, tx)
    }

    fn recording_sink() -> (
        RecordingSink,
        mpsc::UnboundedReceiver<Frame>,
        Arc<AtomicUsize>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        let sink = RecordingSink {
            frames: tx,
            closes: closes.clone(),
        };
        (sink, rx, closes)
    }

    fn client_id(name: &str) -> ClientId {
        ClientId::new(name.to_string()).unwrap()
    }

    async fn wait_for_count(hub: &HubHandle, expected: usize) {
        let mut count = hub.subscribe_client_count();
        tokio::time::timeout(TIMEOUT, count.wait_for(|n| *n == expected))
            .await
            .expect("timed out waiting for client count")
            .expect("hub stopped");
    }

    #[tokio::test]
    async fn test_write_loop_closes_transport_once_on_cancel() {
        // テスト項目: キャンセル時にトランスポートがちょうど 1 回だけクローズされる
        // given (前提条件):
        let mut sink = MockMessageSink::new();
        sink.expect_send_frame().times(0);
        sink.expect_close().times(1).returning(|| Ok(()));
        let (_tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(write_loop(
            client_id("alice"),
            sink,
            rx,
            cancel.clone(),
            LONG_PING,
        ));

        // when (操作):
        cancel.cancel();
        cancel.cancel();

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, task)
            .await
            .expect("write task did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_loop_sends_close_frame_when_queue_closed() {
        // テスト項目: Hub が送信キューを閉じると close フレームを送って終了する
        // given (前提条件):
        let (sink, mut frames, closes) = recording_sink();
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(write_loop(
            client_id("alice"),
            sink,
            rx,
            cancel.clone(),
            LONG_PING,
        ));

        // when (操作):
        tx.send("last words".to_string()).await.unwrap();
        drop(tx);

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
        assert_eq!(frames.recv().await, Some(Frame::Text("last words".to_string())));
        assert_eq!(frames.recv().await, Some(Frame::Close));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_write_loop_sends_close_frame_when_hub_stops() {
        // テスト項目: Hub の制御ループが停止すると登録済みクライアントに close フレームが送られる
        // given (前提条件):
        let (hub, hub_join) = Hub::spawn(16);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        hub.register(ClientHandle::new(client_id("alice"), tx, cancel.clone()))
            .unwrap();
        wait_for_count(&hub, 1).await;
        let (sink, mut frames, closes) = recording_sink();
        let task = tokio::spawn(write_loop(
            client_id("alice"),
            sink,
            rx,
            cancel.clone(),
            LONG_PING,
        ));

        // when (操作):
        drop(hub);
        tokio::time::timeout(TIMEOUT, hub_join).await.unwrap().unwrap();

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
        assert_eq!(frames.recv().await, Some(Frame::Close));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_evicted_client_is_closed_once_without_draining() {
        // テスト項目: Hub に切断されたクライアントは滞留メッセージを送らずに 1 回だけクローズされる
        // given (前提条件):
        let (hub, _join) = Hub::spawn(16);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);
        hub.register(ClientHandle::new(client_id("slow"), tx, cancel.clone()))
            .unwrap();
        wait_for_count(&hub, 1).await;

        // when (操作): 書き込みタスク開始前にキューを溢れさせる
        hub.broadcast("one").unwrap();
        hub.broadcast("two").unwrap();
        wait_for_count(&hub, 0).await;
        let (sink, mut frames, closes) = recording_sink();
        let task = tokio::spawn(write_loop(
            client_id("slow"),
            sink,
            rx,
            cancel.clone(),
            LONG_PING,
        ));

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
        assert!(cancel.is_cancelled());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_write_loop_preserves_fifo_order() {
        // テスト項目: 送信キューのメッセージが FIFO 順で書き込まれる
        // given (前提条件):
        let (sink, mut frames, _closes) = recording_sink();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let _task = tokio::spawn(write_loop(
            client_id("alice"),
            sink,
            rx,
            cancel.clone(),
            LONG_PING,
        ));

        // when (操作):
        for i in 0..5 {
            tx.send(format!("message-{}", i)).await.unwrap();
        }

        // then (期待する結果):
        for i in 0..5 {
            let frame = tokio::time::timeout(TIMEOUT, frames.recv()).await.unwrap();
            assert_eq!(frame, Some(Frame::Text(format!("message-{}", i))));
        }
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_loop_sends_periodic_pings() {
        // テスト項目: 一定間隔で ping フレームが送信される（開始直後には送らない）
        // given (前提条件):
        let (sink, mut frames, _closes) = recording_sink();
        let (_tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let _task = tokio::spawn(write_loop(
            client_id("alice"),
            sink,
            rx,
            cancel.clone(),
            Duration::from_secs(15),
        ));

        // when (操作):
        let first = frames.recv().await;
        let first_at = started.elapsed();
        let second = frames.recv().await;

        // then (期待する結果):
        assert_eq!(first, Some(Frame::Ping(Vec::new())));
        assert_eq!(second, Some(Frame::Ping(Vec::new())));
        assert!(first_at >= Duration::from_secs(15));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_read_loop_relays_commands_and_skips_malformed() {
        // テスト項目: 受信したコマンドが中継され、不正な JSON は読み飛ばされる
        // given (前提条件):
        let (hub, _join) = Hub::spawn(16);
        let (observer_tx, mut observer_rx) = mpsc::channel(8);
        hub.register(ClientHandle::new(
            client_id("observer"),
            observer_tx,
            CancellationToken::new(),
        ))
        .unwrap();
        wait_for_count(&hub, 1).await;

        let (source, frames) = channel_source();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_loop(client_id("alice"), source, hub.clone(), cancel.clone()));

        // when (操作):
        frames.send(Ok(Frame::Text("{broken".to_string()))).unwrap();
        frames.send(Ok(Frame::Ping(Vec::new()))).unwrap();
        frames
            .send(Ok(Frame::Text(r#"{"cmd":"move","payload":"ff00"}"#.to_string())))
            .unwrap();

        // then (期待する結果):
        let json = tokio::time::timeout(TIMEOUT, observer_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let relayed: RelayedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(relayed.from, "alice");
        assert_eq!(relayed.cmd, "move");
        assert_eq!(relayed.payload, "ff00");
        assert!(!task.is_finished());
        assert!(!cancel.is_cancelled());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_read_loop_unregisters_on_stream_end() {
        // テスト項目: ストリーム終了時にキャンセルが発火し、Hub から登録解除される
        // given (前提条件):
        let (hub, _join) = Hub::spawn(16);
        let cancel = CancellationToken::new();
        let (client, handle) = Client::new(client_id("alice"), 8, cancel.clone());
        hub.register(handle).unwrap();
        wait_for_count(&hub, 1).await;
        let (source, frames) = channel_source();
        let task = tokio::spawn(read_loop(client.id().clone(), source, hub.clone(), cancel.clone()));

        // when (操作):
        drop(frames);

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
        assert!(cancel.is_cancelled());
        wait_for_count(&hub, 0).await;
    }

    #[tokio::test]
    async fn test_cancel_stops_both_tasks_and_closes_once() {
        // テスト項目: キャンセルで読み書き両タスクが終了し、トランスポートは 1 回だけクローズされる
        // given (前提条件):
        let (hub, _join) = Hub::spawn(16);
        let cancel = CancellationToken::new();
        let (client, handle) = Client::new(client_id("alice"), 8, cancel.clone());
        hub.register(handle).unwrap();
        wait_for_count(&hub, 1).await;
        let (source, _frames) = channel_source();
        let (sink, _sent, closes) = recording_sink();
        let serve = tokio::spawn(client.serve(source, sink, hub.clone(), LONG_PING));

        // when (操作):
        cancel.cancel();

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, serve)
            .await
            .expect("client tasks did not stop")
            .unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        wait_for_count(&hub, 0).await;
    }

    #[tokio::test]
    async fn test_send_failure_tears_down_connection() {
        // テスト項目: 書き込みエラーで両タスクが終了し、登録解除とクローズが 1 回ずつ行われる
        // given (前提条件):
        let (hub, _join) = Hub::spawn(16);
        let cancel = CancellationToken::new();
        let (client, handle) = Client::new(client_id("alice"), 8, cancel.clone());
        hub.register(handle).unwrap();
        wait_for_count(&hub, 1).await;

        let mut sink = MockMessageSink::new();
        sink.expect_send_frame()
            .times(1)
            .returning(|_| Err(TransportError::Send("broken pipe".to_string())));
        sink.expect_close().times(1).returning(|| Ok(()));
        let (source, _frames) = channel_source();
        let serve = tokio::spawn(client.serve(source, sink, hub.clone(), LONG_PING));

        // when (操作):
        hub.broadcast("hello").unwrap();

        // then (期待する結果):
        tokio::time::timeout(TIMEOUT, serve).await.unwrap().unwrap();
        assert!(cancel.is_cancelled());
        wait_for_count(&hub, 0).await;
    }
}
