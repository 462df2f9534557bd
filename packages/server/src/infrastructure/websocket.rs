//! axum WebSocket を使ったトランスポート実装
//!
//! An upgraded [`WebSocket`] is split into its stream and sink halves.
//! The stream half backs the read task, the sink half the write task.
//! Framing, ping/pong replies and the close handshake stay inside axum.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};

use crate::domain::{Frame, MessageSink, MessageSource, TransportError};

/// Split an upgraded socket into transport halves.
pub fn split(socket: WebSocket) -> (WebSocketSource, WebSocketSink) {
    let (sink, stream) = socket.split();
    (
        WebSocketSource { inner: stream },
        WebSocketSink { inner: sink },
    )
}

/// Inbound half of an axum WebSocket
pub struct WebSocketSource {
    inner: SplitStream<WebSocket>,
}

/// Outbound half of an axum WebSocket
pub struct WebSocketSink {
    inner: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl MessageSource for WebSocketSource {
    async fn next_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inner.next().await.map(|result| {
            result
                .map(Frame::from)
                .map_err(|e| TransportError::Receive(e.to_string()))
        })
    }
}

#[async_trait]
impl MessageSink for WebSocketSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.inner
            .send(Message::from(frame))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text.as_str().to_owned()),
            Message::Binary(data) => Frame::Binary(data.to_vec()),
            Message::Ping(data) => Frame::Ping(data.to_vec()),
            Message::Pong(data) => Frame::Pong(data.to_vec()),
            Message::Close(_) => Frame::Close,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
            Frame::Ping(data) => Message::Ping(data.into()),
            Frame::Pong(data) => Message::Pong(data.into()),
            Frame::Close => Message::Close(None),
        }
    }
}
