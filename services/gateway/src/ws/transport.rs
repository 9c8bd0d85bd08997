//! Adapts an axum WebSocket to the core frame seams.
//!
//! The WebSocket layer reassembles inbound fragmentation itself, so every
//! inbound message surfaces here as a single final frame. Outbound, the
//! bounded frames produced by the core writer are coalesced back into one
//! WebSocket message per logical payload, flushed when the final frame
//! arrives — the client sees exactly one message either way.

use async_trait::async_trait;
use axum::extract::ws::{self, CloseFrame, Message as WsMessage, WebSocket, close_code};
use bytes::BytesMut;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use voicebot_core::wire::{Frame, FrameRead, FrameWrite, Opcode, TransportError};

/// Read half of the client connection.
pub struct WsFrameStream {
    inner: SplitStream<WebSocket>,
}

impl WsFrameStream {
    pub fn new(inner: SplitStream<WebSocket>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FrameRead for WsFrameStream {
    async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.inner.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(Frame::text(text.as_str().as_bytes().to_vec(), true));
                }
                Some(Ok(WsMessage::Binary(payload))) => {
                    return Ok(Frame::binary(payload, true));
                }
                // Keepalive plumbing handled by axum; not part of the
                // message stream.
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Close(_))) => return Ok(Frame::close()),
                Some(Err(e)) => return Err(TransportError::Failed(e.to_string())),
                None => return Err(TransportError::StreamEnded),
            }
        }
    }
}

/// Write half of the client connection.
pub struct WsFrameSink {
    inner: SplitSink<WebSocket, WsMessage>,
    pending: BytesMut,
    pending_opcode: Option<Opcode>,
    open: bool,
}

impl WsFrameSink {
    pub fn new(inner: SplitSink<WebSocket, WsMessage>) -> Self {
        Self {
            inner,
            pending: BytesMut::new(),
            pending_opcode: None,
            open: true,
        }
    }

    async fn flush_message(&mut self, opcode: Opcode) -> Result<(), TransportError> {
        let payload = self.pending.split().freeze();
        let message = match opcode {
            Opcode::Text => {
                WsMessage::Text(String::from_utf8_lossy(&payload).into_owned().into())
            }
            Opcode::Binary => WsMessage::Binary(payload),
            Opcode::Close => unreachable!("close is not a payload opcode"),
        };
        self.inner.send(message).await.map_err(|e| {
            self.open = false;
            TransportError::Failed(e.to_string())
        })
    }
}

#[async_trait]
impl FrameWrite for WsFrameSink {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::SessionNotOpen);
        }
        if frame.opcode == Opcode::Close {
            return self.close("server close").await;
        }

        let opcode = *self.pending_opcode.get_or_insert(frame.opcode);
        self.pending.extend_from_slice(&frame.payload);
        if frame.fin {
            self.pending_opcode = None;
            self.flush_message(opcode).await?;
        }
        Ok(())
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.pending.clear();
        self.pending_opcode = None;

        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: ws::Utf8Bytes::from(reason.to_owned()),
        };
        self.inner
            .send(WsMessage::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))
    }
}
