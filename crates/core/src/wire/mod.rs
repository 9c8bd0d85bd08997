//! Frame-level wire model for the duplex client connection.
//!
//! The gateway core never touches a concrete WebSocket type. It depends on
//! the two seams defined here: [`FrameRead`] for pulling frames off the
//! connection and [`FrameWrite`] for pushing frames (and the close
//! handshake) back. The [`assembler`] reassembles fragmented inbound frames
//! into complete [`Message`]s and the [`writer`] splits outbound payloads
//! into bounded frames.

pub mod assembler;
pub mod writer;

pub use assembler::MessageAssembler;
pub use writer::{FRAME_BYTES, FrameWriter, SharedFrameSink};

use async_trait::async_trait;
use bytes::Bytes;

/// The kind of a wire-level frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Text,
    Binary,
    Close,
}

/// One wire-level chunk of a logical message.
///
/// `fin` marks the end of the logical message; a frame with `fin == false`
/// is continued by the next frame on the same connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: Bytes,
    pub fin: bool,
}

impl Frame {
    pub fn text(payload: impl Into<Bytes>, fin: bool) -> Self {
        Self {
            opcode: Opcode::Text,
            payload: payload.into(),
            fin,
        }
    }

    pub fn binary(payload: impl Into<Bytes>, fin: bool) -> Self {
        Self {
            opcode: Opcode::Binary,
            payload: payload.into(),
            fin,
        }
    }

    pub fn close() -> Self {
        Self {
            opcode: Opcode::Close,
            payload: Bytes::new(),
            fin: true,
        }
    }
}

/// A complete logical unit reassembled from one or more frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
}

/// Failures on the duplex transport. Any of these is fatal to the owning
/// session and triggers the same teardown path as an explicit close.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("the session transport is not open")]
    SessionNotOpen,
    #[error("transport read/write failed: {0}")]
    Failed(String),
    #[error("transport stream ended unexpectedly")]
    StreamEnded,
}

/// Read side of the duplex transport seam.
#[async_trait]
pub trait FrameRead: Send {
    /// Pulls the next complete frame off the connection.
    async fn read_frame(&mut self) -> Result<Frame, TransportError>;
}

/// Write side of the duplex transport seam.
#[async_trait]
pub trait FrameWrite: Send {
    /// Writes one frame. A frame written after `close` fails with
    /// [`TransportError::SessionNotOpen`].
    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Initiates the close handshake. Idempotent.
    async fn close(&mut self, reason: &str) -> Result<(), TransportError>;
}
