//! Splits outbound payloads into bounded frames and writes them in order.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use super::{Frame, FrameWrite, Opcode, TransportError};

/// Maximum payload carried by a single outbound frame.
pub const FRAME_BYTES: usize = 10 * 1024;

/// A frame sink shared between the writer and the session handle that may
/// need to close it.
pub type SharedFrameSink = Arc<Mutex<dyn FrameWrite>>;

/// Writes logical payloads to one session as ordered, bounded frames.
///
/// The sink mutex is held for the whole of one `send`, so two concurrent
/// logical sends on the same session serialize instead of interleaving
/// frames on the wire.
#[derive(Clone)]
pub struct FrameWriter {
    sink: SharedFrameSink,
}

impl FrameWriter {
    pub fn new(sink: SharedFrameSink) -> Self {
        Self { sink }
    }

    /// Sends one logical payload. All frames but the last carry
    /// `fin == false`; an empty payload still produces exactly one empty
    /// final frame so the peer sees a complete (empty) message.
    pub async fn send(&self, payload: &[u8], opcode: Opcode) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;

        if payload.is_empty() {
            return sink
                .write_frame(Frame {
                    opcode,
                    payload: Bytes::new(),
                    fin: true,
                })
                .await;
        }

        let mut chunks = payload.chunks(FRAME_BYTES).peekable();
        while let Some(chunk) = chunks.next() {
            let fin = chunks.peek().is_none();
            sink.write_frame(Frame {
                opcode,
                payload: Bytes::copy_from_slice(chunk),
                fin,
            })
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{FrameRead, MessageAssembler, Message};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Records every frame it is asked to write.
    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Frame>,
        closed: bool,
    }

    #[async_trait]
    impl FrameWrite for RecordingSink {
        async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
            if self.closed {
                return Err(TransportError::SessionNotOpen);
            }
            self.frames.push(frame);
            Ok(())
        }

        async fn close(&mut self, _reason: &str) -> Result<(), TransportError> {
            self.closed = true;
            Ok(())
        }
    }

    fn shared_sink() -> (FrameWriter, Arc<Mutex<RecordingSink>>) {
        let sink = Arc::new(Mutex::new(RecordingSink::default()));
        (FrameWriter::new(sink.clone()), sink)
    }

    struct ReplayReader(VecDeque<Frame>);

    #[async_trait]
    impl FrameRead for ReplayReader {
        async fn read_frame(&mut self) -> Result<Frame, TransportError> {
            Ok(self.0.pop_front().unwrap_or_else(Frame::close))
        }
    }

    #[tokio::test]
    async fn empty_payload_sends_one_empty_final_frame() {
        let (writer, sink) = shared_sink();
        writer.send(&[], Opcode::Binary).await.unwrap();

        let frames = &sink.lock().await.frames;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert!(frames[0].payload.is_empty());
    }

    #[tokio::test]
    async fn large_payload_is_split_with_exactly_one_final_frame() {
        let payload = vec![0xABu8; FRAME_BYTES * 2 + 5];
        let (writer, sink) = shared_sink();
        writer.send(&payload, Opcode::Binary).await.unwrap();

        let frames = &sink.lock().await.frames;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].payload.len(), FRAME_BYTES);
        assert_eq!(frames[1].payload.len(), FRAME_BYTES);
        assert_eq!(frames[2].payload.len(), 5);
        assert_eq!(
            frames.iter().filter(|f| f.fin).count(),
            1,
            "only the last frame may be final"
        );
        assert!(frames[2].fin);
    }

    /// Splitting and reassembling must give back the original bytes for any
    /// payload size, including zero and exact multiples of the frame size.
    #[tokio::test]
    async fn split_then_reassemble_is_identity() {
        for size in [0usize, 1, FRAME_BYTES - 1, FRAME_BYTES, FRAME_BYTES + 1, 3 * FRAME_BYTES + 7]
        {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let (writer, sink) = shared_sink();
            writer.send(&payload, Opcode::Binary).await.unwrap();

            let frames: VecDeque<Frame> = sink.lock().await.frames.iter().cloned().collect();
            let mut assembler = MessageAssembler::new(ReplayReader(frames));
            match assembler.next_message().await.unwrap().unwrap() {
                Message::Binary(bytes) => assert_eq!(&bytes[..], &payload[..], "size {size}"),
                other => panic!("unexpected message {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn concurrent_sends_do_not_interleave_frames() {
        let (writer, sink) = shared_sink();
        let a = vec![0x11u8; FRAME_BYTES * 3];
        let b = vec![0x22u8; FRAME_BYTES * 3];

        let w1 = writer.clone();
        let w2 = writer.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { w1.send(&a, Opcode::Binary).await }),
            tokio::spawn(async move { w2.send(&b, Opcode::Binary).await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        // Whichever send won the sink, its three frames must be contiguous.
        let frames = &sink.lock().await.frames;
        assert_eq!(frames.len(), 6);
        let first_byte = frames[0].payload[0];
        assert!(frames[..3].iter().all(|f| f.payload[0] == first_byte));
        assert!(frames[3..].iter().all(|f| f.payload[0] != first_byte));
        assert!(frames[2].fin && frames[5].fin);
    }

    #[tokio::test]
    async fn send_after_close_fails_with_session_not_open() {
        let (writer, sink) = shared_sink();
        sink.lock().await.close("test").await.unwrap();

        let err = writer.send(b"late", Opcode::Text).await.unwrap_err();
        assert!(matches!(err, TransportError::SessionNotOpen));
    }
}
