//! Reassembles fragmented frames into complete messages.

use bytes::BytesMut;

use super::{FrameRead, Message, Opcode, TransportError};

/// Turns the frame stream of one connection into a sequence of complete
/// [`Message`]s.
///
/// Frames are consumed strictly in arrival order and a message is only
/// emitted once its final frame has arrived, so two messages can never
/// interleave on one connection. The sequence ends when the peer sends a
/// close frame (`Ok(None)`) or the underlying read fails (`Err`), which the
/// caller must treat as the same teardown.
pub struct MessageAssembler<R> {
    reader: R,
}

impl<R: FrameRead> MessageAssembler<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads frames until one logical message is complete.
    ///
    /// Returns `Ok(None)` when the peer initiates the close handshake, even
    /// mid-message; any partially accumulated payload is discarded.
    pub async fn next_message(&mut self) -> Result<Option<Message>, TransportError> {
        let first = self.reader.read_frame().await?;
        if first.opcode == Opcode::Close {
            return Ok(None);
        }

        let opcode = first.opcode;
        let mut payload = BytesMut::from(&first.payload[..]);
        let mut fin = first.fin;

        while !fin {
            let next = self.reader.read_frame().await?;
            if next.opcode == Opcode::Close {
                return Ok(None);
            }
            payload.extend_from_slice(&next.payload);
            fin = next.fin;
        }

        let message = match opcode {
            // The original protocol decodes text leniently rather than
            // rejecting the message.
            Opcode::Text => Message::Text(String::from_utf8_lossy(&payload).into_owned()),
            Opcode::Binary => Message::Binary(payload.freeze()),
            Opcode::Close => unreachable!("close frames terminate above"),
        };
        Ok(Some(message))
    }
}
