//! Voicebot Core Library
//!
//! Transport-agnostic building blocks for the voice chat gateway:
//!
//! - `wire`: the frame/message model for the duplex client link, plus the
//!   assembler that turns fragmented frames into complete messages and the
//!   writer that splits outbound payloads back into bounded frames.
//! - `audio`: pure PCM/RIFF transcoding between the client wire format and
//!   the formats the remote speech services consume and produce.
//! - `speech`: speech-to-text and text-to-speech collaborators and their
//!   HTTP implementations.
//! - `bot`: the conversational backend collaborator (DirectLine-style
//!   polling client).

pub mod audio;
pub mod bot;
pub mod speech;
pub mod wire;
