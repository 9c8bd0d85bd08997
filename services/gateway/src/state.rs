//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the session
//! registry and the remote collaborators every session talks to.

use crate::{config::Config, ws::SessionRegistry};
use bytes::Bytes;
use std::sync::Arc;
use voicebot_core::{
    bot::ConversationBackend,
    speech::{SpeechRecognizer, SpeechSynthesizer, VoiceOptions},
};

/// The shared application state, created once at startup and passed to all
/// handlers. All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub backend: Arc<dyn ConversationBackend>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Canned WAV served verbatim for the play-sample directive.
    pub sample_audio: Bytes,
    pub voice: VoiceOptions,
    pub config: Arc<Config>,
}
