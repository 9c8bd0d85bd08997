//! The per-session voice pipeline.
//!
//! Each session owns exactly one pipeline, driven by one message at a time:
//! audio goes through recognition, the transcript through the backend, the
//! reply through synthesis and transcoding, and the audio bytes back out
//! through the frame writer. Stages for one session never overlap; separate
//! sessions run fully in parallel.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};
use voicebot_core::{
    audio::{AudioFormat, FormatError, transcode},
    bot::{BackendError, ConversationBackend},
    speech::{SpeechRecognizer, SpeechSynthesizer, SynthesisError, VoiceOptions},
    wire::{FrameWriter, Message, Opcode, TransportError},
};

/// Keepalive token; consumed without touching the pipeline.
pub const HEARTBEAT_TOKEN: &str = "heartbeat";

/// Spoken when recognition produced nothing usable.
pub const FALLBACK_REPLY: &str = "Sorry, I don't understand.";

/// Reply-text directive that plays the canned sample instead of
/// synthesizing speech.
pub const PLAY_SAMPLE_DIRECTIVE: &str = "Music.Play";

/// What the client expects on the wire: WAV at 8 kHz, 16-bit, stereo.
pub const CLIENT_WIRE_FORMAT: AudioFormat = AudioFormat::riff(8_000, 16, 2);

/// Where the pipeline currently is for its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Transcribing,
    Dispatching,
    Synthesizing,
    Closed,
}

/// One bad turn. Only the transport variant tears the session down; the
/// rest leave it open with the turn dropped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PipelineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Transport(_))
    }
}

pub struct VoicePipeline {
    backend: Arc<dyn ConversationBackend>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sample_audio: Bytes,
    voice: VoiceOptions,
    from_user_id: String,
    conversation_id: String,
    watermark: Option<String>,
    writer: FrameWriter,
    state: PipelineState,
}

impl VoicePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<dyn ConversationBackend>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sample_audio: Bytes,
        voice: VoiceOptions,
        from_user_id: String,
        conversation_id: String,
        writer: FrameWriter,
    ) -> Self {
        Self {
            backend,
            recognizer,
            synthesizer,
            sample_audio,
            voice,
            from_user_id,
            conversation_id,
            watermark: None,
            writer,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "pipeline transition");
            self.state = next;
        }
    }

    /// Marks the pipeline closed on session teardown. Terminal.
    pub fn close(&mut self) {
        self.enter(PipelineState::Closed);
    }

    /// Runs one complete turn for an inbound message. Always returns the
    /// pipeline to `Idle` (errors included) so the session can keep going
    /// unless the error is fatal.
    pub async fn handle_message(&mut self, message: Message) -> Result<(), PipelineError> {
        let result = match message {
            Message::Text(text) if text.eq_ignore_ascii_case(HEARTBEAT_TOKEN) => {
                debug!("heartbeat");
                return Ok(());
            }
            Message::Text(text) => self.text_turn(&text).await,
            Message::Binary(audio) => self.voice_turn(&audio).await,
        };
        self.enter(PipelineState::Idle);
        result
    }

    /// Typed chat skips recognition and goes straight to the backend.
    async fn text_turn(&mut self, text: &str) -> Result<(), PipelineError> {
        let reply = self.dispatch(text).await?;
        self.speak(&reply).await
    }

    /// Voice input: recognize, dispatch, speak. An unusable transcript
    /// short-circuits to the fallback phrase without consulting the
    /// backend.
    async fn voice_turn(&mut self, audio: &[u8]) -> Result<(), PipelineError> {
        self.enter(PipelineState::Transcribing);
        let transcript = match self.recognizer.transcribe(audio).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "speech recognition failed, using fallback");
                String::new()
            }
        };

        if transcript.is_empty() {
            return self.speak(FALLBACK_REPLY).await;
        }

        info!(%transcript, "utterance recognized");
        let reply = self.dispatch(&transcript).await?;
        self.speak(&reply).await
    }

    /// Sends the user text to the backend and waits for the bot's reply,
    /// advancing the watermark cursor past this turn.
    async fn dispatch(&mut self, text: &str) -> Result<String, PipelineError> {
        self.enter(PipelineState::Dispatching);
        self.backend
            .post_message(&self.conversation_id, &self.from_user_id, text)
            .await?;
        let reply = self
            .backend
            .poll_replies(&self.conversation_id, self.watermark.as_deref())
            .await?;
        self.watermark = reply.watermark;
        Ok(reply.text)
    }

    /// Turns reply text into outbound audio. The play-sample directive
    /// bypasses synthesis and transcoding entirely; the asset goes out
    /// byte-for-byte.
    async fn speak(&mut self, text: &str) -> Result<(), PipelineError> {
        self.enter(PipelineState::Synthesizing);

        if text.contains(PLAY_SAMPLE_DIRECTIVE) {
            info!("reply carries the play-sample directive");
            self.writer.send(&self.sample_audio, Opcode::Binary).await?;
            return Ok(());
        }

        let synthesis_format = self
            .voice
            .output_format
            .audio_format()
            .ok_or_else(|| FormatError::NonPcmSource(self.voice.output_format.wire_name()))?;
        let synthesized = self.synthesizer.synthesize(text, &self.voice).await?;
        let wire_audio = transcode(&synthesized, synthesis_format, CLIENT_WIRE_FORMAT)?;
        self.writer.send(&wire_audio, Opcode::Binary).await?;
        Ok(())
    }
}
