//! Remote speech collaborators: recognition (speech-to-text), synthesis
//! (text-to-speech), and the bearer-token provider both authenticate with.
//!
//! The gateway depends only on the traits; the `Http*` implementations talk
//! to the cognitive speech endpoints over `reqwest`.

pub mod recognize;
pub mod synthesize;
pub mod token;

pub use recognize::HttpSpeechRecognizer;
pub use synthesize::HttpSpeechSynthesizer;
pub use token::CachedTokenProvider;

use async_trait::async_trait;

use crate::audio::AudioFormat;

/// Voice gender requested from the synthesis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

/// Output formats the synthesis service can produce, by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutputFormat {
    Raw8Khz8BitMonoMuLaw,
    Raw16Khz16BitMonoPcm,
    Riff8Khz8BitMonoMuLaw,
    Riff16Khz16BitMonoPcm,
    Audio16Khz128KBitRateMonoMp3,
    Audio16Khz64KBitRateMonoMp3,
    Audio16Khz32KBitRateMonoMp3,
}

impl AudioOutputFormat {
    /// The value sent in the `X-Microsoft-OutputFormat` header.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Raw8Khz8BitMonoMuLaw => "raw-8khz-8bit-mono-mulaw",
            Self::Raw16Khz16BitMonoPcm => "raw-16khz-16bit-mono-pcm",
            Self::Riff8Khz8BitMonoMuLaw => "riff-8khz-8bit-mono-mulaw",
            Self::Riff16Khz16BitMonoPcm => "riff-16khz-16bit-mono-pcm",
            Self::Audio16Khz128KBitRateMonoMp3 => "audio-16khz-128kbitrate-mono-mp3",
            Self::Audio16Khz64KBitRateMonoMp3 => "audio-16khz-64kbitrate-mono-mp3",
            Self::Audio16Khz32KBitRateMonoMp3 => "audio-16khz-32kbitrate-mono-mp3",
        }
    }

    /// The PCM shape of the produced bytes, when the format is PCM at all.
    /// Compressed formats return `None` and cannot be fed to the transcoder.
    pub fn audio_format(&self) -> Option<AudioFormat> {
        match self {
            Self::Raw16Khz16BitMonoPcm => Some(AudioFormat::raw(16_000, 16, 1)),
            Self::Riff16Khz16BitMonoPcm => Some(AudioFormat::riff(16_000, 16, 1)),
            _ => None,
        }
    }
}

/// Parameters for one synthesis request.
#[derive(Debug, Clone)]
pub struct VoiceOptions {
    pub locale: String,
    pub voice_name: String,
    pub gender: Gender,
    pub output_format: AudioOutputFormat,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            voice_name: "Microsoft Server Speech Text to Speech Voice (en-US, ZiraRUS)"
                .to_string(),
            gender: Gender::Female,
            output_format: AudioOutputFormat::Riff16Khz16BitMonoPcm,
        }
    }
}

/// Remote speech-to-text failure. Recovered locally with a fallback phrase;
/// never fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("token acquisition failed: {0}")]
    Token(String),
    #[error("recognition request failed: {0}")]
    Request(String),
    #[error("recognition service returned a malformed payload: {0}")]
    MalformedResponse(String),
}

/// Remote text-to-speech failure. Surfaced to the caller; the session stays
/// open but no audio is sent for the turn.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("token acquisition failed: {0}")]
    Token(String),
    #[error("synthesis request failed: {0}")]
    Request(String),
    #[error("synthesis service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Issues short-lived bearer credentials for the speech endpoints. The
/// provider refreshes tokens itself; callers just ask.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self) -> anyhow::Result<String>;
}

/// Remote speech-to-text.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribes one utterance. An unintelligible utterance yields an
    /// empty string, not an error.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RecognitionError>;
}

/// Remote text-to-speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        options: &VoiceOptions,
    ) -> Result<Vec<u8>, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Container;

    #[test]
    fn wire_names_match_the_service_vocabulary() {
        assert_eq!(
            AudioOutputFormat::Riff16Khz16BitMonoPcm.wire_name(),
            "riff-16khz-16bit-mono-pcm"
        );
        assert_eq!(
            AudioOutputFormat::Raw8Khz8BitMonoMuLaw.wire_name(),
            "raw-8khz-8bit-mono-mulaw"
        );
    }

    #[test]
    fn only_pcm_formats_map_to_a_transcodable_shape() {
        let riff = AudioOutputFormat::Riff16Khz16BitMonoPcm
            .audio_format()
            .unwrap();
        assert_eq!(riff.container, Container::Riff);
        assert_eq!(riff.pcm.sample_rate, 16_000);
        assert!(
            AudioOutputFormat::Audio16Khz64KBitRateMonoMp3
                .audio_format()
                .is_none()
        );
    }

    #[test]
    fn default_voice_matches_the_service_defaults() {
        let options = VoiceOptions::default();
        assert_eq!(options.locale, "en-US");
        assert_eq!(options.gender, Gender::Female);
        assert_eq!(
            options.output_format,
            AudioOutputFormat::Riff16Khz16BitMonoPcm
        );
    }
}
