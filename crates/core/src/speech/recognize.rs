//! HTTP speech-to-text client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{RecognitionError, SpeechRecognizer, TokenProvider};

/// Content type announced for the posted audio. The wire format from the
/// client is 8 kHz PCM in a WAV wrapper.
const AUDIO_CONTENT_TYPE: &str = r#"audio/wav; codec="audio/pcm"; samplerate=8000"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
}

/// Posts one complete utterance to the recognition endpoint and returns the
/// display transcript.
pub struct HttpSpeechRecognizer {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpSpeechRecognizer {
    pub fn new(client: reqwest::Client, endpoint: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            endpoint,
            tokens,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for HttpSpeechRecognizer {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, RecognitionError> {
        let token = self
            .tokens
            .get_token()
            .await
            .map_err(|e| RecognitionError::Token(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("Content-Type", AUDIO_CONTENT_TYPE)
            .header("Accept", "application/json")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| RecognitionError::Request(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| RecognitionError::Request(e.to_string()))?;
        let parsed: RecognitionResponse = serde_json::from_str(&body)
            .map_err(|_| RecognitionError::MalformedResponse(body.clone()))?;

        if parsed.recognition_status != "Success" {
            debug!(status = %parsed.recognition_status, "utterance not recognized");
            return Ok(String::new());
        }
        Ok(parsed.display_text.unwrap_or_default())
    }
}
