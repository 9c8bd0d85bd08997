//! HTTP text-to-speech client.
//!
//! Requests are SSML documents; the desired audio shape travels in the
//! `X-Microsoft-OutputFormat` header.

use std::sync::Arc;

use async_trait::async_trait;

use super::{SpeechSynthesizer, SynthesisError, TokenProvider, VoiceOptions};

/// Escapes the five XML-reserved characters in text content.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Builds the SSML body for one utterance. Rate and volume offsets follow
/// the original service tuning.
fn build_ssml(options: &VoiceOptions, text: &str) -> String {
    format!(
        concat!(
            r#"<speak version="1.0" xml:lang="en-US">"#,
            r#"<voice xml:lang="{locale}" xml:gender="{gender}" name="{name}">"#,
            r#"<prosody rate="+15.00%" volume="-20.00%">{text}</prosody>"#,
            r#"</voice></speak>"#
        ),
        locale = options.locale,
        gender = options.gender.as_str(),
        name = escape_xml(&options.voice_name),
        text = escape_xml(text),
    )
}

pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpSpeechSynthesizer {
    pub fn new(client: reqwest::Client, endpoint: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            endpoint,
            tokens,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        options: &VoiceOptions,
    ) -> Result<Vec<u8>, SynthesisError> {
        let token = self
            .tokens
            .get_token()
            .await
            .map_err(|e| SynthesisError::Token(e.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", options.output_format.wire_name())
            .header("User-Agent", "voicebot-gateway")
            .body(build_ssml(options, text))
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssml_carries_voice_parameters_and_prosody() {
        let options = VoiceOptions::default();
        let ssml = build_ssml(&options, "Hi there");
        assert!(ssml.starts_with(r#"<speak version="1.0""#));
        assert!(ssml.contains(r#"xml:lang="en-US""#));
        assert!(ssml.contains(r#"xml:gender="Female""#));
        assert!(ssml.contains("ZiraRUS"));
        assert!(ssml.contains(r#"rate="+15.00%""#));
        assert!(ssml.contains(r#"volume="-20.00%""#));
        assert!(ssml.contains(">Hi there</prosody>"));
    }

    #[test]
    fn reply_text_is_xml_escaped() {
        let ssml = build_ssml(&VoiceOptions::default(), r#"a < b & "c""#);
        assert!(ssml.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(!ssml.contains(r#">a < b"#));
    }

    #[test]
    fn escape_xml_covers_all_reserved_characters() {
        assert_eq!(escape_xml("<&>'\""), "&lt;&amp;&gt;&apos;&quot;");
        assert_eq!(escape_xml("plain"), "plain");
    }
}
