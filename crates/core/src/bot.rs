//! Conversational backend collaborator.
//!
//! A DirectLine-style HTTP API: start a conversation, post user activities,
//! and poll the activity feed until the bot answers. The watermark cursor
//! keeps each poll incremental so old turns are never replayed.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Backend unreachable or talking nonsense. Surfaced to the caller; the
/// session stays open.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend returned a malformed payload: {0}")]
    MalformedResponse(String),
}

/// The bot's answer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    /// Cursor to resume polling from; becomes the session's new watermark.
    pub watermark: Option<String>,
    pub reply_to_id: Option<String>,
}

/// Narrow seam to the conversational backend.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Opens a conversation and returns its correlation id.
    async fn start_conversation(&self) -> Result<String, BackendError>;

    /// Posts one user utterance into the conversation.
    async fn post_message(
        &self,
        conversation_id: &str,
        from_id: &str,
        text: &str,
    ) -> Result<(), BackendError>;

    /// Blocks (suspending only the calling session) until the bot replies,
    /// then returns the newest qualifying reply.
    async fn poll_replies(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> Result<BotReply, BackendError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub from: ChannelAccount,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySet {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub watermark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationStarted {
    conversation_id: String,
}

#[derive(Debug, Serialize)]
struct OutboundActivity<'a> {
    r#type: &'static str,
    from: OutboundAccount<'a>,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundAccount<'a> {
    id: &'a str,
    name: &'a str,
}

/// Picks the bot's reply out of an activity set: activities echoed back
/// from the user are ignored, and when the bot produced several activities
/// in one turn only the newest one counts. Latest wins, never concatenated.
pub fn latest_bot_reply<'a>(set: &'a ActivitySet, bot_id: &str) -> Option<&'a Activity> {
    set.activities.iter().rev().find(|a| a.from.id == bot_id)
}

/// HTTP implementation of [`ConversationBackend`].
pub struct DirectLineBackend {
    client: reqwest::Client,
    base_url: String,
    secret: String,
    bot_id: String,
    poll_interval: Duration,
}

impl DirectLineBackend {
    pub fn new(client: reqwest::Client, base_url: String, secret: String, bot_id: String) -> Self {
        Self {
            client,
            base_url,
            secret,
            bot_id,
            // The feed is eventually consistent; one second between polls.
            poll_interval: Duration::from_secs(1),
        }
    }

    #[cfg(test)]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn fetch_activities(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> Result<ActivitySet, BackendError> {
        let url = format!("{}/conversations/{}/activities", self.base_url, conversation_id);
        let mut request = self.client.get(&url).bearer_auth(&self.secret);
        if let Some(watermark) = watermark {
            request = request.query(&[("watermark", watermark)]);
        }

        let body = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Request(e.to_string()))?
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        serde_json::from_str(&body).map_err(|_| BackendError::MalformedResponse(body))
    }
}

#[async_trait]
impl ConversationBackend for DirectLineBackend {
    #[instrument(skip(self))]
    async fn start_conversation(&self) -> Result<String, BackendError> {
        let url = format!("{}/conversations", self.base_url);
        let body = self
            .client
            .post(&url)
            .bearer_auth(&self.secret)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Request(e.to_string()))?
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let started: ConversationStarted =
            serde_json::from_str(&body).map_err(|_| BackendError::MalformedResponse(body))?;
        Ok(started.conversation_id)
    }

    async fn post_message(
        &self,
        conversation_id: &str,
        from_id: &str,
        text: &str,
    ) -> Result<(), BackendError> {
        let url = format!("{}/conversations/{}/activities", self.base_url, conversation_id);
        let activity = OutboundActivity {
            r#type: "message",
            from: OutboundAccount {
                id: from_id,
                name: from_id,
            },
            text,
        };
        self.client
            .post(&url)
            .bearer_auth(&self.secret)
            .json(&activity)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(())
    }

    /// Polls on a fixed interval until the bot answers. There is
    /// deliberately no upper bound here; the caller's teardown cancels the
    /// loop by dropping the future.
    async fn poll_replies(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> Result<BotReply, BackendError> {
        loop {
            let set = self.fetch_activities(conversation_id, watermark).await?;
            if let Some(reply) = latest_bot_reply(&set, &self.bot_id) {
                return Ok(BotReply {
                    text: reply.text.clone().unwrap_or_default(),
                    watermark: set.watermark.clone(),
                    reply_to_id: reply.reply_to_id.clone(),
                });
            }
            debug!(conversation_id, "no bot activity yet, polling again");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
