//! Bearer-token acquisition for the speech endpoints.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::TokenProvider;

/// Issued tokens are valid for ten minutes; refresh a little early.
const TOKEN_TTL: Duration = Duration::from_secs(9 * 60);

/// Exchanges a subscription key for a short-lived bearer token and caches
/// it until shortly before expiry.
pub struct CachedTokenProvider {
    client: reqwest::Client,
    token_url: String,
    subscription_key: String,
    cached: Mutex<Option<(Instant, String)>>,
}

impl CachedTokenProvider {
    pub fn new(client: reqwest::Client, token_url: String, subscription_key: String) -> Self {
        Self {
            client,
            token_url,
            subscription_key,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn get_token(&self) -> anyhow::Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((issued, token)) = cached.as_ref() {
            if issued.elapsed() < TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        debug!("requesting a fresh speech token");
        let response = self
            .client
            .post(&self.token_url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("Content-Length", "0")
            .send()
            .await?
            .error_for_status()?;
        let token = response.text().await?;

        *cached = Some((Instant::now(), token.clone()));
        Ok(token)
    }
}
