use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub directline_secret: String,
    pub directline_base_url: String,
    pub bot_id: String,
    pub from_user_id: String,
    pub speech_subscription_key: String,
    pub speech_recognition_url: String,
    pub speech_synthesis_url: String,
    pub speech_token_url: String,
    pub speech_locale: String,
    pub sample_audio_path: PathBuf,
    pub log_level: Level,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn with_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = with_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let directline_secret = required("DIRECTLINE_SECRET")?;
        let directline_base_url = with_default(
            "DIRECTLINE_BASE_URL",
            "https://directline.botframework.com/v3/directline",
        );
        let bot_id = required("BOT_ID")?;
        let from_user_id = with_default("FROM_USER_ID", "TestUser");

        let speech_subscription_key = required("SPEECH_SUBSCRIPTION_KEY")?;
        let speech_recognition_url = with_default(
            "SPEECH_RECOGNITION_URL",
            "https://speech.platform.bing.com/speech/recognition/interactive/cognitiveservices/v1?language=en-US",
        );
        let speech_synthesis_url = with_default(
            "SPEECH_SYNTHESIS_URL",
            "https://speech.platform.bing.com/synthesize",
        );
        let speech_token_url = with_default(
            "SPEECH_TOKEN_URL",
            "https://api.cognitive.microsoft.com/sts/v1.0/issueToken",
        );
        let speech_locale = with_default("SPEECH_LOCALE", "en-US");

        let sample_audio_path = std::env::var("SAMPLE_AUDIO_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./assets/musicsample.wav"));

        let log_level_str = with_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            directline_secret,
            directline_base_url,
            bot_id,
            from_user_id,
            speech_subscription_key,
            speech_recognition_url,
            speech_synthesis_url,
            speech_token_url,
            speech_locale,
            sample_audio_path,
            log_level,
        })
    }
}
