//! Main Entrypoint for the Voicebot Gateway Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the speech and conversation backend clients.
//! 3. Loading the canned sample audio asset.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use voicebot_core::{
    bot::DirectLineBackend,
    speech::{CachedTokenProvider, HttpSpeechRecognizer, HttpSpeechSynthesizer, VoiceOptions},
};
use voicebot_gateway::{
    config::Config,
    router::create_router,
    sample::load_sample_audio,
    state::AppState,
    ws::SessionRegistry,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Clients ---
    // One HTTP client for every remote collaborator; reqwest pools
    // connections per host internally.
    let http = reqwest::Client::new();

    let tokens = Arc::new(CachedTokenProvider::new(
        http.clone(),
        config.speech_token_url.clone(),
        config.speech_subscription_key.clone(),
    ));
    let recognizer = Arc::new(HttpSpeechRecognizer::new(
        http.clone(),
        config.speech_recognition_url.clone(),
        tokens.clone(),
    ));
    let synthesizer = Arc::new(HttpSpeechSynthesizer::new(
        http.clone(),
        config.speech_synthesis_url.clone(),
        tokens,
    ));
    let backend = Arc::new(DirectLineBackend::new(
        http,
        config.directline_base_url.clone(),
        config.directline_secret.clone(),
        config.bot_id.clone(),
    ));

    let sample_audio = load_sample_audio(&config.sample_audio_path)?;
    info!(
        path = %config.sample_audio_path.display(),
        bytes = sample_audio.len(),
        "Sample audio loaded"
    );

    let voice = VoiceOptions {
        locale: config.speech_locale.clone(),
        ..VoiceOptions::default()
    };

    let state = AppState {
        registry: SessionRegistry::new(),
        backend,
        recognizer,
        synthesizer,
        sample_audio,
        voice,
        config: Arc::new(config.clone()),
    };

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(cors);

    // --- 5. Start Server ---
    info!(
        bot_id = %config.bot_id,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
