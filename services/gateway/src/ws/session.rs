//! Manages the WebSocket connection lifecycle for a voice chat session.
//!
//! One socket equals one session: accept the upgrade, register the
//! connection under the caller's nickname, run the message loop, and tear
//! everything down when the client leaves or the transport dies.

use super::{
    pipeline::VoicePipeline,
    registry::SessionHandle,
    transport::{WsFrameSink, WsFrameStream},
};
use crate::state::AppState;
use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use voicebot_core::wire::{FrameWriter, MessageAssembler, SharedFrameSink};

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(alias = "nickName")]
    pub nickname: String,
}

/// Axum handler to upgrade an HTTP connection to a WebSocket session.
///
/// The nickname is the session identity; a blank one is rejected before
/// the upgrade happens.
pub async fn connect(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let nickname = params.nickname.trim().to_string();
    if nickname.is_empty() {
        return (StatusCode::BAD_REQUEST, "nickname must not be empty").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, nickname))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "ws_session", skip(socket, state), fields(identity = %nickname))]
async fn handle_socket(socket: WebSocket, state: AppState, nickname: String) {
    info!("New WebSocket connection");

    let (socket_tx, socket_rx) = socket.split();
    let sink: SharedFrameSink = Arc::new(Mutex::new(WsFrameSink::new(socket_tx)));

    let handle = SessionHandle::new(nickname.clone(), sink.clone());
    let session_id = handle.id();
    state.registry.open(handle).await;

    if let Err(e) = run_session(&state, sink.clone(), WsFrameStream::new(socket_rx)).await {
        error!(error = ?e, "Session terminated with error");
    }

    // Teardown order matters: silence the transport first, then vacate the
    // identity slot iff it is still ours.
    if let Err(e) = sink.lock().await.close("session ended").await {
        warn!(error = %e, "close handshake failed during teardown");
    }
    state.registry.close(&nickname, session_id).await;
    info!("Session closed");
}

/// Drives one session from conversation start to transport end.
async fn run_session(
    state: &AppState,
    sink: SharedFrameSink,
    stream: WsFrameStream,
) -> anyhow::Result<()> {
    let conversation_id = state
        .backend
        .start_conversation()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start conversation: {e}"))?;
    info!(%conversation_id, "Conversation started");

    // The nickname is only the registry key; activities posted to the
    // backend carry the configured service user id.
    let mut pipeline = VoicePipeline::new(
        state.backend.clone(),
        state.recognizer.clone(),
        state.synthesizer.clone(),
        state.sample_audio.clone(),
        state.voice.clone(),
        state.config.from_user_id.clone(),
        conversation_id,
        FrameWriter::new(sink),
    );

    let mut assembler = MessageAssembler::new(stream);
    let outcome = loop {
        match assembler.next_message().await {
            Ok(Some(message)) => match pipeline.handle_message(message).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => break Err(anyhow::Error::from(e)),
                Err(e) => {
                    // Drop the turn, keep the session.
                    warn!(error = %e, "turn failed; session continues");
                }
            },
            Ok(None) => {
                info!("Client closed the connection");
                break Ok(());
            }
            Err(e) => {
                warn!(error = %e, "transport failed; ending session");
                break Ok(());
            }
        }
    };

    pipeline.close();
    outcome
}
