use super::state::AppState;
use crate::audio::{
    open_speaker, CaptureConfig, MicrophoneCapture, OutputClock, PlaybackScheduler, PlayoutSink,
};
use crate::live::{LiveClient, LiveConfig, LiveTransport};
use crate::session::{LiveConnector, SessionConfig, SessionStats, SessionStatus, VoiceSession};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct InterruptResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /voice/start
/// Start the live voice session. Exactly one session runs at a time; starting
/// while one is active is rejected rather than tearing the old one down.
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    {
        let current = state.session.read().await;
        if let Some(session) = current.as_ref() {
            if session.is_active().await {
                return (
                    StatusCode::CONFLICT,
                    Json(ErrorResponse {
                        error: "a voice session is already active".to_string(),
                    }),
                )
                    .into_response();
            }
        }
    }

    let cfg = &state.config;

    let api_key = match std::env::var(&cfg.live.api_key_env) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            error!("realtime API key missing ({} not set)", cfg.live.api_key_env);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("realtime API key not configured ({})", cfg.live.api_key_env),
                }),
            )
                .into_response();
        }
    };

    let mut session_config = SessionConfig {
        capture_sample_rate: cfg.audio.capture_sample_rate,
        capture_frame_len: cfg.audio.capture_frame_len,
        playback_sample_rate: cfg.audio.playback_sample_rate,
        playback_channels: cfg.audio.playback_channels,
        ..SessionConfig::default()
    };
    if cfg.audio.archive_recordings {
        session_config.archive_path = Some(
            Path::new(&cfg.storage.data_dir)
                .join("recordings")
                .join(format!("{}.wav", session_config.session_id)),
        );
    }

    let capture = Box::new(MicrophoneCapture::new(CaptureConfig {
        target_sample_rate: session_config.capture_sample_rate,
        frame_len: session_config.capture_frame_len,
    }));

    // The speaker blocks on device setup, so it runs off the async worker
    let playback_rate = session_config.playback_sample_rate;
    let playback_channels = session_config.playback_channels;
    let speaker =
        tokio::task::spawn_blocking(move || open_speaker(playback_rate, playback_channels)).await;

    let (sink, clock) = match speaker {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            error!("failed to open speaker: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to open speaker: {}", e),
                }),
            )
                .into_response();
        }
        Err(e) => {
            error!("speaker setup task failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "speaker setup task failed".to_string(),
                }),
            )
                .into_response();
        }
    };

    let scheduler = PlaybackScheduler::new(
        Box::new(clock) as Box<dyn OutputClock>,
        Box::new(sink) as Box<dyn PlayoutSink>,
        playback_rate,
        playback_channels,
    );

    let live_config = LiveConfig {
        endpoint: cfg.live.endpoint.clone(),
        api_key,
        model: cfg.live.model.clone(),
    };
    let connect: LiveConnector = Box::new(move || {
        Box::pin(async move {
            let (client, events) = LiveClient::connect(live_config).await?;
            Ok((Box::new(client) as Box<dyn LiveTransport>, events))
        })
    });

    match VoiceSession::start(
        session_config,
        capture,
        connect,
        scheduler,
        Arc::clone(&state.store),
    )
    .await
    {
        Ok(session) => {
            let session_id = session.id().to_string();
            let status = session.status().await;
            *state.session.write().await = Some(session);
            info!("voice session started: {}", session_id);
            (
                StatusCode::OK,
                Json(StartSessionResponse { session_id, status }),
            )
                .into_response()
        }
        Err(e) => {
            error!("failed to start voice session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to start voice session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /voice/stop
/// Stop the active session and return its final statistics
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = { state.session.write().await.take() };

    match session {
        Some(session) => {
            let stats = session.stop().await;
            info!("voice session stopped: {}", session.id());
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id: session.id().to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active voice session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /voice/interrupt
/// Barge-in: discard all scheduled playback of the active session
pub async fn interrupt_session(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.session.read().await;

    match current.as_ref() {
        Some(session) => match session.interrupt().await {
            Ok(()) => (
                StatusCode::OK,
                Json(InterruptResponse {
                    status: "interrupted".to_string(),
                }),
            )
                .into_response(),
            Err(e) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response(),
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active voice session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /voice/status
/// Statistics for the active session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.session.read().await;

    match current.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no active voice session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /voice/transcript
/// The persisted conversation history, oldest first
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().await;
    (StatusCode::OK, Json(store.entries().to_vec())).into_response()
}
