//! HTTP API server for external control (assistant front-end)
//!
//! This module provides a REST API for controlling the voice session:
//! - POST /voice/start - Start the live session
//! - POST /voice/stop - Stop it and return final stats
//! - POST /voice/interrupt - Barge-in, discarding queued playback
//! - GET /voice/status - Query session statistics
//! - GET /voice/transcript - Get the persisted conversation history
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
