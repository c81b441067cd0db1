//! Live voice session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Microphone capture and wire encoding
//! - The realtime API connection lifecycle
//! - Clock-scheduled playback of model audio with barge-in
//! - Per-turn transcript accumulation and persistence
//! - Session statistics and state transitions

mod config;
mod session;
mod stats;
mod store;
mod transcript;

pub use config::SessionConfig;
pub use session::{LiveConnector, SessionScheduler, VoiceSession};
pub use stats::{SessionStats, SessionStatus, StatusChange};
pub use store::{TranscriptStore, STORAGE_KEY};
pub use transcript::{Speaker, TranscriptAccumulator, TranscriptEntry};
