use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a voice session. Exactly one value is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Listening,
    Thinking,
    Speaking,
    Error,
}

/// One recorded lifecycle transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: SessionStatus,
    pub at: DateTime<Utc>,
}

/// Point-in-time statistics for a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub status: SessionStatus,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total session duration in seconds
    pub duration_secs: f64,

    /// Microphone frames sent to the realtime API
    pub frames_sent: usize,

    /// Frames discarded because the connection was not open yet
    pub frames_dropped: usize,

    /// Model audio chunks scheduled for playback
    pub chunks_played: usize,

    /// Barge-ins, remote or user-initiated
    pub interruptions: usize,

    /// Completed turns
    pub turns: usize,

    /// Ordered lifecycle transition log
    pub transitions: Vec<StatusChange>,
}
