use std::path::PathBuf;

/// Configuration for one live voice session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Capture rate in Hz (the wire rate for outbound audio)
    pub capture_sample_rate: u32,

    /// Samples per capture frame (1600 = 100ms at 16 kHz)
    pub capture_frame_len: usize,

    /// Model audio rate in Hz
    pub playback_sample_rate: u32,

    /// Model audio channel count
    pub playback_channels: u16,

    /// Where to archive the session's microphone audio, if anywhere
    pub archive_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            capture_sample_rate: 16000,
            capture_frame_len: 1600,
            playback_sample_rate: 24000,
            playback_channels: 1,
            archive_path: None,
        }
    }
}
