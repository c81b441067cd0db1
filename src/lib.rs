pub mod audio;
pub mod config;
pub mod http;
pub mod live;
pub mod session;

pub use audio::{
    encode_pcm16, open_speaker, pcm16_from_f32, CaptureBackend, CaptureConfig, CaptureFrame,
    MicrophoneCapture, OutputClock, PlaybackBuffer, PlaybackScheduler, PlayoutSink, SessionArchive,
    SpeakerClock, SpeakerSink,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{LiveClient, LiveConfig, LiveEvent, LiveTransport, ServerContent, ServerMessage};
pub use session::{
    LiveConnector, SessionConfig, SessionScheduler, SessionStats, SessionStatus, Speaker,
    TranscriptAccumulator, TranscriptEntry, TranscriptStore, VoiceSession,
};
