pub mod client;
pub mod messages;

pub use client::{LiveClient, LiveConfig, LiveEvent, LiveTransport};
pub use messages::{
    MediaChunk, ModelTurn, Part, RealtimeInputMessage, ServerContent, ServerMessage, SetupMessage,
    Transcription, PCM_INPUT_MIME,
};
