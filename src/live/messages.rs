use serde::{Deserialize, Serialize};

/// MIME tag carried by every outbound audio chunk
pub const PCM_INPUT_MIME: &str = "audio/pcm;rate=16000";

/// First message on a fresh connection: selects the model, requests audio
/// responses, and enables transcription in both directions.
#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

/// Serializes as an empty object; presence alone enables transcription
#[derive(Debug, Serialize, Default)]
pub struct TranscriptionConfig {}

impl SetupMessage {
    pub fn for_model(model: &str) -> Self {
        Self {
            setup: Setup {
                model: model.to_string(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                },
                input_audio_transcription: TranscriptionConfig::default(),
                output_audio_transcription: TranscriptionConfig::default(),
            },
        }
    }
}

/// Outbound microphone audio message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

impl RealtimeInputMessage {
    pub fn audio(data: String) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    data,
                    mime_type: PCM_INPUT_MIME.to_string(),
                }],
            },
        }
    }
}

/// Base64 payload plus its MIME tag, both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub data: String,
    pub mime_type: String,
}

/// Everything the server can put in one frame. Unknown fields are ignored so
/// protocol additions don't break the session.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: bool,
    pub interrupted: bool,
}

impl ServerContent {
    /// Base64 audio payloads of this message, in order.
    pub fn audio_payloads(&self) -> Vec<&str> {
        self.model_turn
            .iter()
            .flat_map(|turn| turn.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .filter(|chunk| chunk.mime_type.starts_with("audio/pcm"))
            .map(|chunk| chunk.data.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelTurn {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    pub inline_data: Option<MediaChunk>,
}

/// Incremental transcription text for the turn in flight
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transcription {
    pub text: String,
}
