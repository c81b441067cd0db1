pub mod archive;
pub mod capture;
pub mod frame;
pub mod output;
pub mod playback;

pub use archive::SessionArchive;
pub use capture::{CaptureBackend, CaptureConfig, MicrophoneCapture};
pub use frame::{encode_pcm16, pcm16_from_f32, CaptureFrame, PlaybackBuffer};
pub use output::{open_speaker, SpeakerClock, SpeakerSink};
pub use playback::{OutputClock, PlaybackScheduler, PlayoutSink};
