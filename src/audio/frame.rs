use anyhow::{bail, Result};

/// A block of microphone samples handed from the capture backend to the session.
///
/// Samples are mono floats in [-1, 1] at the capture rate. Frames are owned by
/// whichever stage is processing them and are moved, never shared, down the
/// pipeline.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl CaptureFrame {
    /// Frame length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Convert float samples to 16-bit signed integers by multiplying by 32768 and
/// truncating. No clamp: out-of-range input wraps two's-complement, so +1.0
/// becomes -32768. The overflow is intentional and pinned by tests.
pub fn pcm16_from_f32(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| (s * 32768.0) as i32 as i16).collect()
}

/// Encode float samples as little-endian 16-bit PCM wire bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in pcm16_from_f32(samples) {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Decoded model audio ready for playout, one sample vector per channel.
#[derive(Debug, Clone)]
pub struct PlaybackBuffer {
    /// Planar channel data (de-interleaved)
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl PlaybackBuffer {
    /// Reinterpret raw little-endian 16-bit PCM bytes as float channels.
    ///
    /// Interleaved input is split per channel when `channel_count` > 1. A
    /// payload that is not 16-bit aligned is rejected rather than truncated.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32, channel_count: u16) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            bail!("PCM payload is not 16-bit aligned ({} bytes)", bytes.len());
        }

        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        let channel_count = channel_count.max(1) as usize;
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for (i, sample) in samples.iter().enumerate() {
            channels[i % channel_count].push(*sample);
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Number of sample frames (per-channel samples).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Playback length in seconds on the output clock.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}
