use super::frame::{pcm16_from_f32, CaptureFrame};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

/// Writes the microphone audio of a session to a WAV file for later review.
///
/// The archive stores the same 16-bit samples that went over the wire,
/// wraparound included.
pub struct SessionArchive {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    sample_count: usize,
}

impl SessionArchive {
    pub fn create(path: PathBuf, sample_rate: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create archive directory")?;
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("failed to create archive file: {:?}", path))?;

        info!("archiving session audio to {}", path.display());

        Ok(Self {
            writer: Some(writer),
            path,
            sample_count: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &CaptureFrame) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for sample in pcm16_from_f32(&frame.samples) {
                writer
                    .write_sample(sample)
                    .context("failed to write sample to archive")?;
            }
            self.sample_count += frame.samples.len();
        }
        Ok(())
    }

    /// Finalize the WAV header and return the file path.
    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("failed to finalize archive")?;
        }
        info!(
            "session archive complete: {} ({} samples)",
            self.path.display(),
            self.sample_count
        );
        Ok(self.path.clone())
    }
}

impl Drop for SessionArchive {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("failed to finalize archive on drop: {}", e);
            }
        }
    }
}
