// Tests for the session audio archive: WAV output of the frames that went
// over the wire, finalized explicitly or on drop.

use anyhow::Result;
use compass_voice::audio::{CaptureFrame, SessionArchive};
use tempfile::TempDir;

fn frame(samples: Vec<f32>) -> CaptureFrame {
    CaptureFrame {
        samples,
        sample_rate: 16000,
    }
}

#[test]
fn test_archive_writes_wire_samples() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("session.wav");

    let mut archive = SessionArchive::create(path.clone(), 16000)?;
    archive.write_frame(&frame(vec![0.0, 0.5, -0.5]))?;
    archive.write_frame(&frame(vec![1.0]))?;
    let finished = archive.finish()?;

    assert_eq!(finished, path);

    let mut reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let samples: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    // +1.0 wraps exactly as it does on the wire
    assert_eq!(samples, vec![0, 16384, -16384, -32768]);

    Ok(())
}

#[test]
fn test_archive_creates_parent_directories() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("recordings").join("nested").join("a.wav");

    let archive = SessionArchive::create(path.clone(), 16000)?;
    drop(archive);

    // Drop finalizes the header, leaving a readable file
    assert!(hound::WavReader::open(&path).is_ok());

    Ok(())
}
