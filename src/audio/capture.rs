use super::frame::CaptureFrame;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Microphone capture backend.
///
/// `start` acquires the input device and begins delivering fixed-size frames
/// over the returned channel; `stop` releases the device. Implementations must
/// tolerate `stop` being called twice or before `start`.
#[async_trait]
pub trait CaptureBackend: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>>;

    async fn stop(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Configuration for microphone capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rate frames are delivered at (the wire rate, 16 kHz)
    pub target_sample_rate: u32,
    /// Samples per delivered frame (1600 = 100ms at 16 kHz)
    pub frame_len: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            frame_len: 1600,
        }
    }
}

/// cpal microphone backend.
///
/// The cpal stream is not `Send`, so a dedicated thread owns it: the input
/// callback pushes raw device samples into a ring buffer, and the thread
/// downmixes, decimates to the target rate, and sends fixed-size frames into
/// the session's channel. Dropping the stream on thread exit releases the
/// device.
pub struct MicrophoneCapture {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl CaptureBackend for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        std::thread::spawn(move || capture_thread(config, running, frame_tx, ready_tx));

        // The thread reports whether the device opened; a denied or missing
        // microphone surfaces here, before any network work.
        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| anyhow!("capture thread setup failed: {}", e))?
            .map_err(|_| anyhow!("capture thread exited before reporting status"))?;

        ready.map_err(|e| anyhow!("microphone unavailable: {}", e))?;

        info!(
            "microphone capture started ({} Hz, {} samples/frame)",
            self.config.target_sample_rate, self.config.frame_len
        );

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("microphone capture stopping");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn capture_thread(
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<CaptureFrame>,
    ready_tx: std::sync::mpsc::Sender<Result<(), String>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err("no input device available".to_string()));
            return;
        }
    };

    let supported = match device.default_input_config() {
        Ok(supported) => supported,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to query input config: {}", e)));
            return;
        }
    };

    if supported.sample_format() != cpal::SampleFormat::F32 {
        let _ = ready_tx.send(Err(format!(
            "unsupported input sample format: {:?}",
            supported.sample_format()
        )));
        return;
    }

    let device_rate = supported.sample_rate().0;
    let device_channels = supported.channels().max(1);
    let stream_config: cpal::StreamConfig = supported.into();

    // One second of headroom between the audio callback and this thread
    let ring = HeapRb::<f32>::new(device_rate as usize * device_channels as usize);
    let (producer, mut consumer) = ring.split();
    let producer = Arc::new(std::sync::Mutex::new(producer));

    let stream = match device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Ok(mut producer) = producer.lock() {
                // Push as much as fits; overflow is silently dropped
                producer.push_slice(data);
            }
        },
        |err| warn!("capture stream error: {}", err),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open input stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start input stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Decimation keeps every Nth mono sample, the same integer-ratio resample
    // the transcription path uses elsewhere.
    let step = (device_rate / config.target_sample_rate).max(1) as usize;
    let mut skip = 0usize;
    let mut pending: Vec<f32> = Vec::new();
    let mut frame: Vec<f32> = Vec::with_capacity(config.frame_len);
    let mut chunk = vec![0f32; 2048];

    while running.load(Ordering::SeqCst) {
        let popped = consumer.pop_slice(&mut chunk);
        if popped == 0 {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }
        pending.extend_from_slice(&chunk[..popped]);

        let usable = (pending.len() / device_channels as usize) * device_channels as usize;
        for sample_frame in pending[..usable].chunks_exact(device_channels as usize) {
            let mono = sample_frame.iter().sum::<f32>() / device_channels as f32;
            if skip == 0 {
                frame.push(mono);
                if frame.len() == config.frame_len {
                    let full = std::mem::replace(&mut frame, Vec::with_capacity(config.frame_len));
                    let out = CaptureFrame {
                        samples: full,
                        sample_rate: config.target_sample_rate,
                    };
                    if frame_tx.blocking_send(out).is_err() {
                        // Session is gone; stop capturing
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
            skip = (skip + 1) % step;
        }
        pending.drain(..usable);
    }

    drop(stream);
    debug!("capture thread exited, microphone released");
}
