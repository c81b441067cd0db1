use super::frame::PlaybackBuffer;
use super::playback::{OutputClock, PlayoutSink};
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Open the default output device and return the two halves the session needs:
/// a sink the scheduler pushes buffers into and a clock driven by rendered
/// frames.
///
/// Like capture, the cpal stream is owned by a dedicated thread because it is
/// not `Send`. The output callback drains a ring buffer; the clock counts
/// frames the hardware actually consumed, so it keeps advancing through
/// silence.
pub fn open_speaker(sample_rate: u32, channel_count: u16) -> Result<(SpeakerSink, SpeakerClock)> {
    let channel_count = channel_count.max(1);

    // Two seconds of queue between the scheduler and the device
    let ring = HeapRb::<f32>::new(sample_rate as usize * channel_count as usize * 2);
    let (producer, mut consumer) = ring.split();

    let open = Arc::new(AtomicBool::new(true));
    let flush = Arc::new(AtomicBool::new(false));
    let rendered_frames = Arc::new(AtomicU64::new(0));

    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();

    let thread_open = Arc::clone(&open);
    let thread_flush = Arc::clone(&flush);
    let thread_rendered = Arc::clone(&rendered_frames);

    std::thread::spawn(move || {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(device) => device,
            None => {
                let _ = ready_tx.send(Err("no output device available".to_string()));
                return;
            }
        };

        let config = cpal::StreamConfig {
            channels: channel_count,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let callback_flush = Arc::clone(&thread_flush);
        let callback_rendered = Arc::clone(&thread_rendered);
        let stream = match device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if callback_flush.swap(false, Ordering::SeqCst) {
                    // Barge-in: throw away everything queued but unplayed
                    while consumer.try_pop().is_some() {}
                }
                for sample in data.iter_mut() {
                    *sample = consumer.try_pop().unwrap_or(0.0);
                }
                // The clock tracks hardware progress, played or silent
                callback_rendered.fetch_add(
                    (data.len() / channel_count as usize) as u64,
                    Ordering::SeqCst,
                );
            },
            |err| warn!("output stream error: {}", err),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(format!("failed to open output stream: {}", e)));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
            return;
        }

        let _ = ready_tx.send(Ok(()));

        while thread_open.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
        }

        drop(stream);
        debug!("output thread exited, device released");
    });

    ready_rx
        .recv()
        .map_err(|_| anyhow!("output thread exited before reporting status"))?
        .map_err(|e| anyhow!("speaker unavailable: {}", e))?;

    let sink = SpeakerSink {
        producer,
        flush,
        open,
        channel_count,
    };
    let clock = SpeakerClock {
        rendered_frames,
        sample_rate,
    };

    Ok((sink, clock))
}

/// Pushes scheduled buffers into the output ring.
///
/// The ring is inherently back-to-back, which is exactly the gapless contract;
/// the scheduler keeps the timing bookkeeping. `stop` flushes the whole queue,
/// matching barge-in semantics where every active buffer is stopped at once.
pub struct SpeakerSink {
    producer: ringbuf::HeapProd<f32>,
    flush: Arc<AtomicBool>,
    open: Arc<AtomicBool>,
    channel_count: u16,
}

impl SpeakerSink {
    /// Release the output device. Safe to call more than once.
    pub fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl PlayoutSink for SpeakerSink {
    fn start(&mut self, _id: u64, _start: f64, buffer: &PlaybackBuffer) -> Result<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Ok(());
        }

        let frames = buffer.frame_count();
        let channels = self.channel_count as usize;
        let mut interleaved = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for channel in 0..channels {
                let sample = buffer
                    .channels
                    .get(channel % buffer.channels.len().max(1))
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or(0.0);
                interleaved.push(sample);
            }
        }

        let pushed = self.producer.push_slice(&interleaved);
        if pushed < interleaved.len() {
            warn!(
                "output ring full, dropped {} samples",
                interleaved.len() - pushed
            );
        }
        Ok(())
    }

    fn stop(&mut self, _id: u64) {
        self.flush.store(true, Ordering::SeqCst);
    }
}

impl Drop for SpeakerSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Output clock driven by frames the device consumed.
#[derive(Clone)]
pub struct SpeakerClock {
    rendered_frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl OutputClock for SpeakerClock {
    fn now(&self) -> f64 {
        self.rendered_frames.load(Ordering::SeqCst) as f64 / self.sample_rate as f64
    }
}
