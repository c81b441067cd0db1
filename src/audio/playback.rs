use super::frame::PlaybackBuffer;
use anyhow::{Context, Result};
use base64::Engine;
use std::collections::HashMap;
use tracing::debug;

/// Clock the scheduler aligns buffer starts against.
///
/// The device implementation reports rendered frames; tests drive time by hand.
pub trait OutputClock: Send {
    /// Seconds elapsed on the playback timeline.
    fn now(&self) -> f64;
}

impl OutputClock for Box<dyn OutputClock> {
    fn now(&self) -> f64 {
        self.as_ref().now()
    }
}

/// Receives scheduled buffers from the scheduler.
///
/// `start` is an absolute time on the scheduler's clock. `stop` must tolerate
/// ids that already finished playing.
pub trait PlayoutSink: Send {
    fn start(&mut self, id: u64, start: f64, buffer: &PlaybackBuffer) -> Result<()>;
    fn stop(&mut self, id: u64);
}

impl PlayoutSink for Box<dyn PlayoutSink> {
    fn start(&mut self, id: u64, start: f64, buffer: &PlaybackBuffer) -> Result<()> {
        self.as_mut().start(id, start, buffer)
    }

    fn stop(&mut self, id: u64) {
        self.as_mut().stop(id)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScheduledBuffer {
    start: f64,
    end: f64,
}

/// Schedules decoded model audio back-to-back on the output clock.
///
/// Each chunk starts at `max(next-start cursor, clock now)`, so buffers never
/// overlap and a drained timeline resumes at the true clock position. Handles
/// stay in the active set until their end passes or a barge-in stops them all.
pub struct PlaybackScheduler<C, S> {
    clock: C,
    sink: S,
    sample_rate: u32,
    channel_count: u16,
    next_start: f64,
    next_id: u64,
    active: HashMap<u64, ScheduledBuffer>,
}

impl<C: OutputClock, S: PlayoutSink> PlaybackScheduler<C, S> {
    pub fn new(clock: C, sink: S, sample_rate: u32, channel_count: u16) -> Self {
        Self {
            clock,
            sink,
            sample_rate,
            channel_count,
            next_start: 0.0,
            next_id: 0,
            active: HashMap::new(),
        }
    }

    /// Decode one base64 PCM chunk and append it to the playback timeline.
    ///
    /// Returns the seconds until the timeline drains, measured from the clock's
    /// current position.
    pub fn schedule_chunk(&mut self, payload: &str) -> Result<f64> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .context("invalid base64 audio payload")?;
        let buffer = PlaybackBuffer::from_pcm16(&bytes, self.sample_rate, self.channel_count)?;

        let now = self.clock.now();
        let start = if self.next_start > now {
            self.next_start
        } else {
            now
        };
        let end = start + buffer.duration_secs();

        let id = self.next_id;
        self.next_id += 1;

        self.sink.start(id, start, &buffer)?;
        self.active.insert(id, ScheduledBuffer { start, end });
        self.next_start = end;

        debug!(
            "scheduled buffer {} at {:.3}s ({} frames)",
            id,
            start,
            buffer.frame_count()
        );

        Ok(end - now)
    }

    /// Drop handles whose playback end has passed on the clock.
    pub fn reap_finished(&mut self) {
        let now = self.clock.now();
        self.active.retain(|_, buffer| buffer.end > now);
    }

    /// Barge-in: stop every scheduled buffer, forget them, rewind the cursor.
    ///
    /// Queued-but-unplayed audio is discarded so the next turn starts
    /// immediately.
    pub fn stop_all(&mut self) {
        for (id, _) in self.active.drain() {
            self.sink.stop(id);
        }
        self.next_start = 0.0;
    }

    /// Number of buffers currently scheduled or playing.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Timestamp at which the next buffer may begin.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    /// Seconds of audio still scheduled past the clock's current position.
    pub fn remaining_secs(&self) -> f64 {
        (self.next_start - self.clock.now()).max(0.0)
    }
}
