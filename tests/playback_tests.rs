// Tests for the playback scheduler: gapless back-to-back scheduling against
// the output clock, natural end reaping, and barge-in semantics.

use anyhow::Result;
use base64::Engine;
use compass_voice::audio::{OutputClock, PlaybackBuffer, PlaybackScheduler, PlayoutSink};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct ManualClock(Arc<Mutex<f64>>);

impl ManualClock {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(0.0)))
    }

    fn advance(&self, secs: f64) {
        *self.0.lock().unwrap() += secs;
    }
}

impl OutputClock for ManualClock {
    fn now(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SinkCall {
    Start { id: u64, start: f64, frames: usize },
    Stop { id: u64 },
}

#[derive(Clone)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    fn stops(&self) -> Vec<u64> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Stop { id } => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl PlayoutSink for RecordingSink {
    fn start(&mut self, id: u64, start: f64, buffer: &PlaybackBuffer) -> Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Start {
            id,
            start,
            frames: buffer.frame_count(),
        });
        Ok(())
    }

    fn stop(&mut self, id: u64) {
        self.calls.lock().unwrap().push(SinkCall::Stop { id });
    }
}

/// Base64-encode `frames` 16-bit samples at a fixed test pattern
fn chunk_b64(frames: usize) -> String {
    let mut bytes = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let value = (i % 128) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn make_scheduler() -> (
    PlaybackScheduler<ManualClock, RecordingSink>,
    ManualClock,
    RecordingSink,
) {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let scheduler = PlaybackScheduler::new(clock.clone(), sink.clone(), 24000, 1);
    (scheduler, clock, sink)
}

#[test]
fn test_chunks_schedule_back_to_back() {
    let (mut scheduler, _clock, sink) = make_scheduler();

    // Two one-second chunks at 24 kHz
    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();
    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();

    let calls = sink.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        SinkCall::Start {
            id: 0,
            start: 0.0,
            frames: 24000
        }
    );
    assert_eq!(
        calls[1],
        SinkCall::Start {
            id: 1,
            start: 1.0,
            frames: 24000
        }
    );
    assert_eq!(scheduler.active_count(), 2);
    assert!((scheduler.next_start() - 2.0).abs() < 1e-9);
}

#[test]
fn test_schedule_catches_up_to_clock_after_drain() {
    let (mut scheduler, clock, sink) = make_scheduler();

    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();

    // The timeline drained 1.5 seconds ago; the next chunk starts now, not at
    // the stale cursor
    clock.advance(2.5);
    scheduler.schedule_chunk(&chunk_b64(12000)).unwrap();

    let calls = sink.calls();
    match calls[1] {
        SinkCall::Start { start, .. } => assert!((start - 2.5).abs() < 1e-9),
        _ => panic!("expected a start call"),
    }
    assert!((scheduler.next_start() - 3.0).abs() < 1e-9);
}

#[test]
fn test_starts_are_non_decreasing_and_gapless() {
    let (mut scheduler, clock, sink) = make_scheduler();

    scheduler.schedule_chunk(&chunk_b64(12000)).unwrap();
    clock.advance(0.1);
    scheduler.schedule_chunk(&chunk_b64(6000)).unwrap();
    clock.advance(0.2);
    scheduler.schedule_chunk(&chunk_b64(6000)).unwrap();

    let starts: Vec<(f64, usize)> = sink
        .calls()
        .iter()
        .filter_map(|call| match call {
            SinkCall::Start { start, frames, .. } => Some((*start, *frames)),
            _ => None,
        })
        .collect();

    let epsilon = 1e-9;
    for window in starts.windows(2) {
        let (prev_start, prev_frames) = window[0];
        let (next_start, _) = window[1];
        let prev_end = prev_start + prev_frames as f64 / 24000.0;

        assert!(next_start >= prev_start, "starts must be non-decreasing");
        assert!(
            next_start >= prev_end - epsilon,
            "buffers must not overlap: {} < {}",
            next_start,
            prev_end
        );
    }
}

#[test]
fn test_interrupt_stops_all_and_resets_cursor() {
    let (mut scheduler, _clock, sink) = make_scheduler();

    scheduler.schedule_chunk(&chunk_b64(2400)).unwrap();
    scheduler.schedule_chunk(&chunk_b64(2400)).unwrap();
    scheduler.schedule_chunk(&chunk_b64(2400)).unwrap();
    assert_eq!(scheduler.active_count(), 3);

    scheduler.stop_all();

    let mut stops = sink.stops();
    stops.sort_unstable();
    assert_eq!(stops, vec![0, 1, 2], "every active buffer receives a stop");
    assert_eq!(scheduler.active_count(), 0);
    assert_eq!(scheduler.next_start(), 0.0);
}

#[test]
fn test_stop_all_is_safe_when_nothing_is_scheduled() {
    let (mut scheduler, _clock, sink) = make_scheduler();

    scheduler.stop_all();
    scheduler.stop_all();

    assert!(sink.stops().is_empty());
    assert_eq!(scheduler.next_start(), 0.0);
}

#[test]
fn test_reap_removes_finished_buffers() {
    let (mut scheduler, clock, _sink) = make_scheduler();

    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();
    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();

    clock.advance(1.5);
    scheduler.reap_finished();

    // First buffer ended at 1.0; the second runs until 2.0
    assert_eq!(scheduler.active_count(), 1);

    clock.advance(1.0);
    scheduler.reap_finished();
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn test_remaining_secs_tracks_the_clock() {
    let (mut scheduler, clock, _sink) = make_scheduler();

    scheduler.schedule_chunk(&chunk_b64(24000)).unwrap();
    assert!((scheduler.remaining_secs() - 1.0).abs() < 1e-9);

    clock.advance(0.4);
    assert!((scheduler.remaining_secs() - 0.6).abs() < 1e-9);

    clock.advance(2.0);
    assert_eq!(scheduler.remaining_secs(), 0.0);
}

#[test]
fn test_malformed_chunks_are_rejected() {
    let (mut scheduler, _clock, sink) = make_scheduler();

    assert!(scheduler.schedule_chunk("not base64!!!").is_err());

    // Three bytes cannot be 16-bit samples
    let odd = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
    assert!(scheduler.schedule_chunk(&odd).is_err());

    assert!(sink.calls().is_empty());
    assert_eq!(scheduler.active_count(), 0);
}
