use super::config::SessionConfig;
use super::stats::{SessionStats, SessionStatus, StatusChange};
use super::store::TranscriptStore;
use super::transcript::TranscriptAccumulator;
use crate::audio::archive::SessionArchive;
use crate::audio::capture::CaptureBackend;
use crate::audio::frame::{encode_pcm16, CaptureFrame};
use crate::audio::playback::{OutputClock, PlaybackScheduler, PlayoutSink};
use crate::live::client::{LiveEvent, LiveTransport};
use crate::live::messages::ServerContent;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Scheduler type the session drives; device halves or test doubles sit
/// behind the boxes.
pub type SessionScheduler = PlaybackScheduler<Box<dyn OutputClock>, Box<dyn PlayoutSink>>;

/// Deferred transport connect, run only after the microphone was acquired.
pub type LiveConnector = Box<
    dyn FnOnce() -> BoxFuture<'static, Result<(Box<dyn LiveTransport>, mpsc::Receiver<LiveEvent>)>>
        + Send,
>;

enum Command {
    Stop,
    Interrupt,
}

/// A live voice session against the realtime API.
///
/// Owns every resource handle (capture backend, transport, playback scheduler,
/// archive) inside a single event-loop task; `stop` and `interrupt` are the
/// only entry points that mutate it from outside. One session object is one
/// run: a second session requires constructing a new one.
pub struct VoiceSession {
    session_id: String,
    stats: Arc<Mutex<StatsShared>>,
    commands: mpsc::Sender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    /// Wire up a session and run it.
    ///
    /// The microphone is acquired first; a denied device fails the start
    /// before any network work. The returned session is already connecting,
    /// and moves to listening once the server acknowledges setup.
    pub async fn start(
        config: SessionConfig,
        mut capture: Box<dyn CaptureBackend>,
        connect: LiveConnector,
        scheduler: SessionScheduler,
        store: Arc<Mutex<TranscriptStore>>,
    ) -> Result<Arc<Self>> {
        info!("starting voice session: {}", config.session_id);

        let stats = Arc::new(Mutex::new(StatsShared::new()));
        stats.lock().await.set_status(SessionStatus::Connecting);

        let frames = match capture.start().await {
            Ok(frames) => frames,
            Err(e) => {
                stats.lock().await.set_status(SessionStatus::Error);
                if let Err(stop_err) = capture.stop().await {
                    warn!("failed to release microphone: {}", stop_err);
                }
                return Err(e).context("microphone access denied");
            }
        };

        let (transport, events) = match connect().await {
            Ok(pair) => pair,
            Err(e) => {
                stats.lock().await.set_status(SessionStatus::Error);
                if let Err(stop_err) = capture.stop().await {
                    warn!("failed to release microphone: {}", stop_err);
                }
                return Err(e).context("failed to open realtime session");
            }
        };

        // Archiving is best-effort; a bad path never blocks the session
        let archive = match &config.archive_path {
            Some(path) => {
                match SessionArchive::create(path.clone(), config.capture_sample_rate) {
                    Ok(archive) => Some(archive),
                    Err(e) => {
                        warn!("session archiving disabled: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let (command_tx, command_rx) = mpsc::channel(8);

        let task = SessionTask {
            transport: Some(transport),
            capture: Some(capture),
            frames,
            events,
            commands: command_rx,
            scheduler,
            accumulator: TranscriptAccumulator::new(),
            store,
            stats: Arc::clone(&stats),
            archive,
            drain_deadline: None,
            open: false,
            capture_done: false,
        };

        let handle = tokio::spawn(task.run());

        Ok(Arc::new(Self {
            session_id: config.session_id,
            stats,
            commands: command_tx,
            task: Mutex::new(Some(handle)),
        }))
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub async fn status(&self) -> SessionStatus {
        self.stats.lock().await.status
    }

    /// Whether the session still holds resources.
    pub async fn is_active(&self) -> bool {
        !matches!(
            self.status().await,
            SessionStatus::Idle | SessionStatus::Error
        )
    }

    pub async fn stats(&self) -> SessionStats {
        self.stats.lock().await.snapshot()
    }

    /// Stop the session and wait for teardown to finish. Safe to call
    /// repeatedly; a session that already tore down keeps its final status.
    pub async fn stop(&self) -> SessionStats {
        if self.commands.send(Command::Stop).await.is_err() {
            // Event loop already gone; teardown has run
        }

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                error!("session task panicked: {}", e);
            }
        }

        self.stats.lock().await.snapshot()
    }

    /// User-initiated barge-in: discard all scheduled playback immediately.
    pub async fn interrupt(&self) -> Result<()> {
        self.commands
            .send(Command::Interrupt)
            .await
            .map_err(|_| anyhow!("session is not active"))
    }
}

/// Everything the event loop owns. All shared mutable state (active playback
/// set, next-start cursor, pending transcripts) is mutated only from `run`,
/// one event at a time.
struct SessionTask {
    transport: Option<Box<dyn LiveTransport>>,
    capture: Option<Box<dyn CaptureBackend>>,
    frames: mpsc::Receiver<CaptureFrame>,
    events: mpsc::Receiver<LiveEvent>,
    commands: mpsc::Receiver<Command>,
    scheduler: SessionScheduler,
    accumulator: TranscriptAccumulator,
    store: Arc<Mutex<TranscriptStore>>,
    stats: Arc<Mutex<StatsShared>>,
    archive: Option<SessionArchive>,
    /// When the scheduled playback timeline drains, estimated from buffer
    /// durations
    drain_deadline: Option<tokio::time::Instant>,
    open: bool,
    capture_done: bool,
}

impl SessionTask {
    async fn run(mut self) {
        info!("session event loop started");

        loop {
            let deadline = self.drain_deadline;

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Stop) | None => {
                        self.teardown(SessionStatus::Idle).await;
                        break;
                    }
                    Some(Command::Interrupt) => self.barge_in().await,
                },

                frame = self.frames.recv(), if !self.capture_done => match frame {
                    Some(frame) => self.forward_frame(frame).await,
                    None => self.capture_done = true,
                },

                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.handle_event(event).await {
                            break;
                        }
                    }
                    None => {
                        self.teardown(SessionStatus::Idle).await;
                        break;
                    }
                },

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                    if deadline.is_some() =>
                {
                    self.playback_drained().await;
                }
            }
        }

        info!("session event loop stopped");
    }

    /// Returns true when the session ended and the loop should exit.
    async fn handle_event(&mut self, event: LiveEvent) -> bool {
        match event {
            LiveEvent::Open => {
                info!("realtime session open");
                self.open = true;
                self.set_status(SessionStatus::Listening).await;
                false
            }
            LiveEvent::Content(content) => {
                self.handle_content(content).await;
                false
            }
            LiveEvent::Error(e) => {
                error!("realtime transport error: {}", e);
                self.teardown(SessionStatus::Error).await;
                true
            }
            LiveEvent::Closed => {
                info!("realtime connection closed");
                self.teardown(SessionStatus::Idle).await;
                true
            }
        }
    }

    async fn handle_content(&mut self, content: ServerContent) {
        if content.interrupted {
            // Remote barge-in: the model was cut off, drop its queued audio
            self.barge_in().await;
        }

        if let Some(transcription) = &content.input_transcription {
            self.accumulator.push_input(&transcription.text);
        }
        if let Some(transcription) = &content.output_transcription {
            self.accumulator.push_output(&transcription.text);
        }

        for payload in content.audio_payloads() {
            match self.scheduler.schedule_chunk(payload) {
                Ok(remaining) => {
                    self.drain_deadline =
                        Some(tokio::time::Instant::now() + Duration::from_secs_f64(remaining));

                    let mut stats = self.stats.lock().await;
                    stats.chunks_played += 1;
                    if matches!(
                        stats.status,
                        SessionStatus::Listening | SessionStatus::Thinking
                    ) {
                        stats.set_status(SessionStatus::Speaking);
                    }
                }
                Err(e) => warn!("skipping malformed audio chunk: {}", e),
            }
        }

        if content.turn_complete {
            self.flush_transcripts().await;

            let mut stats = self.stats.lock().await;
            stats.turns += 1;
            if stats.status == SessionStatus::Listening {
                stats.set_status(SessionStatus::Thinking);
            }
        }
    }

    async fn forward_frame(&mut self, frame: CaptureFrame) {
        if !self.open {
            // Fire-and-forget contract: nothing queues behind the handshake
            self.stats.lock().await.frames_dropped += 1;
            return;
        }

        if let Some(archive) = &mut self.archive {
            if let Err(e) = archive.write_frame(&frame) {
                warn!("archive write failed: {}", e);
            }
        }

        let pcm = encode_pcm16(&frame.samples);
        let Some(transport) = &self.transport else {
            self.stats.lock().await.frames_dropped += 1;
            return;
        };

        match transport.send_audio(&pcm).await {
            Ok(()) => self.stats.lock().await.frames_sent += 1,
            Err(e) => {
                warn!("dropped audio frame: {}", e);
                self.stats.lock().await.frames_dropped += 1;
            }
        }
    }

    async fn barge_in(&mut self) {
        self.scheduler.stop_all();
        self.drain_deadline = None;

        let mut stats = self.stats.lock().await;
        stats.interruptions += 1;
        if stats.status == SessionStatus::Speaking {
            stats.set_status(SessionStatus::Listening);
        }
    }

    async fn playback_drained(&mut self) {
        self.drain_deadline = None;
        self.scheduler.reap_finished();

        let mut stats = self.stats.lock().await;
        if stats.status == SessionStatus::Speaking {
            stats.set_status(SessionStatus::Listening);
        }
    }

    async fn flush_transcripts(&mut self) {
        let entries = self.accumulator.flush();
        if entries.is_empty() {
            return;
        }

        let mut store = self.store.lock().await;
        if let Err(e) = store.append(&entries) {
            warn!("failed to persist transcript: {}", e);
        }
    }

    async fn set_status(&mut self, status: SessionStatus) {
        self.stats.lock().await.set_status(status);
    }

    /// Release everything the session owns. Every step is independently
    /// guarded and running it again is safe.
    async fn teardown(&mut self, final_status: SessionStatus) {
        self.drain_deadline = None;

        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.stop().await {
                warn!("failed to release microphone: {}", e);
            }
        }

        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("failed to close realtime connection: {}", e);
            }
        }

        // Stops all scheduled playback and rewinds the cursor to zero
        self.scheduler.stop_all();

        if let Some(archive) = self.archive.take() {
            match archive.finish() {
                Ok(path) => info!("session audio archived to {}", path.display()),
                Err(e) => warn!("failed to finalize archive: {}", e),
            }
        }

        self.set_status(final_status).await;
    }
}

struct StatsShared {
    status: SessionStatus,
    started_at: DateTime<Utc>,
    transitions: Vec<StatusChange>,
    frames_sent: usize,
    frames_dropped: usize,
    chunks_played: usize,
    interruptions: usize,
    turns: usize,
}

impl StatsShared {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            status: SessionStatus::Idle,
            started_at: now,
            transitions: vec![StatusChange {
                status: SessionStatus::Idle,
                at: now,
            }],
            frames_sent: 0,
            frames_dropped: 0,
            chunks_played: 0,
            interruptions: 0,
            turns: 0,
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.transitions.push(StatusChange {
            status,
            at: Utc::now(),
        });
    }

    fn snapshot(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStats {
            status: self.status,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent,
            frames_dropped: self.frames_dropped,
            chunks_played: self.chunks_played,
            interruptions: self.interruptions,
            turns: self.turns,
            transitions: self.transitions.clone(),
        }
    }
}
