use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "You")]
    You,
    #[serde(rename = "AI")]
    Ai,
}

/// One finalized turn in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Collects incremental transcription text for the turn in flight.
///
/// Partial events append to one of two pending buffers, keyed by direction.
/// A turn-complete signal flushes both: each non-empty buffer (after trimming)
/// becomes exactly one history entry, user first, and the buffers are cleared.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    pending_input: String,
    pending_output: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, text: &str) {
        self.pending_input.push_str(text);
    }

    pub fn push_output(&mut self, text: &str) {
        self.pending_output.push_str(text);
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn pending_output(&self) -> &str {
        &self.pending_output
    }

    /// Finalize the turn. Whitespace-only buffers never produce an entry.
    pub fn flush(&mut self) -> Vec<TranscriptEntry> {
        let mut entries = Vec::new();
        let now = Utc::now();

        let input = self.pending_input.trim();
        if !input.is_empty() {
            entries.push(TranscriptEntry {
                speaker: Speaker::You,
                text: input.to_string(),
                timestamp: now,
            });
        }

        let output = self.pending_output.trim();
        if !output.is_empty() {
            entries.push(TranscriptEntry {
                speaker: Speaker::Ai,
                text: output.to_string(),
                timestamp: now,
            });
        }

        self.pending_input.clear();
        self.pending_output.clear();

        entries
    }
}
