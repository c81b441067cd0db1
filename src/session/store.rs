use super::transcript::TranscriptEntry;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name the transcript history is stored under in the data directory
pub const STORAGE_KEY: &str = "voice-transcript.json";

/// Ordered transcript history persisted as one JSON document.
///
/// Loaded once when the service starts and rewritten whenever entries are
/// appended, so the file always mirrors the in-memory list.
pub struct TranscriptStore {
    path: PathBuf,
    entries: Vec<TranscriptEntry>,
}

impl TranscriptStore {
    /// Open the store in `data_dir`, loading any existing history.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory: {:?}", data_dir))?;

        let path = data_dir.join(STORAGE_KEY);
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read transcript history: {:?}", path))?;
            serde_json::from_str(&raw).context("transcript history is corrupt")?
        } else {
            Vec::new()
        };

        info!(
            "transcript store opened: {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self { path, entries })
    }

    /// Append entries and rewrite the history file. No-op for an empty batch.
    pub fn append(&mut self, entries: &[TranscriptEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        self.entries.extend_from_slice(entries);

        let json = serde_json::to_string_pretty(&self.entries)
            .context("failed to serialize transcript history")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write transcript history: {:?}", self.path))?;

        Ok(())
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
