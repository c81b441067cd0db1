// Tests for the persisted transcript history: fixed storage key, loaded on
// open, rewritten whenever the list grows.

use anyhow::Result;
use chrono::Utc;
use compass_voice::session::{Speaker, TranscriptEntry, TranscriptStore, STORAGE_KEY};
use tempfile::TempDir;

fn entry(speaker: Speaker, text: &str) -> TranscriptEntry {
    TranscriptEntry {
        speaker,
        text: text.to_string(),
        timestamp: Utc::now(),
    }
}

#[test]
fn test_open_empty_store() -> Result<()> {
    let dir = TempDir::new()?;
    let store = TranscriptStore::open(dir.path())?;

    assert!(store.is_empty());
    Ok(())
}

#[test]
fn test_append_persists_under_storage_key() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = TranscriptStore::open(dir.path())?;
    store.append(&[
        entry(Speaker::You, "what fits my background?"),
        entry(Speaker::Ai, "tell me about your projects"),
    ])?;

    let file = dir.path().join(STORAGE_KEY);
    assert!(file.exists(), "history file should exist after append");

    // A fresh store sees the same history
    let reopened = TranscriptStore::open(dir.path())?;
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.entries()[0].speaker, Speaker::You);
    assert_eq!(reopened.entries()[0].text, "what fits my background?");
    assert_eq!(reopened.entries()[1].speaker, Speaker::Ai);

    Ok(())
}

#[test]
fn test_append_accumulates_across_turns() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = TranscriptStore::open(dir.path())?;
    store.append(&[entry(Speaker::You, "first turn")])?;
    store.append(&[entry(Speaker::Ai, "second turn")])?;

    let reopened = TranscriptStore::open(dir.path())?;
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.entries()[1].text, "second turn");

    Ok(())
}

#[test]
fn test_empty_append_is_a_noop() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = TranscriptStore::open(dir.path())?;
    store.append(&[])?;

    assert!(store.is_empty());
    assert!(
        !dir.path().join(STORAGE_KEY).exists(),
        "empty batches never touch the file"
    );

    Ok(())
}

#[test]
fn test_corrupt_history_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join(STORAGE_KEY), "not json at all")?;

    assert!(TranscriptStore::open(dir.path()).is_err());
    Ok(())
}

#[test]
fn test_speaker_names_on_disk() -> Result<()> {
    let dir = TempDir::new()?;

    let mut store = TranscriptStore::open(dir.path())?;
    store.append(&[entry(Speaker::You, "hi"), entry(Speaker::Ai, "hello")])?;

    let raw = std::fs::read_to_string(dir.path().join(STORAGE_KEY))?;
    assert!(raw.contains("\"You\""));
    assert!(raw.contains("\"AI\""));

    Ok(())
}
