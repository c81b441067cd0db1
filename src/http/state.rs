use crate::config::Config;
use crate::session::{TranscriptStore, VoiceSession};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single live session, if one is active
    pub session: Arc<RwLock<Option<Arc<VoiceSession>>>>,

    /// Persisted transcript history, shared with the session
    pub store: Arc<Mutex<TranscriptStore>>,

    /// Service configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: TranscriptStore) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }
}
