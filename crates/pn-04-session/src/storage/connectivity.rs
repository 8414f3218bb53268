//! Connectivity reports of consumer sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pn_03_dialog::ConnectivityStatus;
use shared_types::{Identity, SessionId};
use tracing::debug;

/// Latest connectivity report of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityEntry {
    pub session_id: SessionId,
    pub consumer_id: Identity,
    pub status: ConnectivityStatus,
    pub reported_at: DateTime<Utc>,
}

/// Receives connectivity reports from dialogs.
pub trait StatusSubscriber: Send + Sync {
    fn subscribe(&self, entry: ConnectivityEntry);
}

/// Keeps the latest report per session.
#[derive(Debug, Default)]
pub struct ConnectivityStorage {
    entries: RwLock<HashMap<SessionId, ConnectivityEntry>>,
}

impl ConnectivityStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<ConnectivityEntry> {
        self.entries.read().get(session_id).cloned()
    }

    #[must_use]
    pub fn get_all_entries(&self) -> Vec<ConnectivityEntry> {
        self.entries.read().values().cloned().collect()
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<ConnectivityEntry> {
        self.entries.write().remove(session_id)
    }
}

impl StatusSubscriber for ConnectivityStorage {
    fn subscribe(&self, entry: ConnectivityEntry) {
        debug!(
            session_id = %entry.session_id,
            code = entry.status.code,
            "[pn-04] Connectivity status reported"
        );
        self.entries.write().insert(entry.session_id, entry);
    }
}
