use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ServiceId, SessionId};

use super::SessionStorage;
use crate::domain::session::Session;

/// Session storage backed by a map.
#[derive(Debug, Default)]
pub struct StorageMemory {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl StorageMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, session: Session) {
        self.sessions.write().insert(session.id, session);
    }

    pub(crate) fn take(&self, id: &SessionId) -> Option<Session> {
        self.sessions.write().remove(id)
    }

    pub(crate) fn take_for_service(&self, service_id: &ServiceId) -> Vec<Session> {
        let mut sessions = self.sessions.write();
        let ids: Vec<SessionId> = sessions
            .values()
            .filter(|s| &s.service_id == service_id)
            .map(|s| s.id)
            .collect();
        ids.iter().filter_map(|id| sessions.remove(id)).collect()
    }

    /// Record traffic counters reported for a session.
    ///
    /// Returns `false` if the session is unknown.
    pub fn update_stats(&self, id: &SessionId, bytes_received: u64, bytes_sent: u64) -> bool {
        match self.sessions.write().get_mut(id) {
            Some(session) => {
                session.bytes_received = bytes_received;
                session.bytes_sent = bytes_sent;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStorage for StorageMemory {
    async fn add(&self, session: Session) {
        self.insert(session);
    }

    fn find(&self, id: &SessionId) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    async fn remove(&self, id: &SessionId) -> Option<Session> {
        self.take(id)
    }

    async fn remove_for_service(&self, service_id: &ServiceId) -> usize {
        self.take_for_service(service_id).len()
    }

    fn get_all(&self) -> Vec<Session> {
        self.sessions.read().values().cloned().collect()
    }
}
