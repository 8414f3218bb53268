//! Session and connectivity storage.

pub mod connectivity;
pub mod event_based;
pub mod memory;

use async_trait::async_trait;
use shared_types::{ServiceId, SessionId};

use crate::domain::session::Session;

/// Live sessions of the node.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn add(&self, session: Session);

    fn find(&self, id: &SessionId) -> Option<Session>;

    async fn remove(&self, id: &SessionId) -> Option<Session>;

    /// Remove every session of `service_id`, returning how many were removed.
    async fn remove_for_service(&self, service_id: &ServiceId) -> usize;

    fn get_all(&self) -> Vec<Session>;
}
