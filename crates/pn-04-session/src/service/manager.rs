//! # Session Manager
//!
//! One manager serves one dialog. It remembers which sessions were started
//! through it so that the dialog can clean up after itself and so that no
//! consumer can tear down someone else's session.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{Identity, SessionId};
use tracing::{debug, info, warn};

use super::factory::SessionDependencies;
use crate::domain::errors::SessionError;
use crate::domain::session::{Session, SessionStart};
use crate::ports::{ConfigNegotiator, SessionManager};

pub struct NodeSessionManager {
    consumer: Identity,
    dependencies: Arc<SessionDependencies>,
    owned: Mutex<HashSet<SessionId>>,
}

impl NodeSessionManager {
    #[must_use]
    pub fn new(consumer: Identity, dependencies: Arc<SessionDependencies>) -> Self {
        Self {
            consumer,
            dependencies,
            owned: Mutex::new(HashSet::new()),
        }
    }

    /// Sessions started through this manager that are still live.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.owned.lock().len()
    }

    fn ping_consumer(&self, target: SocketAddr) {
        let pinger = Arc::clone(&self.dependencies.nat_pinger);
        let timeout = self.dependencies.settings.ping_timeout;
        tokio::spawn(async move {
            if tokio::time::timeout(timeout, pinger.ping_target(target))
                .await
                .is_err()
            {
                warn!(target = %target, "[pn-04] NAT ping timed out");
            }
        });
    }
}

#[async_trait]
impl SessionManager for NodeSessionManager {
    fn consumer(&self) -> &Identity {
        &self.consumer
    }

    async fn start(
        &self,
        negotiator: &dyn ConfigNegotiator,
        consumer_config: &Value,
        ping_target: Option<SocketAddr>,
    ) -> Result<SessionStart, SessionError> {
        let limit = self.dependencies.settings.max_sessions_per_dialog;
        let sessions = &self.dependencies.sessions;
        // Sessions purged elsewhere (service stopped) no longer count.
        self.owned.lock().retain(|id| sessions.find(id).is_some());
        if self.owned.lock().len() >= limit {
            return Err(SessionError::TooManySessions(limit));
        }

        let session_id = SessionId::generate();
        let config = negotiator
            .provide_config(&session_id, consumer_config)
            .await?;

        let session = Session::new(
            session_id,
            self.dependencies.service_id,
            &self.dependencies.proposal.service_type,
            self.consumer.clone(),
            config.clone(),
        );
        self.dependencies.sessions.add(session).await;
        self.owned.lock().insert(session_id);

        if let Some(target) = ping_target {
            self.ping_consumer(target);
        }

        Ok(SessionStart {
            session_id,
            config,
            payments_required: !self.dependencies.payments_disabled,
        })
    }

    async fn destroy(
        &self,
        negotiator: &dyn ConfigNegotiator,
        session_id: &SessionId,
    ) -> Result<(), SessionError> {
        let session = self
            .dependencies
            .sessions
            .find(session_id)
            .ok_or(SessionError::NotFound(*session_id))?;
        if session.consumer_id != self.consumer {
            warn!(
                session_id = %session_id,
                peer = %self.consumer,
                "[pn-04] Refusing to destroy another consumer's session"
            );
            return Err(SessionError::NotOwner {
                session_id: *session_id,
                peer: self.consumer.clone(),
            });
        }

        negotiator.release_config(session_id).await;
        self.dependencies.sessions.remove(session_id).await;
        self.owned.lock().remove(session_id);
        info!(session_id = %session_id, "[pn-04] Session destroyed");
        Ok(())
    }

    async fn destroy_all(&self, negotiator: &dyn ConfigNegotiator) {
        let owned: Vec<SessionId> = self.owned.lock().drain().collect();
        for session_id in owned {
            negotiator.release_config(&session_id).await;
            if self.dependencies.sessions.remove(&session_id).await.is_none() {
                debug!(session_id = %session_id, "[pn-04] Session already gone");
            }
        }
    }
}
