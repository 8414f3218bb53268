//! Ports of the session subsystem.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{Identity, SessionId};

use crate::domain::errors::SessionError;
use crate::domain::session::SessionStart;

/// Service-side configuration negotiation.
#[async_trait]
pub trait ConfigNegotiator: Send + Sync {
    /// Produce the tunnel configuration for a new session.
    async fn provide_config(
        &self,
        session_id: &SessionId,
        consumer_config: &Value,
    ) -> Result<Value, SessionError>;

    /// Free whatever `provide_config` reserved for the session.
    async fn release_config(&self, session_id: &SessionId);
}

/// Sessions of one dialog.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Consumer the manager serves.
    fn consumer(&self) -> &Identity;

    async fn start(
        &self,
        negotiator: &dyn ConfigNegotiator,
        consumer_config: &Value,
        ping_target: Option<SocketAddr>,
    ) -> Result<SessionStart, SessionError>;

    async fn destroy(
        &self,
        negotiator: &dyn ConfigNegotiator,
        session_id: &SessionId,
    ) -> Result<(), SessionError>;

    /// Destroy every session started through this manager.
    async fn destroy_all(&self, negotiator: &dyn ConfigNegotiator);
}

/// Builds one session manager per accepted dialog.
pub trait SessionManagerFactory: Send + Sync {
    fn create(&self, consumer: &Identity) -> Arc<dyn SessionManager>;
}
