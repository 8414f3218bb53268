//! # Session Manager Factory
//!
//! Node-level collaborators are captured once, when the owning service is
//! started. Every call to [`create`](SessionManagerFactory::create) shares
//! them through one `Arc` and adds only the per-dialog consumer.

use std::sync::Arc;

use shared_bus::EventPublisher;
use shared_types::ports::{
    BlockchainHelper, IdentityRegistry, InvoiceStorage, NatPinger, NatTracker, Transactor,
};
use shared_types::{Identity, ServiceId, ServiceProposal};
use tracing::debug;

use super::manager::NodeSessionManager;
use crate::domain::session::SessionSettings;
use crate::ports::{SessionManager, SessionManagerFactory};
use crate::storage::SessionStorage;

/// Collaborators shared by every session manager of one service.
pub struct SessionDependencies {
    pub settings: SessionSettings,
    pub proposal: ServiceProposal,
    pub service_id: ServiceId,
    pub sessions: Arc<dyn SessionStorage>,
    pub nat_pinger: Arc<dyn NatPinger>,
    pub nat_tracker: Arc<dyn NatTracker>,
    pub publisher: Arc<dyn EventPublisher>,
    pub identity_registry: Arc<dyn IdentityRegistry>,
    pub blockchain_helper: Arc<dyn BlockchainHelper>,
    pub transactor: Arc<dyn Transactor>,
    pub invoice_storage: Arc<dyn InvoiceStorage>,
    pub payments_disabled: bool,
}

/// Factory producing [`NodeSessionManager`]s.
pub struct NodeSessionManagerFactory {
    dependencies: Arc<SessionDependencies>,
}

impl NodeSessionManagerFactory {
    #[must_use]
    pub fn new(dependencies: SessionDependencies) -> Self {
        Self {
            dependencies: Arc::new(dependencies),
        }
    }

    #[must_use]
    pub fn dependencies(&self) -> &SessionDependencies {
        &self.dependencies
    }
}

impl SessionManagerFactory for NodeSessionManagerFactory {
    fn create(&self, consumer: &Identity) -> Arc<dyn SessionManager> {
        debug!(
            consumer = %consumer,
            service_id = %self.dependencies.service_id,
            "[pn-04] Creating session manager"
        );
        Arc::new(NodeSessionManager::new(
            consumer.clone(),
            Arc::clone(&self.dependencies),
        ))
    }
}
