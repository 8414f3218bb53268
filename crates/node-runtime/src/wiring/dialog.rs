//! # Dialog Wiring
//!
//! Factories capturing node-level collaborators once at bootstrap and
//! invoked per started service: one waiter and one handler each.

use std::sync::Arc;

use pn_03_dialog::{
    AllowListValidator, ChannelKey, DialogHandler, DialogTransport, DialogWaiter, SignerFactory,
};
use pn_04_session::{
    ConfigNegotiator, NodeSessionManagerFactory, SessionDependencies, SessionDialogHandler,
    SessionSettings, SessionStorage, StatusSubscriber,
};
use shared_bus::EventPublisher;
use shared_types::ports::{
    BlockchainHelper, IdentityRegistry, InvoiceStorage, NatPinger, NatTracker, PromiseStorage,
    Transactor,
};
use shared_types::{Identity, ServiceId, ServiceProposal};
use tracing::debug;

use crate::container::NodeContainer;

/// Builds the dialog waiter of a started service.
pub struct DialogWaiterFactory {
    transport: Arc<dyn DialogTransport>,
    signer_factory: Arc<dyn SignerFactory>,
    provider: Identity,
}

impl DialogWaiterFactory {
    #[must_use]
    pub fn new(
        transport: Arc<dyn DialogTransport>,
        signer_factory: Arc<dyn SignerFactory>,
        provider: Identity,
    ) -> Self {
        Self {
            transport,
            signer_factory,
            provider,
        }
    }

    /// Waiter on the `(provider, service_type)` channel admitting `allow_list`
    /// (everyone when empty).
    #[must_use]
    pub fn create(&self, service_type: &str, allow_list: &[Identity]) -> DialogWaiter {
        let channel = ChannelKey::new(&self.provider, service_type);
        debug!(channel = %channel, allowed = allow_list.len(), "[runtime] Creating dialog waiter");
        DialogWaiter::new(
            Arc::clone(&self.transport),
            channel,
            self.signer_factory.signer_for(&self.provider),
            Arc::new(AllowListValidator::new(allow_list.iter().cloned())),
        )
    }
}

/// Builds the dialog handler of a started service.
pub struct DialogHandlerFactory {
    settings: SessionSettings,
    provider: Identity,
    sessions: Arc<dyn SessionStorage>,
    connectivity: Arc<dyn StatusSubscriber>,
    publisher: Arc<dyn EventPublisher>,
    nat_pinger: Arc<dyn NatPinger>,
    nat_tracker: Arc<dyn NatTracker>,
    identity_registry: Arc<dyn IdentityRegistry>,
    blockchain_helper: Arc<dyn BlockchainHelper>,
    transactor: Arc<dyn Transactor>,
    promise_storage: Arc<dyn PromiseStorage>,
    invoice_storage: Arc<dyn InvoiceStorage>,
    payments_disabled: bool,
}

impl DialogHandlerFactory {
    /// Capture the container's collaborators plus the node's session stores.
    #[must_use]
    pub fn new(
        container: &NodeContainer,
        sessions: Arc<dyn SessionStorage>,
        connectivity: Arc<dyn StatusSubscriber>,
    ) -> Self {
        Self {
            settings: container.config.session_settings(),
            provider: container.provider.clone(),
            sessions,
            connectivity,
            publisher: container.bus.clone(),
            nat_pinger: Arc::clone(&container.nat_pinger),
            nat_tracker: Arc::clone(&container.nat_tracker),
            identity_registry: Arc::clone(&container.identity_registry),
            blockchain_helper: Arc::clone(&container.blockchain_helper),
            transactor: Arc::clone(&container.transactor),
            promise_storage: Arc::clone(&container.promise_storage),
            invoice_storage: Arc::clone(&container.invoice_storage),
            payments_disabled: container.config.payments.disabled,
        }
    }

    /// Handler serving dialogs of the service `service_id`.
    #[must_use]
    pub fn create(
        &self,
        proposal: ServiceProposal,
        service_id: ServiceId,
        negotiator: Arc<dyn ConfigNegotiator>,
    ) -> Arc<dyn DialogHandler> {
        let factory = NodeSessionManagerFactory::new(SessionDependencies {
            settings: self.settings,
            proposal,
            service_id,
            sessions: Arc::clone(&self.sessions),
            nat_pinger: Arc::clone(&self.nat_pinger),
            nat_tracker: Arc::clone(&self.nat_tracker),
            publisher: Arc::clone(&self.publisher),
            identity_registry: Arc::clone(&self.identity_registry),
            blockchain_helper: Arc::clone(&self.blockchain_helper),
            transactor: Arc::clone(&self.transactor),
            invoice_storage: Arc::clone(&self.invoice_storage),
            payments_disabled: self.payments_disabled,
        });
        Arc::new(SessionDialogHandler::new(
            Arc::new(factory),
            negotiator,
            Arc::clone(&self.promise_storage),
            self.provider.clone(),
            Arc::clone(&self.connectivity),
        ))
    }
}
