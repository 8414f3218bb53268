//! # Service Bootstrap
//!
//! ```text
//! bootstrap_services
//!   └─ bootstrap_service_components
//!        ├─ enable NAT forwarding        (warn on failure)
//!        ├─ create ServiceRegistry
//!        ├─ event-based session storage  (subscription failure is fatal)
//!        ├─ build ServicesManager
//!        └─ subscribe ServiceCleaner     (warn on failure)
//!   └─ register openvpn, noop, wireguard factories
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use pn_04_session::{ConnectivityStorage, EventBasedStorage, SessionStorage};
use pn_05_services::{
    NoopServiceFactory, OpenvpnServiceFactory, ServiceCleaner, ServiceRegistry,
    WireguardServiceFactory,
};
use shared_bus::HandlerSubscription;
use shared_types::{NOOP_SERVICE_TYPE, OPENVPN_SERVICE_TYPE, WIREGUARD_SERVICE_TYPE};
use tracing::{info, warn};

use crate::container::NodeContainer;
use crate::manager::ServicesManager;
use crate::wiring::dialog::{DialogHandlerFactory, DialogWaiterFactory};

/// Everything the service bootstrap produced.
pub struct ServiceComponents {
    pub registry: Arc<ServiceRegistry>,
    pub sessions: Arc<EventBasedStorage>,
    pub connectivity: Arc<ConnectivityStorage>,
    pub manager: Arc<ServicesManager>,
    subscriptions: Vec<HandlerSubscription>,
}

impl ServiceComponents {
    /// Names of the live bus handlers.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<&'static str> {
        self.subscriptions.iter().map(HandlerSubscription::name).collect()
    }

    /// Stop every service, cancel bus handlers and disable NAT forwarding.
    pub async fn shutdown(&mut self, container: &NodeContainer) {
        self.manager.stop_all().await;
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
        if let Err(e) = container.nat_service.disable().await {
            warn!(error = %e, "[runtime] Failed to disable NAT forwarding");
        }
        info!("[runtime] Services shut down");
    }
}

/// Build the service components and register every protocol factory.
///
/// # Errors
///
/// Fails, with context `service bootstrap failed`, when the session storage
/// cannot subscribe to the bus.
pub async fn bootstrap_services(container: &NodeContainer) -> Result<ServiceComponents> {
    let components = bootstrap_service_components(container)
        .await
        .context("service bootstrap failed")?;

    let deps = container.factory_dependencies();
    components.registry.register(
        OPENVPN_SERVICE_TYPE,
        Arc::new(OpenvpnServiceFactory::new(
            container.openvpn_node_options(),
            deps.clone(),
        )),
    );
    components
        .registry
        .register(NOOP_SERVICE_TYPE, Arc::new(NoopServiceFactory::new(deps.clone())));
    components
        .registry
        .register(WIREGUARD_SERVICE_TYPE, Arc::new(WireguardServiceFactory::new(deps)));

    info!(
        service_types = ?components.registry.service_types(),
        "[runtime] Service factories registered"
    );
    Ok(components)
}

/// Build registry, session storage, manager and cleaner.
///
/// # Errors
///
/// Session storage subscription failure.
pub async fn bootstrap_service_components(container: &NodeContainer) -> Result<ServiceComponents> {
    if let Err(e) = container.nat_service.enable().await {
        warn!(error = %e, "[runtime] Failed to enable NAT forwarding, services may lack connectivity");
    }

    let registry = Arc::new(ServiceRegistry::new());

    let sessions = Arc::new(EventBasedStorage::new(container.bus.clone()));
    let storage_subscription = sessions
        .subscribe()
        .context("failed to subscribe session storage to traffic events")?;
    let storage: Arc<dyn SessionStorage> = sessions.clone();
    let connectivity = Arc::new(ConnectivityStorage::new());

    let waiters = DialogWaiterFactory::new(
        container.transport.clone(),
        Arc::clone(&container.signer_factory),
        container.provider.clone(),
    );
    let handlers = DialogHandlerFactory::new(container, Arc::clone(&storage), connectivity.clone());
    let manager = Arc::new(ServicesManager::new(
        Arc::clone(&registry),
        waiters,
        handlers,
        container.bus.clone(),
        container.provider.clone(),
    ));

    let mut subscriptions = vec![storage_subscription];
    match Arc::new(ServiceCleaner::new(storage)).subscribe(&container.bus) {
        Ok(subscription) => subscriptions.push(subscription),
        Err(e) => warn!(
            error = %e,
            "[runtime] Failed to subscribe service cleaner, sessions of stopped services will linger"
        ),
    }

    Ok(ServiceComponents {
        registry,
        sessions,
        connectivity,
        manager,
        subscriptions,
    })
}
