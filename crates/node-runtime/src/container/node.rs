//! # Node Container
//!
//! Holds the node-level collaborators shared by every service.
//!
//! ## Initialization Order
//!
//! ```text
//! validate config → provider identity → event bus → dialog transport + signer
//!   → IP / location resolvers → NAT service + mapping backend
//!   → NAT pinger / tracker → payment collaborators
//! ```
//!
//! ## Thread Safety
//!
//! - Every collaborator is an `Arc`'d trait object, shareable across tasks
//! - Fields are public so tests can swap a collaborator before bootstrap

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pn_02_nat_mapping::{DisabledBackend, MappingBackend, UpnpBackend};
use pn_03_dialog::{InMemoryTransport, SignerFactory};
use pn_05_services::{FactoryDependencies, OpenvpnNodeOptions};
use shared_bus::InMemoryEventBus;
use shared_types::ports::{
    BlockchainHelper, IdentityRegistry, InvoiceStorage, IpResolver, LocationResolver, NatPinger,
    NatService, NatTracker, PromiseStorage, Transactor,
};
use shared_types::Identity;
use tracing::{info, warn};

use crate::adapters::{
    HmacSignerFactory, LoggingNatPinger, NoopBlockchainHelper, NoopIdentityRegistry,
    NoopInvoiceStorage, NoopNatService, NoopNatTracker, NoopPromiseStorage, NoopTransactor,
    StaticLocationResolver, UdpOutboundIpResolver,
};
use crate::container::config::NodeConfig;

/// Central container holding all node-level collaborators.
pub struct NodeContainer {
    pub config: NodeConfig,
    /// Identity every service is offered under.
    pub provider: Identity,

    // =========================================================================
    // SHARED INFRASTRUCTURE
    // =========================================================================
    pub bus: Arc<InMemoryEventBus>,
    pub transport: Arc<InMemoryTransport>,
    pub signer_factory: Arc<dyn SignerFactory>,

    // =========================================================================
    // RESOLUTION & NAT
    // =========================================================================
    pub ip_resolver: Arc<dyn IpResolver>,
    pub location_resolver: Arc<dyn LocationResolver>,
    pub nat_service: Arc<dyn NatService>,
    pub mapping_backend: Arc<dyn MappingBackend>,
    pub nat_pinger: Arc<dyn NatPinger>,
    pub nat_tracker: Arc<dyn NatTracker>,

    // =========================================================================
    // PAYMENTS (opaque)
    // =========================================================================
    pub transactor: Arc<dyn Transactor>,
    pub identity_registry: Arc<dyn IdentityRegistry>,
    pub blockchain_helper: Arc<dyn BlockchainHelper>,
    pub promise_storage: Arc<dyn PromiseStorage>,
    pub invoice_storage: Arc<dyn InvoiceStorage>,
}

impl NodeContainer {
    /// Build the container from a configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("invalid node configuration")?;
        let provider = config.provider_identity()?;
        info!(provider = %provider, "[runtime] Building node container");

        if config.identity.signer_secret.is_empty() {
            warn!("[runtime] Signer secret is empty, dialog signatures are not secret");
        }
        let signer_factory = HmacSignerFactory::new(config.identity.signer_secret.as_bytes())
            .context("failed to key dialog signer")?;

        let ip_resolver: Arc<dyn IpResolver> =
            Arc::new(UdpOutboundIpResolver::new(config.location.outbound_probe.clone()));
        let location_resolver = Arc::new(StaticLocationResolver::new(
            config.location.clone(),
            Arc::clone(&ip_resolver),
        ));

        let mapping_backend: Arc<dyn MappingBackend> = if config.nat.upnp_enabled {
            Arc::new(UpnpBackend::new(Duration::from_secs(
                config.nat.discovery_timeout_secs,
            )))
        } else {
            info!("[runtime] UPnP port mapping disabled by configuration");
            Arc::new(DisabledBackend)
        };

        Ok(Self {
            provider,
            bus: Arc::new(InMemoryEventBus::new()),
            transport: Arc::new(InMemoryTransport::new()),
            signer_factory: Arc::new(signer_factory),
            ip_resolver,
            location_resolver,
            nat_service: Arc::new(NoopNatService::new()),
            mapping_backend,
            nat_pinger: Arc::new(LoggingNatPinger),
            nat_tracker: Arc::new(NoopNatTracker),
            transactor: Arc::new(NoopTransactor),
            identity_registry: Arc::new(NoopIdentityRegistry),
            blockchain_helper: Arc::new(NoopBlockchainHelper),
            promise_storage: Arc::new(NoopPromiseStorage),
            invoice_storage: Arc::new(NoopInvoiceStorage),
            config,
        })
    }

    /// Collaborators captured by every service factory.
    #[must_use]
    pub fn factory_dependencies(&self) -> FactoryDependencies {
        FactoryDependencies {
            location_resolver: Arc::clone(&self.location_resolver),
            ip_resolver: Arc::clone(&self.ip_resolver),
            nat_service: Arc::clone(&self.nat_service),
            mapping_backend: Arc::clone(&self.mapping_backend),
            publisher: self.bus.clone(),
        }
    }

    #[must_use]
    pub fn openvpn_node_options(&self) -> OpenvpnNodeOptions {
        OpenvpnNodeOptions {
            binary_path: self.config.openvpn.binary_path.clone(),
        }
    }
}
