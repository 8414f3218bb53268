//! # OpenVPN Service
//!
//! The factory checks the host before touching any resolver: without the
//! OpenVPN binary there is nothing to start. The running service leases one
//! listening port for its whole life and keeps the gateway mapping of that
//! port renewed until it is stopped.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pn_01_port_pool::PortPool;
use pn_02_nat_mapping::{NatPortMapper, DEFAULT_LEASE_SECS};
use pn_04_session::{ConfigNegotiator, SessionError};
use serde_json::{json, Value};
use shared_types::ports::NatRule;
use shared_types::{
    OpenvpnOptions, ServiceDefinition, ServiceOptions, ServiceProposal, SessionId,
    OPENVPN_SERVICE_TYPE,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{map_port, stopped, unmap_port, FactoryDependencies};
use crate::domain::errors::ServiceError;
use crate::domain::location::ServiceLocationInfo;
use crate::ports::{Service, ServiceFactory};

/// Description the gateway shows next to OpenVPN port forwards.
pub const OPENVPN_MAPPING_LABEL: &str = "Provider node OpenVPN port mapping";

/// Node-level OpenVPN settings, independent of any single service start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenvpnNodeOptions {
    /// Path or bare name of the OpenVPN executable.
    pub binary_path: PathBuf,
}

impl Default for OpenvpnNodeOptions {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("openvpn"),
        }
    }
}

impl OpenvpnNodeOptions {
    /// Verify the OpenVPN binary exists. A bare name is looked up in `PATH`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Precondition`] when the binary cannot be found.
    pub fn check(&self) -> Result<(), ServiceError> {
        if find_binary(&self.binary_path).is_some() {
            Ok(())
        } else {
            Err(ServiceError::Precondition(format!(
                "openvpn binary not found at {}",
                self.binary_path.display()
            )))
        }
    }
}

fn find_binary(binary: &Path) -> Option<PathBuf> {
    if binary.components().count() > 1 {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

// =============================================================================
// FACTORY
// =============================================================================

/// Builds OpenVPN services.
pub struct OpenvpnServiceFactory {
    node_options: OpenvpnNodeOptions,
    deps: FactoryDependencies,
}

impl OpenvpnServiceFactory {
    #[must_use]
    pub fn new(node_options: OpenvpnNodeOptions, deps: FactoryDependencies) -> Self {
        Self { node_options, deps }
    }

    /// Build the concrete service and its proposal.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Precondition`] when the binary is missing
    /// - [`ServiceError::Resolve`] when location or outbound IP is unknown
    /// - [`ServiceError::OptionsMismatch`] for non-OpenVPN options
    pub async fn build(
        &self,
        options: ServiceOptions,
    ) -> Result<(OpenvpnService, ServiceProposal), ServiceError> {
        self.node_options.check()?;
        let (location, outbound_ip) = self.deps.resolve().await?;

        let ServiceOptions::Openvpn(options) = options else {
            return Err(ServiceError::OptionsMismatch {
                expected: OPENVPN_SERVICE_TYPE,
                actual: options.service_type(),
            });
        };

        let port_pool = if options.port == 0 {
            PortPool::dynamic()
        } else {
            PortPool::fixed(options.port)
        };

        let port_mapper = NatPortMapper::new(
            location.ip,
            outbound_ip,
            options.protocol,
            OPENVPN_MAPPING_LABEL,
            Arc::clone(&self.deps.mapping_backend),
            Arc::clone(&self.deps.publisher),
        );

        let proposal = ServiceProposal::new(
            OPENVPN_SERVICE_TYPE,
            &location,
            ServiceDefinition::Openvpn {
                protocol: options.protocol,
            },
        );

        info!(
            pool = %port_pool.kind(),
            protocol = %options.protocol,
            "[pn-05] OpenVPN service built"
        );

        let (shutdown, _) = watch::channel(false);
        let service = OpenvpnService {
            location: ServiceLocationInfo::new(&location, outbound_ip),
            options,
            port_pool,
            port_mapper,
            deps: self.deps.clone(),
            listening_port: Mutex::new(None),
            shutdown,
        };
        Ok((service, proposal))
    }
}

#[async_trait]
impl ServiceFactory for OpenvpnServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let (service, proposal) = self.build(options).await?;
        Ok((Arc::new(service), proposal))
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// A running (or runnable) OpenVPN service.
pub struct OpenvpnService {
    location: ServiceLocationInfo,
    options: OpenvpnOptions,
    port_pool: PortPool,
    port_mapper: NatPortMapper,
    deps: FactoryDependencies,
    listening_port: Mutex<Option<u16>>,
    shutdown: watch::Sender<bool>,
}

impl OpenvpnService {
    #[must_use]
    pub fn location(&self) -> &ServiceLocationInfo {
        &self.location
    }

    #[must_use]
    pub fn options(&self) -> &OpenvpnOptions {
        &self.options
    }

    #[must_use]
    pub fn port_pool(&self) -> &PortPool {
        &self.port_pool
    }

    #[must_use]
    pub fn port_mapper(&self) -> &NatPortMapper {
        &self.port_mapper
    }

    /// Port the service listens on while serving.
    #[must_use]
    pub fn listening_port(&self) -> Option<u16> {
        *self.listening_port.lock()
    }

    fn nat_rule(&self) -> NatRule {
        NatRule {
            source_subnet: subnet_cidr(&self.options.subnet, &self.options.netmask),
            target_ip: self.location.outbound_ip,
        }
    }
}

/// `10.8.0.0` + `255.255.255.0` -> `10.8.0.0/24`.
fn subnet_cidr(subnet: &str, netmask: &str) -> String {
    match netmask.parse::<Ipv4Addr>() {
        Ok(mask) => format!("{subnet}/{}", u32::from(mask).count_ones()),
        Err(_) => format!("{subnet}/{netmask}"),
    }
}

#[async_trait]
impl Service for OpenvpnService {
    fn service_type(&self) -> &'static str {
        OPENVPN_SERVICE_TYPE
    }

    async fn serve(&self) -> Result<(), ServiceError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(ServiceError::Stopped);
        }

        let lease = self.port_pool.next()?;
        let hook = self.port_mapper.build(lease.port());
        let rule = self.nat_rule();
        self.deps.nat_service.add(&rule).await?;
        map_port(&hook).await;

        *self.listening_port.lock() = Some(lease.port());
        info!(
            port = lease.port(),
            protocol = %self.options.protocol,
            public_ip = %self.location.public_ip,
            "[pn-05] OpenVPN service serving"
        );

        let mut renew =
            tokio::time::interval(Duration::from_secs(u64::from(DEFAULT_LEASE_SECS / 2)));
        renew.tick().await;
        loop {
            tokio::select! {
                () = stopped(&mut shutdown) => break,
                _ = renew.tick() => {
                    debug!(port = lease.port(), "[pn-05] Renewing OpenVPN port mapping");
                    map_port(&hook).await;
                }
            }
        }

        *self.listening_port.lock() = None;
        unmap_port(&hook).await;
        if let Err(e) = self.deps.nat_service.del(&rule).await {
            warn!(error = %e, "[pn-05] Failed to remove OpenVPN NAT rule");
        }
        info!(port = lease.port(), "[pn-05] OpenVPN service stopped");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.shutdown.send_replace(true);
        Ok(())
    }

    fn negotiator(self: Arc<Self>) -> Arc<dyn ConfigNegotiator> {
        self
    }
}

#[async_trait]
impl ConfigNegotiator for OpenvpnService {
    async fn provide_config(
        &self,
        session_id: &SessionId,
        _consumer_config: &Value,
    ) -> Result<Value, SessionError> {
        let port = self.listening_port().ok_or_else(|| {
            SessionError::ConfigNegotiation("openvpn service is not serving".into())
        })?;
        debug!(session_id = %session_id, port, "[pn-05] Providing OpenVPN config");
        Ok(json!({
            "remote": self.location.public_ip.to_string(),
            "port": port,
            "protocol": self.options.protocol.as_str(),
            "subnet": self.options.subnet,
            "netmask": self.options.netmask,
            "country": self.location.country,
        }))
    }

    async fn release_config(&self, session_id: &SessionId) {
        debug!(session_id = %session_id, "[pn-05] OpenVPN session released");
    }
}
