//! # WireGuard Service
//!
//! Every session gets its own listening port, leased from the service's pool
//! while the session's config is negotiated and returned when the session is
//! released. Mapping always uses UDP.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pn_01_port_pool::{PortLease, PortPool};
use pn_02_nat_mapping::{NatPortMapper, PortMappingHook};
use pn_04_session::{ConfigNegotiator, SessionError};
use serde_json::{json, Value};
use shared_types::ports::NatRule;
use shared_types::{
    Location, ServiceDefinition, ServiceOptions, ServiceProposal, SessionId, TransportProtocol,
    WireguardOptions, WIREGUARD_SERVICE_TYPE,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{map_port, stopped, unmap_port, FactoryDependencies};
use crate::domain::errors::ServiceError;
use crate::ports::{Service, ServiceFactory};

/// Description the gateway shows next to WireGuard port forwards.
pub const WIREGUARD_MAPPING_LABEL: &str = "Provider node WireGuard port mapping";

/// Builds WireGuard services.
pub struct WireguardServiceFactory {
    deps: FactoryDependencies,
}

impl WireguardServiceFactory {
    #[must_use]
    pub fn new(deps: FactoryDependencies) -> Self {
        Self { deps }
    }

    /// Build the concrete service and its proposal.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Resolve`] when location or outbound IP is unknown
    /// - [`ServiceError::OptionsMismatch`] for non-WireGuard options
    pub async fn build(
        &self,
        options: ServiceOptions,
    ) -> Result<(WireguardService, ServiceProposal), ServiceError> {
        let (location, outbound_ip) = self.deps.resolve().await?;

        let ServiceOptions::Wireguard(options) = options else {
            return Err(ServiceError::OptionsMismatch {
                expected: WIREGUARD_SERVICE_TYPE,
                actual: options.service_type(),
            });
        };

        let port_pool = if options.ports.is_specified() {
            PortPool::fixed_range(options.ports)
        } else {
            PortPool::dynamic()
        };

        let port_mapper = NatPortMapper::new(
            location.ip,
            outbound_ip,
            TransportProtocol::Udp,
            WIREGUARD_MAPPING_LABEL,
            Arc::clone(&self.deps.mapping_backend),
            Arc::clone(&self.deps.publisher),
        );

        let proposal = ServiceProposal::new(
            WIREGUARD_SERVICE_TYPE,
            &location,
            ServiceDefinition::Wireguard,
        );

        info!(pool = %port_pool.kind(), "[pn-05] WireGuard service built");

        let (shutdown, _) = watch::channel(false);
        let service = WireguardService {
            nat_rule: NatRule {
                source_subnet: options.subnet.clone(),
                target_ip: outbound_ip,
            },
            location,
            options,
            port_pool,
            port_mapper,
            deps: self.deps.clone(),
            sessions: Mutex::new(HashMap::new()),
            shutdown,
        };
        Ok((service, proposal))
    }
}

#[async_trait]
impl ServiceFactory for WireguardServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let (service, proposal) = self.build(options).await?;
        Ok((Arc::new(service), proposal))
    }
}

/// Port held by one negotiated session.
struct SessionPort {
    lease: PortLease,
    hook: PortMappingHook,
}

/// A WireGuard service.
pub struct WireguardService {
    location: Location,
    options: WireguardOptions,
    nat_rule: NatRule,
    port_pool: PortPool,
    port_mapper: NatPortMapper,
    deps: FactoryDependencies,
    sessions: Mutex<HashMap<SessionId, SessionPort>>,
    shutdown: watch::Sender<bool>,
}

impl WireguardService {
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn options(&self) -> &WireguardOptions {
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

    /// Number of sessions currently holding a port.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    async fn release_all(&self) {
        let released: Vec<SessionPort> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        for session in released {
            unmap_port(&session.hook).await;
            drop(session.lease);
        }
    }
}

#[async_trait]
impl Service for WireguardService {
    fn service_type(&self) -> &'static str {
        WIREGUARD_SERVICE_TYPE
    }

    async fn serve(&self) -> Result<(), ServiceError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(ServiceError::Stopped);
        }

        self.deps.nat_service.add(&self.nat_rule).await?;
        info!(
            subnet = %self.options.subnet,
            pool = %self.port_pool.kind(),
            "[pn-05] WireGuard service serving"
        );

        stopped(&mut shutdown).await;

        self.release_all().await;
        if let Err(e) = self.deps.nat_service.del(&self.nat_rule).await {
            warn!(error = %e, "[pn-05] Failed to remove WireGuard NAT rule");
        }
        info!("[pn-05] WireGuard service stopped");
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
impl ConfigNegotiator for WireguardService {
    async fn provide_config(
        &self,
        session_id: &SessionId,
        consumer_config: &Value,
    ) -> Result<Value, SessionError> {
        if *self.shutdown.borrow() {
            return Err(SessionError::ConfigNegotiation(
                "wireguard service is stopped".into(),
            ));
        }
        let public_key = consumer_config
            .get("public_key")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SessionError::ConfigNegotiation("consumer public_key missing".into())
            })?;

        let lease = self
            .port_pool
            .next()
            .map_err(|e| SessionError::ConfigNegotiation(e.to_string()))?;
        let port = lease.port();
        let hook = self.port_mapper.build(port);
        map_port(&hook).await;

        // stop may have drained the sessions while the gateway was busy.
        let stale = {
            let mut sessions = self.sessions.lock();
            if *self.shutdown.borrow() {
                Some(SessionPort { lease, hook })
            } else {
                sessions.insert(*session_id, SessionPort { lease, hook });
                None
            }
        };
        if let Some(session) = stale {
            unmap_port(&session.hook).await;
            return Err(SessionError::ConfigNegotiation(
                "wireguard service is stopped".into(),
            ));
        }
        debug!(session_id = %session_id, port, "[pn-05] WireGuard session port leased");

        Ok(json!({
            "endpoint": format!("{}:{}", self.location.ip, port),
            "port": port,
            "subnet": self.options.subnet,
            "connect_delay_ms": self.options.connect_delay_ms,
            "consumer_public_key": public_key,
        }))
    }

    async fn release_config(&self, session_id: &SessionId) {
        let session = self.sessions.lock().remove(session_id);
        if let Some(session) = session {
            unmap_port(&session.hook).await;
            debug!(
                session_id = %session_id,
                port = session.lease.port(),
                "[pn-05] WireGuard session port released"
            );
        }
    }
}
