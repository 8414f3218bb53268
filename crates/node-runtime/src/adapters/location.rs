//! Location and outbound IP resolution.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use shared_types::ports::{IpResolver, LocationResolver};
use shared_types::{Location, ResolveError};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::container::config::LocationConfig;

/// Resolves the outbound IP as the local address of a UDP socket connected
/// towards `probe`. Connecting a UDP socket sends nothing.
pub struct UdpOutboundIpResolver {
    probe: String,
}

impl UdpOutboundIpResolver {
    #[must_use]
    pub fn new(probe: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
        }
    }
}

#[async_trait]
impl IpResolver for UdpOutboundIpResolver {
    async fn outbound_ip(&self) -> Result<IpAddr, ResolveError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| ResolveError::OutboundIp(e.to_string()))?;
        socket
            .connect(&self.probe)
            .await
            .map_err(|e| ResolveError::OutboundIp(format!("{}: {e}", self.probe)))?;
        let ip = socket
            .local_addr()
            .map_err(|e| ResolveError::OutboundIp(e.to_string()))?
            .ip();
        debug!(ip = %ip, "[runtime] Outbound IP resolved");
        Ok(ip)
    }
}

/// Location taken from configuration. Without a configured public IP the
/// node is assumed to be directly reachable on its outbound IP.
pub struct StaticLocationResolver {
    config: LocationConfig,
    ip_resolver: Arc<dyn IpResolver>,
}

impl StaticLocationResolver {
    #[must_use]
    pub fn new(config: LocationConfig, ip_resolver: Arc<dyn IpResolver>) -> Self {
        Self {
            config,
            ip_resolver,
        }
    }
}

#[async_trait]
impl LocationResolver for StaticLocationResolver {
    async fn detect_location(&self) -> Result<Location, ResolveError> {
        let ip = match self.config.public_ip {
            Some(ip) => ip,
            None => self
                .ip_resolver
                .outbound_ip()
                .await
                .map_err(|e| ResolveError::Location(e.to_string()))?,
        };
        Ok(Location {
            ip,
            continent: self.config.continent.clone(),
            country: self.config.country.clone(),
            city: self.config.city.clone(),
            asn: self.config.asn,
            isp: self.config.isp.clone(),
            node_type: self.config.node_type.clone(),
        })
    }
}
