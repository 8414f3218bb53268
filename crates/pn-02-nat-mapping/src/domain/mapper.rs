//! # Port Mapper
//!
//! `NatPortMapper` holds the parameters captured once per service instance.
//! `build` turns a port into a [`PortMappingHook`] by copying those
//! parameters; nothing touches the network until the hook is invoked.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use shared_bus::{EventPublisher, NodeEvent, PortMappingStage};
use shared_types::TransportProtocol;
use tracing::{debug, info, warn};

use super::errors::NatError;
use crate::ports::MappingBackend;

/// Lease requested from the gateway, in seconds. Services renew before it ends.
pub const DEFAULT_LEASE_SECS: u32 = 20 * 60;

/// Everything a gateway needs to forward one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    /// Transport protocol of the forward.
    pub protocol: TransportProtocol,
    /// External and internal port (forwarded 1:1).
    pub port: u16,
    /// Address of this node on the internal network.
    pub internal_ip: IpAddr,
    /// Lease length in seconds; `0` asks for a permanent mapping.
    pub lease_secs: u32,
    /// Human-readable description shown by the gateway.
    pub label: String,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOutcome {
    /// The node is directly reachable, nothing was mapped.
    NotRequired,
    /// The gateway accepted (or renewed) the mapping.
    Mapped,
}

/// Builds port mapping hooks for one service instance.
#[derive(Clone)]
pub struct NatPortMapper {
    public_ip: IpAddr,
    outbound_ip: IpAddr,
    protocol: TransportProtocol,
    label: String,
    backend: Arc<dyn MappingBackend>,
    publisher: Arc<dyn EventPublisher>,
}

impl NatPortMapper {
    /// Capture the mapping parameters. Performs no I/O.
    #[must_use]
    pub fn new(
        public_ip: IpAddr,
        outbound_ip: IpAddr,
        protocol: TransportProtocol,
        label: impl Into<String>,
        backend: Arc<dyn MappingBackend>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            public_ip,
            outbound_ip,
            protocol,
            label: label.into(),
            backend,
            publisher,
        }
    }

    /// Build the hook that maps `port`. Pure: no I/O, no locking.
    #[must_use]
    pub fn build(&self, port: u16) -> PortMappingHook {
        PortMappingHook {
            request: MappingRequest {
                protocol: self.protocol,
                port,
                internal_ip: self.outbound_ip,
                lease_secs: DEFAULT_LEASE_SECS,
                label: self.label.clone(),
            },
            behind_nat: self.public_ip != self.outbound_ip,
            backend: Arc::clone(&self.backend),
            publisher: Arc::clone(&self.publisher),
        }
    }

    #[must_use]
    pub fn protocol(&self) -> TransportProtocol {
        self.protocol
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn public_ip(&self) -> IpAddr {
        self.public_ip
    }

    #[must_use]
    pub fn outbound_ip(&self) -> IpAddr {
        self.outbound_ip
    }
}

impl fmt::Debug for NatPortMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatPortMapper")
            .field("public_ip", &self.public_ip)
            .field("outbound_ip", &self.outbound_ip)
            .field("protocol", &self.protocol)
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Deferred mapping of one port.
pub struct PortMappingHook {
    request: MappingRequest,
    behind_nat: bool,
    backend: Arc<dyn MappingBackend>,
    publisher: Arc<dyn EventPublisher>,
}

impl PortMappingHook {
    /// Parameters the hook will send to the gateway.
    #[must_use]
    pub fn request(&self) -> &MappingRequest {
        &self.request
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.request.port
    }

    #[must_use]
    pub fn protocol(&self) -> TransportProtocol {
        self.request.protocol
    }

    /// Whether invoking the hook will contact the gateway at all.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.behind_nat
    }

    /// Ask the gateway to forward the port. Safe to repeat; each call renews
    /// the lease.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`NatError`]. The caller decides whether to retry.
    pub async fn invoke(&self) -> Result<MappingOutcome, NatError> {
        if !self.behind_nat {
            debug!(
                port = self.request.port,
                "[pn-02] Public and outbound IP match, port mapping not required"
            );
            return Ok(MappingOutcome::NotRequired);
        }

        let result = self.backend.map(&self.request).await;
        match &result {
            Ok(()) => info!(
                port = self.request.port,
                protocol = %self.request.protocol,
                backend = self.backend.name(),
                "[pn-02] Port mapped"
            ),
            Err(e) => warn!(
                port = self.request.port,
                protocol = %self.request.protocol,
                error = %e,
                "[pn-02] Port mapping failed"
            ),
        }
        self.report(PortMappingStage::Mapping, &result).await;
        result.map(|()| MappingOutcome::Mapped)
    }

    /// Remove the mapping. Best effort: failures are logged and returned.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`NatError`].
    pub async fn release(&self) -> Result<(), NatError> {
        if !self.behind_nat {
            return Ok(());
        }

        let result = self.backend.unmap(&self.request).await;
        if let Err(e) = &result {
            warn!(port = self.request.port, error = %e, "[pn-02] Port unmapping failed");
        } else {
            debug!(port = self.request.port, "[pn-02] Port unmapped");
        }
        self.report(PortMappingStage::Unmapping, &result).await;
        result
    }

    async fn report(&self, stage: PortMappingStage, result: &Result<(), NatError>) {
        self.publisher
            .publish(NodeEvent::PortMapping {
                stage,
                port: self.request.port,
                protocol: self.request.protocol.to_string(),
                successful: result.is_ok(),
                error: result.as_ref().err().map(ToString::to_string),
            })
            .await;
    }
}

impl fmt::Debug for PortMappingHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortMappingHook")
            .field("request", &self.request)
            .field("behind_nat", &self.behind_nat)
            .finish()
    }
}
