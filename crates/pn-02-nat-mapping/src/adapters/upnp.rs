//! UPnP IGD backend.
//!
//! The gateway found by discovery is cached. A request-level failure drops
//! the cache so the next invocation searches again.

use std::net::{IpAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use igd::aio::{search_gateway, Gateway};
use igd::{AddPortError, PortMappingProtocol, RemovePortError, SearchOptions};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::errors::NatError;
use crate::domain::mapper::MappingRequest;
use crate::ports::MappingBackend;
use shared_types::TransportProtocol;

/// Maps ports through the first UPnP Internet Gateway Device that answers.
pub struct UpnpBackend {
    search_timeout: Duration,
    gateway: Mutex<Option<Gateway>>,
}

impl UpnpBackend {
    #[must_use]
    pub fn new(search_timeout: Duration) -> Self {
        Self {
            search_timeout,
            gateway: Mutex::new(None),
        }
    }

    async fn gateway(&self) -> Result<Gateway, NatError> {
        let cached = self.gateway.lock().clone();
        if let Some(gateway) = cached {
            return Ok(gateway);
        }

        debug!("[pn-02] Searching for UPnP gateway");
        let options = SearchOptions {
            timeout: Some(self.search_timeout),
            ..Default::default()
        };
        let gateway = search_gateway(options)
            .await
            .map_err(|e| NatError::Discovery(e.to_string()))?;
        info!(gateway = %gateway.addr, "[pn-02] UPnP gateway found");

        *self.gateway.lock() = Some(gateway.clone());
        Ok(gateway)
    }

    fn forget_gateway(&self) {
        self.gateway.lock().take();
    }
}

fn protocol(protocol: TransportProtocol) -> PortMappingProtocol {
    match protocol {
        TransportProtocol::Udp => PortMappingProtocol::UDP,
        TransportProtocol::Tcp => PortMappingProtocol::TCP,
    }
}

fn local_addr(request: &MappingRequest) -> Result<SocketAddrV4, NatError> {
    match request.internal_ip {
        IpAddr::V4(ip) => Ok(SocketAddrV4::new(ip, request.port)),
        other @ IpAddr::V6(_) => Err(NatError::UnsupportedAddress(other)),
    }
}

#[async_trait]
impl MappingBackend for UpnpBackend {
    fn name(&self) -> &'static str {
        "upnp"
    }

    async fn map(&self, request: &MappingRequest) -> Result<(), NatError> {
        let local = local_addr(request)?;
        let gateway = self.gateway().await?;
        let proto = protocol(request.protocol);

        let first = gateway
            .add_port(proto, request.port, local, request.lease_secs, &request.label)
            .await;
        let result = match first {
            Err(AddPortError::OnlyPermanentLeasesSupported) if request.lease_secs != 0 => {
                warn!(port = request.port, "[pn-02] Gateway only supports permanent leases");
                gateway
                    .add_port(proto, request.port, local, 0, &request.label)
                    .await
            }
            other => other,
        };

        result.map_err(|e| {
            if matches!(e, AddPortError::RequestError(_)) {
                self.forget_gateway();
            }
            NatError::Mapping {
                port: request.port,
                reason: e.to_string(),
            }
        })
    }

    async fn unmap(&self, request: &MappingRequest) -> Result<(), NatError> {
        let gateway = self.gateway().await?;
        gateway
            .remove_port(protocol(request.protocol), request.port)
            .await
            .map_err(|e| {
                if matches!(e, RemovePortError::RequestError(_)) {
                    self.forget_gateway();
                }
                NatError::Unmapping {
                    port: request.port,
                    reason: e.to_string(),
                }
            })
    }
}
