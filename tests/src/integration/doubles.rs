//! # Test Doubles
//!
//! In-process stand-ins for the host collaborators the service factories
//! capture: resolvers, the NAT forwarding service and the gateway backend.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pn_02_nat_mapping::{MappingBackend, MappingRequest, NatError};
use pn_03_dialog::{Signature, Signer};
use pn_05_services::FactoryDependencies;
use shared_bus::InMemoryEventBus;
use shared_types::ports::{IpResolver, LocationResolver, NatRule, NatService};
use shared_types::{Identity, Location, NatServiceError, ResolveError};

pub const PUBLIC_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 50));
pub const OUTBOUND_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

/// Identity `0x000…0n`.
#[must_use]
pub fn identity(n: u8) -> Identity {
    Identity::from_address(&format!("0x{:040x}", n))
}

#[must_use]
pub fn location() -> Location {
    Location {
        ip: PUBLIC_IP,
        continent: "EU".into(),
        country: "DE".into(),
        city: "Frankfurt".into(),
        asn: 3320,
        isp: "Deutsche Telekom".into(),
        node_type: "residential".into(),
    }
}

pub struct StaticLocation(pub Result<Location, ResolveError>);

#[async_trait]
impl LocationResolver for StaticLocation {
    async fn detect_location(&self) -> Result<Location, ResolveError> {
        self.0.clone()
    }
}

pub struct StaticIp(pub IpAddr);

#[async_trait]
impl IpResolver for StaticIp {
    async fn outbound_ip(&self) -> Result<IpAddr, ResolveError> {
        Ok(self.0)
    }
}

/// NAT service keeping its rules in memory.
#[derive(Default)]
pub struct MemoryNat {
    pub rules: Mutex<Vec<NatRule>>,
}

#[async_trait]
impl NatService for MemoryNat {
    async fn enable(&self) -> Result<(), NatServiceError> {
        Ok(())
    }

    async fn disable(&self) -> Result<(), NatServiceError> {
        self.rules.lock().clear();
        Ok(())
    }

    async fn add(&self, rule: &NatRule) -> Result<(), NatServiceError> {
        self.rules.lock().push(rule.clone());
        Ok(())
    }

    async fn del(&self, rule: &NatRule) -> Result<(), NatServiceError> {
        self.rules.lock().retain(|r| r != rule);
        Ok(())
    }
}

/// Gateway backend recording every request it receives.
#[derive(Default)]
pub struct MemoryGateway {
    pub requests: Mutex<Vec<MappingRequest>>,
}

#[async_trait]
impl MappingBackend for MemoryGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn map(&self, request: &MappingRequest) -> Result<(), NatError> {
        self.requests.lock().push(request.clone());
        Ok(())
    }

    async fn unmap(&self, request: &MappingRequest) -> Result<(), NatError> {
        self.requests.lock().retain(|r| r.port != request.port);
        Ok(())
    }
}

pub struct PlainSigner(pub Identity);

impl Signer for PlainSigner {
    fn identity(&self) -> &Identity {
        &self.0
    }

    fn sign(&self, message: &[u8]) -> Signature {
        Signature(message.to_vec())
    }
}

/// Factory collaborators plus handles on the doubles behind them.
pub struct Harness {
    pub deps: FactoryDependencies,
    pub nat: Arc<MemoryNat>,
    pub gateway: Arc<MemoryGateway>,
    pub bus: Arc<InMemoryEventBus>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_location(Ok(location()))
    }

    #[must_use]
    pub fn with_location(location: Result<Location, ResolveError>) -> Self {
        let nat = Arc::new(MemoryNat::default());
        let gateway = Arc::new(MemoryGateway::default());
        let bus = Arc::new(InMemoryEventBus::new());
        Self {
            deps: FactoryDependencies {
                location_resolver: Arc::new(StaticLocation(location)),
                ip_resolver: Arc::new(StaticIp(OUTBOUND_IP)),
                nat_service: nat.clone(),
                mapping_backend: gateway.clone(),
                publisher: bus.clone(),
            },
            nat,
            gateway,
            bus,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
