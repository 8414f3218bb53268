//! Protocol factories and the helpers they share.

pub mod noop;
pub mod openvpn;
pub mod wireguard;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use pn_02_nat_mapping::{MappingBackend, PortMappingHook};
use shared_bus::EventPublisher;
use shared_types::ports::{IpResolver, LocationResolver, NatService};
use shared_types::Location;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::errors::ServiceError;

/// Upper bound on one gateway round trip made by a service.
pub const MAPPING_TIMEOUT: Duration = Duration::from_secs(10);

/// Node-level collaborators every protocol factory captures once.
#[derive(Clone)]
pub struct FactoryDependencies {
    pub location_resolver: Arc<dyn LocationResolver>,
    pub ip_resolver: Arc<dyn IpResolver>,
    pub nat_service: Arc<dyn NatService>,
    pub mapping_backend: Arc<dyn MappingBackend>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl FactoryDependencies {
    /// Resolve location then outbound IP. Either failure aborts.
    pub(crate) async fn resolve(&self) -> Result<(Location, IpAddr), ServiceError> {
        let location = self.location_resolver.detect_location().await?;
        let outbound_ip = self.ip_resolver.outbound_ip().await?;
        debug!(
            public_ip = %location.ip,
            outbound_ip = %outbound_ip,
            country = %location.country,
            "[pn-05] Resolved service location"
        );
        Ok((location, outbound_ip))
    }
}

/// Invoke `hook` bounded by [`MAPPING_TIMEOUT`]. Failures are not fatal.
pub(crate) async fn map_port(hook: &PortMappingHook) {
    match tokio::time::timeout(MAPPING_TIMEOUT, hook.invoke()).await {
        Ok(Ok(outcome)) => debug!(port = hook.port(), ?outcome, "[pn-05] Port mapping done"),
        Ok(Err(e)) => warn!(
            port = hook.port(),
            error = %e,
            "[pn-05] Port mapping failed, consumers behind other NATs may not connect"
        ),
        Err(_) => warn!(
            port = hook.port(),
            timeout_secs = MAPPING_TIMEOUT.as_secs(),
            "[pn-05] Port mapping timed out"
        ),
    }
}

/// Release the mapping of `hook`, bounded by [`MAPPING_TIMEOUT`].
pub(crate) async fn unmap_port(hook: &PortMappingHook) {
    if tokio::time::timeout(MAPPING_TIMEOUT, hook.release())
        .await
        .is_err()
    {
        warn!(port = hook.port(), "[pn-05] Port unmapping timed out");
    }
}

/// Resolve once the shutdown flag is raised or its sender is gone.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Collaborator doubles shared by the protocol tests.

    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pn_02_nat_mapping::{MappingBackend, MappingRequest, NatError};
    use shared_bus::InMemoryEventBus;
    use shared_types::ports::{IpResolver, LocationResolver, NatRule, NatService};
    use shared_types::{Location, NatServiceError, ResolveError};

    use super::FactoryDependencies;

    pub const PUBLIC_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
    pub const OUTBOUND_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));

    pub fn location() -> Location {
        Location {
            ip: PUBLIC_IP,
            continent: "EU".into(),
            country: "LT".into(),
            city: "Vilnius".into(),
            asn: 8764,
            isp: "Telia".into(),
            node_type: "residential".into(),
        }
    }

    pub struct FixedLocation(pub Result<Location, ResolveError>);

    #[async_trait]
    impl LocationResolver for FixedLocation {
        async fn detect_location(&self) -> Result<Location, ResolveError> {
            self.0.clone()
        }
    }

    pub struct FixedIp(pub Result<IpAddr, ResolveError>);

    #[async_trait]
    impl IpResolver for FixedIp {
        async fn outbound_ip(&self) -> Result<IpAddr, ResolveError> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    pub struct RecordingNat {
        pub rules: Mutex<Vec<NatRule>>,
    }

    #[async_trait]
    impl NatService for RecordingNat {
        async fn enable(&self) -> Result<(), NatServiceError> {
            Ok(())
        }

        async fn disable(&self) -> Result<(), NatServiceError> {
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

    #[derive(Default)]
    pub struct RecordingBackend {
        pub mapped: Mutex<Vec<u16>>,
        /// Gateway latency applied to every `map`.
        pub delay: Mutex<Duration>,
    }

    #[async_trait]
    impl MappingBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn map(&self, request: &MappingRequest) -> Result<(), NatError> {
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut mapped = self.mapped.lock();
            if !mapped.contains(&request.port) {
                mapped.push(request.port);
            }
            Ok(())
        }

        async fn unmap(&self, request: &MappingRequest) -> Result<(), NatError> {
            self.mapped.lock().retain(|p| *p != request.port);
            Ok(())
        }
    }

    pub struct Doubles {
        pub deps: FactoryDependencies,
        pub nat: Arc<RecordingNat>,
        pub backend: Arc<RecordingBackend>,
        pub bus: Arc<InMemoryEventBus>,
    }

    pub fn doubles() -> Doubles {
        doubles_with(Ok(location()), Ok(OUTBOUND_IP))
    }

    pub fn doubles_with(
        location: Result<Location, ResolveError>,
        outbound: Result<IpAddr, ResolveError>,
    ) -> Doubles {
        let nat = Arc::new(RecordingNat::default());
        let backend = Arc::new(RecordingBackend::default());
        let bus = Arc::new(InMemoryEventBus::new());
        Doubles {
            deps: FactoryDependencies {
                location_resolver: Arc::new(FixedLocation(location)),
                ip_resolver: Arc::new(FixedIp(outbound)),
                nat_service: nat.clone(),
                mapping_backend: backend.clone(),
                publisher: bus.clone(),
            },
            nat,
            backend,
            bus,
        }
    }
}
