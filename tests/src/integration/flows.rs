//! # Integration Test Flows
//!
//! Exercises the service crates together, without the node runtime:
//!
//! 1. **Registry → factory → proposal**: the proposal mirrors the resolved location
//! 2. **WireGuard factory → port pool → NAT mapper**: configured ranges and UDP hooks
//! 3. **Dialog waiter → allow-list**: unlisted consumers never reach the handler
//! 4. **Service status → cleaner → session storage**: stopped services lose their sessions

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::timeout;

    use pn_01_port_pool::PoolKind;
    use pn_02_nat_mapping::DEFAULT_LEASE_SECS;
    use pn_03_dialog::{
        AllowListValidator, ChannelKey, Dialog, DialogError, DialogHandler, DialogResponse,
        DialogWaiter, InMemoryTransport,
    };
    use pn_04_session::{Session, SessionStorage, StorageMemory};
    use pn_05_services::{
        NoopServiceFactory, Service, ServiceCleaner, ServiceError, ServiceFactory,
        ServiceRegistry, WireguardServiceFactory, WIREGUARD_MAPPING_LABEL,
    };
    use shared_bus::{EventPublisher, NodeEvent};
    use shared_types::{
        PortRange, ResolveError, ServiceDefinition, ServiceId, ServiceOptions, ServiceProposal,
        ServiceState, SessionId, TransportProtocol, WireguardOptions,
    };

    use crate::integration::doubles::{identity, location, Harness, PlainSigner, OUTBOUND_IP};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn wireguard(ports: &str) -> ServiceOptions {
        ServiceOptions::Wireguard(WireguardOptions {
            ports: ports.parse().unwrap(),
            ..WireguardOptions::default()
        })
    }

    /// Counts dialogs and acknowledges every request.
    #[derive(Default)]
    struct CountingHandler {
        dialogs: AtomicUsize,
    }

    #[async_trait]
    impl DialogHandler for CountingHandler {
        async fn handle(&self, mut dialog: Box<dyn Dialog>) -> Result<(), DialogError> {
            self.dialogs.fetch_add(1, Ordering::SeqCst);
            while let Some(incoming) = dialog.next_request().await {
                incoming.responder.respond(Ok(DialogResponse::Acknowledged));
            }
            Ok(())
        }
    }

    /// Factory that counts how often it ran, delegating to the noop factory.
    struct CountingFactory {
        calls: AtomicUsize,
        inner: NoopServiceFactory,
    }

    #[async_trait]
    impl ServiceFactory for CountingFactory {
        async fn create(
            &self,
            options: ServiceOptions,
        ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create(options).await
        }
    }

    // =============================================================================
    // REGISTRY AND FACTORIES
    // =============================================================================

    #[tokio::test]
    async fn test_noop_proposal_mirrors_location() {
        let harness = Harness::new();
        let registry = ServiceRegistry::new();
        registry.register("noop", Arc::new(NoopServiceFactory::new(harness.deps.clone())));

        let (service, proposal) = registry.create("noop", ServiceOptions::Noop).await.unwrap();

        let expected = location();
        assert_eq!(service.service_type(), "noop");
        assert_eq!(proposal.service_type, "noop");
        assert_eq!(proposal.service_definition, ServiceDefinition::Noop);
        assert_eq!(proposal.location.country, expected.country);
        assert_eq!(proposal.location.city, expected.city);
        assert_eq!(proposal.location.asn, expected.asn);
        assert_eq!(proposal.location.isp, expected.isp);
        assert_eq!(proposal.location.node_type, expected.node_type);
        assert!(proposal.provider_id.is_none());
    }

    #[tokio::test]
    async fn test_registry_last_registration_wins() {
        let harness = Harness::new();
        let registry = ServiceRegistry::new();
        let first = Arc::new(CountingFactory {
            calls: AtomicUsize::new(0),
            inner: NoopServiceFactory::new(harness.deps.clone()),
        });
        let second = Arc::new(CountingFactory {
            calls: AtomicUsize::new(0),
            inner: NoopServiceFactory::new(harness.deps.clone()),
        });

        registry.register("noop", first.clone());
        registry.register("noop", second.clone());
        registry.create("noop", ServiceOptions::Noop).await.unwrap();

        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.service_types(), vec!["noop".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_service_type_lists_supported() {
        let harness = Harness::new();
        let registry = ServiceRegistry::new();
        registry.register("noop", Arc::new(NoopServiceFactory::new(harness.deps.clone())));

        let err = registry
            .create("shadowsocks", ServiceOptions::Noop)
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            ServiceError::UnsupportedServiceType {
                requested: "shadowsocks".into(),
                supported: vec!["noop".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_location_failure_creates_nothing() {
        let harness = Harness::with_location(Err(ResolveError::Location("offline".into())));
        let factory = WireguardServiceFactory::new(harness.deps.clone());

        let err = factory.build(wireguard("51000:51005")).await.err().unwrap();
        assert!(matches!(err, ServiceError::Resolve(ResolveError::Location(_))));
        assert!(harness.nat.rules.lock().is_empty());
        assert_eq!(harness.bus.events_published(), 0);
    }

    // =============================================================================
    // WIREGUARD: PORT POOL AND NAT MAPPING
    // =============================================================================

    #[tokio::test]
    async fn test_wireguard_range_pool_and_udp_hook() {
        let harness = Harness::new();
        let factory = WireguardServiceFactory::new(harness.deps.clone());

        let (service, proposal) = factory.build(wireguard("51000:51005")).await.unwrap();

        let range = PortRange::new(51000, 51005).unwrap();
        assert_eq!(service.port_pool().kind(), PoolKind::FixedRange(range));
        assert_eq!(proposal.service_definition, ServiceDefinition::Wireguard);

        let hook = service.port_mapper().build(51003);
        assert_eq!(hook.protocol(), TransportProtocol::Udp);
        assert_eq!(hook.port(), 51003);
        assert_eq!(hook.request().label, WIREGUARD_MAPPING_LABEL);
        assert_eq!(hook.request().internal_ip, OUTBOUND_IP);
        assert!(hook.is_required());
        // Building hooks never talks to the gateway.
        assert!(harness.gateway.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wireguard_session_port_lifecycle() {
        let harness = Harness::new();
        let factory = WireguardServiceFactory::new(harness.deps.clone());
        let (service, _) = factory.build(wireguard("51000:51001")).await.unwrap();
        let service = Arc::new(service);

        let serving = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.serve().await }
        });
        timeout(Duration::from_secs(1), async {
            while harness.nat.rules.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("NAT rule should be installed by serve");

        let negotiator = Arc::clone(&service).negotiator();
        let session = SessionId::generate();
        let config = negotiator
            .provide_config(&session, &json!({ "public_key": "consumer-key" }))
            .await
            .unwrap();

        let port = config["port"].as_u64().unwrap();
        assert!((51000..=51001).contains(&port));
        assert_eq!(config["consumer_public_key"], "consumer-key");
        {
            let requests = harness.gateway.requests.lock();
            assert_eq!(requests.len(), 1);
            assert_eq!(u64::from(requests[0].port), port);
            assert_eq!(requests[0].protocol, TransportProtocol::Udp);
            assert_eq!(requests[0].lease_secs, DEFAULT_LEASE_SECS);
        }
        assert_eq!(service.active_sessions(), 1);

        negotiator.release_config(&session).await;
        assert_eq!(service.active_sessions(), 0);
        assert_eq!(service.port_pool().leased(), 0);
        assert!(harness.gateway.requests.lock().is_empty());

        service.stop().await.unwrap();
        timeout(Duration::from_secs(1), serving)
            .await
            .expect("serve should return after stop")
            .unwrap()
            .unwrap();
        assert!(harness.nat.rules.lock().is_empty());
    }

    // =============================================================================
    // DIALOG WAITER: ALLOW-LIST
    // =============================================================================

    #[tokio::test]
    async fn test_waiter_allow_list_filters_consumers() {
        let transport = Arc::new(InMemoryTransport::new());
        let provider = identity(200);
        let waiter = DialogWaiter::new(
            transport.clone(),
            ChannelKey::new(&provider, "wireguard"),
            Arc::new(PlainSigner(provider.clone())),
            Arc::new(AllowListValidator::new([identity(1)])),
        );
        let handler = Arc::new(CountingHandler::default());
        waiter.serve(handler.clone()).await.unwrap();

        let rejected = transport.dial(identity(2), waiter.channel()).await.unwrap_err();
        assert_eq!(rejected, DialogError::IdentityNotAllowed(identity(2)));
        assert_eq!(handler.dialogs.load(Ordering::SeqCst), 0);

        let accepted = transport.dial(identity(1), waiter.channel()).await.unwrap();
        assert_eq!(accepted.provider(), &provider);
        let response = accepted
            .request(pn_03_dialog::DialogRequest::DestroySession {
                session_id: SessionId::generate(),
            })
            .await
            .unwrap();
        assert_eq!(response, DialogResponse::Acknowledged);
        assert_eq!(handler.dialogs.load(Ordering::SeqCst), 1);

        waiter.stop().await;
        assert!(!transport.is_listening(waiter.channel()));
    }

    // =============================================================================
    // CLEANER: SESSION PURGE ON SERVICE STOP
    // =============================================================================

    #[tokio::test]
    async fn test_cleaner_purges_sessions_of_stopped_service() {
        let harness = Harness::new();
        let storage = Arc::new(StorageMemory::new());
        let stopped = ServiceId::generate();
        let running = ServiceId::generate();
        for (service_id, consumer) in [(stopped, 1), (stopped, 2), (running, 3)] {
            storage
                .add(Session::new(
                    SessionId::generate(),
                    service_id,
                    "wireguard",
                    identity(consumer),
                    json!({}),
                ))
                .await;
        }

        let subscription = Arc::new(ServiceCleaner::new(storage.clone()))
            .subscribe(&harness.bus)
            .unwrap();

        // Statuses other than NotRunning leave storage alone.
        harness
            .bus
            .publish(NodeEvent::ServiceStatus {
                service_id: running,
                provider_id: identity(200),
                service_type: "wireguard".into(),
                status: ServiceState::Running,
            })
            .await;
        harness
            .bus
            .publish(NodeEvent::ServiceStatus {
                service_id: stopped,
                provider_id: identity(200),
                service_type: "wireguard".into(),
                status: ServiceState::NotRunning,
            })
            .await;

        timeout(Duration::from_secs(1), async {
            while storage.get_all().len() != 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("cleaner should purge the stopped service");

        let remaining = storage.get_all();
        assert_eq!(remaining[0].service_id, running);
        subscription.cancel();
    }
}
