//! No-op service: a proposal and a session endpoint without a tunnel.

use std::sync::Arc;

use async_trait::async_trait;
use pn_04_session::{ConfigNegotiator, SessionError};
use serde_json::{json, Value};
use shared_types::{
    Location, ServiceDefinition, ServiceOptions, ServiceProposal, SessionId, NOOP_SERVICE_TYPE,
};
use tokio::sync::watch;
use tracing::info;

use super::{stopped, FactoryDependencies};
use crate::domain::errors::ServiceError;
use crate::ports::{Service, ServiceFactory};

/// Builds no-op services. Needs only the location resolver.
pub struct NoopServiceFactory {
    deps: FactoryDependencies,
}

impl NoopServiceFactory {
    #[must_use]
    pub fn new(deps: FactoryDependencies) -> Self {
        Self { deps }
    }

    /// Build the concrete service and its proposal. Options are ignored.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Resolve`] when the location is unknown.
    pub async fn build(
        &self,
        _options: ServiceOptions,
    ) -> Result<(NoopService, ServiceProposal), ServiceError> {
        let location = self.deps.location_resolver.detect_location().await?;
        let proposal = ServiceProposal::new(NOOP_SERVICE_TYPE, &location, ServiceDefinition::Noop);
        let (shutdown, _) = watch::channel(false);
        Ok((NoopService { location, shutdown }, proposal))
    }
}

#[async_trait]
impl ServiceFactory for NoopServiceFactory {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError> {
        let (service, proposal) = self.build(options).await?;
        Ok((Arc::new(service), proposal))
    }
}

pub struct NoopService {
    location: Location,
    shutdown: watch::Sender<bool>,
}

impl NoopService {
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }
}

#[async_trait]
impl Service for NoopService {
    fn service_type(&self) -> &'static str {
        NOOP_SERVICE_TYPE
    }

    async fn serve(&self) -> Result<(), ServiceError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(ServiceError::Stopped);
        }
        info!("[pn-05] Noop service serving");
        stopped(&mut shutdown).await;
        info!("[pn-05] Noop service stopped");
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
impl ConfigNegotiator for NoopService {
    async fn provide_config(
        &self,
        _session_id: &SessionId,
        _consumer_config: &Value,
    ) -> Result<Value, SessionError> {
        Ok(json!({}))
    }

    async fn release_config(&self, _session_id: &SessionId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::testing::{doubles, doubles_with, location};
    use shared_types::{OpenvpnOptions, ProposalLocation, ResolveError, WireguardOptions};
    use std::time::Duration;

    #[tokio::test]
    async fn test_proposal_mirrors_location() {
        let d = doubles();
        let (service, proposal) = NoopServiceFactory::new(d.deps)
            .build(ServiceOptions::Noop)
            .await
            .unwrap();

        assert_eq!(proposal.service_type, "noop");
        assert_eq!(proposal.location, ProposalLocation::from(&location()));
        assert_eq!(proposal.service_definition, ServiceDefinition::Noop);
        assert_eq!(service.location(), &location());
        assert!(d.backend.mapped.lock().is_empty());
    }

    #[tokio::test]
    async fn test_options_of_other_protocols_are_ignored() {
        let d = doubles();
        let factory = NoopServiceFactory::new(d.deps);
        for options in [
            ServiceOptions::Wireguard(WireguardOptions::default()),
            ServiceOptions::Openvpn(OpenvpnOptions::default()),
        ] {
            let (_, proposal) = factory.create(options).await.unwrap();
            assert_eq!(proposal.service_type, "noop");
            assert_eq!(proposal.service_definition, ServiceDefinition::Noop);
        }
    }

    #[tokio::test]
    async fn test_location_failure_aborts() {
        let d = doubles_with(
            Err(ResolveError::Location("offline".into())),
            Ok(crate::protocols::testing::OUTBOUND_IP),
        );
        let err = NoopServiceFactory::new(d.deps)
            .create(ServiceOptions::Noop)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServiceError::Resolve(ResolveError::Location(_))));
    }

    #[tokio::test]
    async fn test_serve_until_stopped() {
        let d = doubles();
        let (service, _) = NoopServiceFactory::new(d.deps)
            .build(ServiceOptions::Noop)
            .await
            .unwrap();
        let service = Arc::new(service);
        let runner = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.serve().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!runner.is_finished());

        service.stop().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Ok(()) | Err(ServiceError::Stopped)));
    }
}
