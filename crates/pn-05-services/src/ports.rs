//! Ports of the services subsystem.

use std::sync::Arc;

use async_trait::async_trait;
use pn_04_session::ConfigNegotiator;
use shared_types::{ServiceOptions, ServiceProposal};

use crate::domain::errors::ServiceError;

/// A runnable service instance.
#[async_trait]
pub trait Service: Send + Sync {
    fn service_type(&self) -> &'static str;

    /// Run until [`stop`](Self::stop) is called.
    async fn serve(&self) -> Result<(), ServiceError>;

    /// Ask a running `serve` to wind down.
    async fn stop(&self) -> Result<(), ServiceError>;

    /// The service's session configuration negotiator.
    fn negotiator(self: Arc<Self>) -> Arc<dyn ConfigNegotiator>;
}

/// Builds a service and its proposal from start options.
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    async fn create(
        &self,
        options: ServiceOptions,
    ) -> Result<(Arc<dyn Service>, ServiceProposal), ServiceError>;
}
