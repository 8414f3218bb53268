use pn_01_port_pool::PortPoolError;
use shared_types::{NatServiceError, ResolveError};
use thiserror::Error;

/// Errors from service factories and running services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// No factory is registered for the service type.
    #[error("unsupported service type {requested:?}, supported: {supported:?}")]
    UnsupportedServiceType {
        requested: String,
        supported: Vec<String>,
    },

    /// The factory received options of another protocol.
    #[error("{expected} factory received {actual} options")]
    OptionsMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Location or outbound IP could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A protocol precondition does not hold on this host.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// No port could be allocated.
    #[error(transparent)]
    PortPool(#[from] PortPoolError),

    /// Host NAT forwarding could not be configured.
    #[error(transparent)]
    Nat(#[from] NatServiceError),

    /// The service was stopped before or while serving.
    #[error("service stopped")]
    Stopped,
}
