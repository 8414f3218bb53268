//! Outbound port: the gateway that performs the mapping.

use async_trait::async_trait;

use crate::domain::errors::NatError;
use crate::domain::mapper::MappingRequest;

/// A NAT gateway able to forward external ports to this node.
#[async_trait]
pub trait MappingBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Add or refresh the mapping described by `request`.
    async fn map(&self, request: &MappingRequest) -> Result<(), NatError>;

    /// Remove the mapping described by `request`.
    async fn unmap(&self, request: &MappingRequest) -> Result<(), NatError>;
}
