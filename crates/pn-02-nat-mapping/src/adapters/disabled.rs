use async_trait::async_trait;

use crate::domain::errors::NatError;
use crate::domain::mapper::MappingRequest;
use crate::ports::MappingBackend;

/// Backend used when port mapping is switched off in the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl MappingBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn map(&self, _request: &MappingRequest) -> Result<(), NatError> {
        Err(NatError::Disabled)
    }

    async fn unmap(&self, _request: &MappingRequest) -> Result<(), NatError> {
        Err(NatError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::TransportProtocol;
    use std::net::{IpAddr, Ipv4Addr};

    #[tokio::test]
    async fn test_disabled_backend_refuses() {
        let request = MappingRequest {
            protocol: TransportProtocol::Tcp,
            port: 1194,
            internal_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            lease_secs: 0,
            label: "test".into(),
        };
        assert_eq!(DisabledBackend.map(&request).await, Err(NatError::Disabled));
        assert_eq!(DisabledBackend.unmap(&request).await, Err(NatError::Disabled));
    }
}
