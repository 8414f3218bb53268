use std::net::IpAddr;

use thiserror::Error;

/// Errors from NAT port mapping.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NatError {
    /// Port mapping is switched off in the node configuration.
    #[error("port mapping is disabled")]
    Disabled,

    /// No gateway answered the discovery request.
    #[error("gateway discovery failed: {0}")]
    Discovery(String),

    /// The gateway refused or failed to add the mapping.
    #[error("failed to map port {port}: {reason}")]
    Mapping { port: u16, reason: String },

    /// The gateway failed to remove the mapping.
    #[error("failed to unmap port {port}: {reason}")]
    Unmapping { port: u16, reason: String },

    /// IGD only forwards to IPv4 clients.
    #[error("cannot map to non-IPv4 address {0}")]
    UnsupportedAddress(IpAddr),
}
