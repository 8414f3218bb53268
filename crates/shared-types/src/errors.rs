//! # Error Types
//!
//! Defines error types shared across subsystems.

use thiserror::Error;

/// Errors raised by location and IP resolvers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Geographic location could not be detected.
    #[error("location resolution failed: {0}")]
    Location(String),

    /// Outbound IP address could not be detected.
    #[error("outbound IP resolution failed: {0}")]
    OutboundIp(String),
}

/// Errors parsing identities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Address is not a `0x`-prefixed 20-byte hex string.
    #[error("malformed identity address: {0}")]
    MalformedAddress(String),
}

/// Errors parsing service options.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// Port range string is not `lo:hi` or its bounds are invalid.
    #[error("invalid port range {0:?}: expected \"lo:hi\" with 0 < lo <= hi")]
    InvalidPortRange(String),

    /// Transport protocol is neither UDP nor TCP.
    #[error("unknown transport protocol: {0}")]
    UnknownProtocol(String),
}

/// Errors from the NAT forwarding service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NatServiceError {
    /// Forwarding rules could not be applied.
    #[error("NAT forwarding error: {0}")]
    Forwarding(String),
}
