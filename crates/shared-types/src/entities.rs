//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Principals**: `Identity`
//! - **Lifecycle**: `ServiceId`, `SessionId`, `ServiceState`
//! - **Geography**: `Location`

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::IdentityError;

// =============================================================================
// SERVICE TYPES
// =============================================================================

/// Service type identifier of the OpenVPN protocol.
pub const OPENVPN_SERVICE_TYPE: &str = "openvpn";

/// Service type identifier of the WireGuard protocol.
pub const WIREGUARD_SERVICE_TYPE: &str = "wireguard";

/// Service type identifier of the no-op protocol (used for testing).
pub const NOOP_SERVICE_TYPE: &str = "noop";

// =============================================================================
// CLUSTER A: PRINCIPALS
// =============================================================================

/// An address-bearing principal (provider or consumer).
///
/// Addresses are lower-cased on construction, so equality is plain string
/// equality of the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    /// Hex address, `0x`-prefixed, lower case.
    pub address: String,
}

impl Identity {
    /// Build an identity from an address without validating its format.
    #[must_use]
    pub fn from_address(address: &str) -> Self {
        Self {
            address: address.trim().to_lowercase(),
        }
    }

    /// Whether the address looks like a 20-byte hex address.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.address.len() == 42
            && self.address.starts_with("0x")
            && self.address[2..].chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let identity = Self::from_address(s);
        if !identity.is_well_formed() {
            return Err(IdentityError::MalformedAddress(s.to_string()));
        }
        Ok(identity)
    }
}

// =============================================================================
// CLUSTER B: LIFECYCLE
// =============================================================================

/// Unique identifier of a started service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(pub Uuid);

impl ServiceId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a consumer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a service instance, as published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceState {
    /// Factory ran, service is being brought up.
    Starting,
    /// Service is serving consumers.
    Running,
    /// Service stopped (gracefully or after a failure).
    NotRunning,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::NotRunning => "NotRunning",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CLUSTER C: GEOGRAPHY
// =============================================================================

/// Geographic location of the node, as detected by a location resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Public IP address the node is seen from.
    pub ip: IpAddr,
    /// Two-letter continent code.
    pub continent: String,
    /// ISO country code.
    pub country: String,
    /// City name.
    pub city: String,
    /// Autonomous system number.
    pub asn: u32,
    /// Internet service provider name.
    pub isp: String,
    /// Node type, e.g. `residential` or `hosting`.
    pub node_type: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            continent: String::new(),
            country: String::new(),
            city: String::new(),
            asn: 0,
            isp: String::new(),
            node_type: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_ignores_case() {
        let a = Identity::from_address("0xABCDEF0000000000000000000000000000000001");
        let b = Identity::from_address("0xabcdef0000000000000000000000000000000001");
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_parse_rejects_malformed() {
        assert!("0x1234".parse::<Identity>().is_err());
        assert!("not-an-address".parse::<Identity>().is_err());
        assert!("0x0000000000000000000000000000000000000001"
            .parse::<Identity>()
            .is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
        assert_ne!(ServiceId::generate(), ServiceId::generate());
    }

    #[test]
    fn test_service_state_display() {
        assert_eq!(ServiceState::NotRunning.to_string(), "NotRunning");
    }
}
