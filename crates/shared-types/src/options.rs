//! # Service Options
//!
//! Protocol-specific configuration handed to a service factory. The options
//! form a closed sum type: a factory narrows to its own variant and rejects
//! the rest with a configuration error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{NOOP_SERVICE_TYPE, OPENVPN_SERVICE_TYPE, WIREGUARD_SERVICE_TYPE};
use crate::errors::OptionsError;

/// Transport protocol used by a tunnel and its port mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransportProtocol {
    /// UDP transport.
    #[default]
    Udp,
    /// TCP transport.
    Tcp,
}

impl TransportProtocol {
    /// Protocol name as used by port mapping gateways.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportProtocol {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            other => Err(OptionsError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Closed range of ports, `start..=end`.
///
/// The zero range (`0:0`) means "not specified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PortRange {
    /// First port of the range.
    pub start: u16,
    /// Last port of the range (inclusive).
    pub end: u16,
}

impl PortRange {
    /// Create a range, validating `0 < start <= end`.
    pub fn new(start: u16, end: u16) -> Result<Self, OptionsError> {
        if start == 0 || start > end {
            return Err(OptionsError::InvalidPortRange(format!("{start}:{end}")));
        }
        Ok(Self { start, end })
    }

    /// Whether an explicit range was configured.
    #[must_use]
    pub fn is_specified(&self) -> bool {
        self.start > 0 && self.end >= self.start
    }

    /// Whether `port` lies inside the range.
    #[must_use]
    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    /// Number of ports in the range.
    #[must_use]
    pub fn capacity(&self) -> usize {
        if !self.is_specified() {
            return 0;
        }
        usize::from(self.end - self.start) + 1
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for PortRange {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidPortRange(s.to_string());
        let (lo, hi) = s.trim().split_once(':').ok_or_else(invalid)?;
        let lo: u16 = lo.trim().parse().map_err(|_| invalid())?;
        let hi: u16 = hi.trim().parse().map_err(|_| invalid())?;
        Self::new(lo, hi).map_err(|_| invalid())
    }
}

/// OpenVPN service options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenvpnOptions {
    /// Tunnel transport.
    pub protocol: TransportProtocol,
    /// Fixed listening port, `0` for a dynamically allocated one.
    pub port: u16,
    /// VPN subnet handed out to consumers.
    pub subnet: String,
    /// Netmask of the VPN subnet.
    pub netmask: String,
}

impl Default for OpenvpnOptions {
    fn default() -> Self {
        Self {
            protocol: TransportProtocol::Udp,
            port: 0,
            subnet: "10.8.0.0".to_string(),
            netmask: "255.255.255.0".to_string(),
        }
    }
}

/// WireGuard service options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireguardOptions {
    /// Fixed listening port range; unspecified means dynamic ports.
    pub ports: PortRange,
    /// VPN subnet handed out to consumers.
    pub subnet: String,
    /// Delay the consumer should wait before connecting, in milliseconds.
    pub connect_delay_ms: u64,
}

impl Default for WireguardOptions {
    fn default() -> Self {
        Self {
            ports: PortRange::default(),
            subnet: "10.182.0.0/16".to_string(),
            connect_delay_ms: 2000,
        }
    }
}

/// Protocol-specific options of a service start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceOptions {
    /// Options for an OpenVPN service.
    Openvpn(OpenvpnOptions),
    /// Options for a WireGuard service.
    Wireguard(WireguardOptions),
    /// The no-op service takes no options.
    Noop,
}

impl ServiceOptions {
    /// Service type identifier these options belong to.
    #[must_use]
    pub fn service_type(&self) -> &'static str {
        match self {
            Self::Openvpn(_) => OPENVPN_SERVICE_TYPE,
            Self::Wireguard(_) => WIREGUARD_SERVICE_TYPE,
            Self::Noop => NOOP_SERVICE_TYPE,
        }
    }
}
