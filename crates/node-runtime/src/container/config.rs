//! # Node Configuration
//!
//! Unified configuration for every subsystem of the provider node.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file named by `PN_CONFIG`
//! 3. `PN_*` environment overrides
//!
//! ## Security Requirements
//!
//! - `signer_secret` MUST NOT be left empty in production

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pn_04_session::SessionSettings;
use serde::Deserialize;
use shared_types::{
    Identity, OpenvpnOptions, PortRange, ServiceOptions, TransportProtocol, WireguardOptions,
    NOOP_SERVICE_TYPE, OPENVPN_SERVICE_TYPE, WIREGUARD_SERVICE_TYPE,
};
use thiserror::Error;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "PN_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub identity: IdentityConfig,
    pub location: LocationConfig,
    pub openvpn: OpenvpnConfig,
    pub wireguard: WireguardConfig,
    pub nat: NatConfig,
    pub payments: PaymentsConfig,
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
}

impl NodeConfig {
    /// Load defaults, then `PN_CONFIG` if set, then environment overrides.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed files and unparsable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections and keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `PN_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] when an override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("PN_PROVIDER_ID") {
            self.identity.provider_id = id;
        }
        if let Some(secret) = lookup("PN_SIGNER_SECRET") {
            self.identity.signer_secret = secret;
        }
        if let Some(level) = lookup("PN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(ports) = lookup("PN_WIREGUARD_PORTS") {
            self.wireguard.ports = ports;
        }
        if let Some(port) = lookup("PN_OPENVPN_PORT") {
            self.openvpn.port = parse_value("PN_OPENVPN_PORT", &port)?;
        }
        if let Some(enabled) = lookup("PN_UPNP_ENABLED") {
            self.nat.upnp_enabled = parse_value("PN_UPNP_ENABLED", &enabled)?;
        }
        if let Some(disabled) = lookup("PN_PAYMENTS_DISABLED") {
            self.payments.disabled = parse_value("PN_PAYMENTS_DISABLED", &disabled)?;
        }
        if let Some(services) = lookup("PN_SERVICES") {
            self.services.enabled = split_list(&services);
        }
        Ok(())
    }

    /// Reject values the node cannot start with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidProviderId`] for a malformed provider address
    /// - [`ConfigError::InvalidPortRange`] for an inverted or zero range
    /// - [`ConfigError::UnknownService`] for an unsupported service type
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider_identity()?;
        self.wireguard.port_range()?;
        self.services.allow_list()?;
        let known = [OPENVPN_SERVICE_TYPE, WIREGUARD_SERVICE_TYPE, NOOP_SERVICE_TYPE];
        if let Some(unknown) = self
            .services
            .enabled
            .iter()
            .find(|s| !known.contains(&s.as_str()))
        {
            return Err(ConfigError::UnknownService(unknown.clone()));
        }
        Ok(())
    }

    /// Validate for production readiness: everything [`validate`](Self::validate)
    /// checks plus a non-empty signer secret.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InsecureSignerSecret`] or any [`validate`](Self::validate) error.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.identity.signer_secret.is_empty() {
            return Err(ConfigError::InsecureSignerSecret);
        }
        Ok(())
    }

    /// The provider identity all services are offered under.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidProviderId`] for a malformed address.
    pub fn provider_identity(&self) -> Result<Identity, ConfigError> {
        self.identity
            .provider_id
            .parse()
            .map_err(|_| ConfigError::InvalidProviderId(self.identity.provider_id.clone()))
    }

    /// Start options for `service_type` built from this configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownService`] or an invalid WireGuard port range.
    pub fn service_options(&self, service_type: &str) -> Result<ServiceOptions, ConfigError> {
        match service_type {
            OPENVPN_SERVICE_TYPE => Ok(ServiceOptions::Openvpn(OpenvpnOptions {
                protocol: self.openvpn.protocol,
                port: self.openvpn.port,
                subnet: self.openvpn.subnet.clone(),
                netmask: self.openvpn.netmask.clone(),
            })),
            WIREGUARD_SERVICE_TYPE => Ok(ServiceOptions::Wireguard(WireguardOptions {
                ports: self.wireguard.port_range()?,
                subnet: self.wireguard.subnet.clone(),
                connect_delay_ms: self.wireguard.connect_delay_ms,
            })),
            NOOP_SERVICE_TYPE => Ok(ServiceOptions::Noop),
            other => Err(ConfigError::UnknownService(other.to_string())),
        }
    }

    /// Session limits shared by every service.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_sessions_per_dialog: self.services.max_sessions_per_dialog,
            ping_timeout: Duration::from_secs(self.services.ping_timeout_secs),
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("malformed config: {0}")]
    Parse(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("provider id {0:?} is not a 0x-prefixed 20-byte address")]
    InvalidProviderId(String),

    #[error("invalid port range {0:?}, expected \"lo:hi\" with 0 < lo <= hi")]
    InvalidPortRange(String),

    #[error("unknown service type {0:?}")]
    UnknownService(String),

    #[error(
        "SECURITY VIOLATION: signer secret is empty. \
         Set PN_SIGNER_SECRET environment variable or provide in config."
    )]
    InsecureSignerSecret,
}

/// Provider identity and dialog signing key.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Provider address, `0x` + 40 hex digits.
    pub provider_id: String,
    /// Node secret the dialog signing keys are derived from.
    pub signer_secret: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider_id: "0x0000000000000000000000000000000000000001".to_string(),
            signer_secret: String::new(),
        }
    }
}

/// Location reported in proposals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Public IP; the outbound IP is used when unset.
    pub public_ip: Option<IpAddr>,
    pub continent: String,
    pub country: String,
    pub city: String,
    pub asn: u32,
    pub isp: String,
    pub node_type: String,
    /// Address the outbound IP resolver routes towards. Nothing is sent.
    pub outbound_probe: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            public_ip: None,
            continent: String::new(),
            country: String::new(),
            city: String::new(),
            asn: 0,
            isp: String::new(),
            node_type: "residential".to_string(),
            outbound_probe: "8.8.8.8:53".to_string(),
        }
    }
}

/// OpenVPN settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenvpnConfig {
    pub binary_path: PathBuf,
    pub protocol: TransportProtocol,
    /// `0` lets the node pick a free port.
    pub port: u16,
    pub subnet: String,
    pub netmask: String,
}

impl Default for OpenvpnConfig {
    fn default() -> Self {
        let options = OpenvpnOptions::default();
        Self {
            binary_path: PathBuf::from("openvpn"),
            protocol: options.protocol,
            port: options.port,
            subnet: options.subnet,
            netmask: options.netmask,
        }
    }
}

/// WireGuard settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WireguardConfig {
    /// `"lo:hi"`; empty for dynamic ports.
    pub ports: String,
    pub subnet: String,
    pub connect_delay_ms: u64,
}

impl WireguardConfig {
    /// Parsed listening port range, unspecified when `ports` is empty.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidPortRange`] for malformed input.
    pub fn port_range(&self) -> Result<PortRange, ConfigError> {
        if self.ports.trim().is_empty() {
            return Ok(PortRange::default());
        }
        self.ports
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPortRange(self.ports.clone()))
    }
}

impl Default for WireguardConfig {
    fn default() -> Self {
        let options = WireguardOptions::default();
        Self {
            ports: String::new(),
            subnet: options.subnet,
            connect_delay_ms: options.connect_delay_ms,
        }
    }
}

/// NAT traversal settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatConfig {
    /// Map service ports on the gateway via UPnP.
    pub upnp_enabled: bool,
    /// Gateway discovery timeout in seconds.
    pub discovery_timeout_secs: u64,
}

impl Default for NatConfig {
    fn default() -> Self {
        Self {
            upnp_enabled: true,
            discovery_timeout_secs: 5,
        }
    }
}

/// Payments settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Serve sessions without requiring payment.
    pub disabled: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which services start with the node and who may use them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Service types started at boot.
    pub enabled: Vec<String>,
    /// Consumer addresses allowed to open dialogs; empty allows everyone.
    pub access_policy: Vec<String>,
    pub max_sessions_per_dialog: usize,
    pub ping_timeout_secs: u64,
}

impl ServicesConfig {
    /// Parsed allow-list.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidProviderId`] naming the first malformed address.
    pub fn allow_list(&self) -> Result<Vec<Identity>, ConfigError> {
        self.access_policy
            .iter()
            .map(|address| {
                address
                    .parse()
                    .map_err(|_| ConfigError::InvalidProviderId(address.clone()))
            })
            .collect()
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        let settings = SessionSettings::default();
        Self {
            enabled: vec![WIREGUARD_SERVICE_TYPE.to_string()],
            access_policy: Vec::new(),
            max_sessions_per_dialog: settings.max_sessions_per_dialog,
            ping_timeout_secs: settings.ping_timeout.as_secs(),
        }
    }
}
