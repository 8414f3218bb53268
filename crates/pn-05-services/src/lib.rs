//! # Services Subsystem
//!
//! **Subsystem ID:** 5
//!
//! ## Purpose
//!
//! Turns a start request into a running service plus its proposal. One
//! [`ServiceFactory`] per protocol is registered in the [`ServiceRegistry`];
//! [`ServiceFactory`] is the only thing a new protocol has to implement.
//!
//! ## Factory Algorithm
//!
//! ```text
//! [openvpn: check()] → resolve location → resolve outbound IP → narrow options
//!        → pick PortPool → build NatPortMapper → build proposal → build service
//! ```
//!
//! | Protocol | Explicit port selector | Pool | Mapping protocol |
//! |----------|------------------------|------|------------------|
//! | openvpn | `port != 0` | `Fixed` / `Dynamic` | configured transport |
//! | wireguard | `ports.is_specified()` | `FixedRange` / `Dynamic` | UDP |
//! | noop | none | none | none |
//!
//! Any resolver failure aborts the factory; no partially built service
//! escapes. The OpenVPN and WireGuard factories reject options of another
//! protocol with [`ServiceError::OptionsMismatch`]; noop ignores its options.
//!
//! ## Cleanup
//!
//! [`ServiceCleaner`] listens for service status events and purges the
//! session storage of every service that reached `NotRunning`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cleaner;
pub mod domain;
pub mod ports;
pub mod protocols;
pub mod registry;

pub use cleaner::ServiceCleaner;
pub use domain::errors::ServiceError;
pub use domain::location::ServiceLocationInfo;
pub use ports::{Service, ServiceFactory};
pub use protocols::noop::{NoopService, NoopServiceFactory};
pub use protocols::openvpn::{
    OpenvpnNodeOptions, OpenvpnService, OpenvpnServiceFactory, OPENVPN_MAPPING_LABEL,
};
pub use protocols::wireguard::{WireguardService, WireguardServiceFactory, WIREGUARD_MAPPING_LABEL};
pub use protocols::{FactoryDependencies, MAPPING_TIMEOUT};
pub use registry::ServiceRegistry;
