//! # Runtime Adapters
//!
//! Implementations of the node-level ports the subsystems consume.
//!
//! | Adapter | Port | Notes |
//! |---------|------|-------|
//! | `StaticLocationResolver` | `LocationResolver` | location from config, IP from config or outbound |
//! | `UdpOutboundIpResolver` | `IpResolver` | local address of a connected UDP socket |
//! | `HmacSignerFactory` | `SignerFactory` | HMAC-SHA256 keyed by node secret + identity |
//! | `NoopNatService` | `NatService` | records rules, touches no firewall |
//! | `LoggingNatPinger` | `NatPinger` | logs ping targets |
//! | `Noop*` | opaque payment and tracking ports | placeholders until settlement is wired |

pub mod collaborators;
pub mod location;
pub mod nat;
pub mod signer;

pub use collaborators::{
    NoopBlockchainHelper, NoopIdentityRegistry, NoopInvoiceStorage, NoopNatTracker,
    NoopPromiseStorage, NoopTransactor,
};
pub use location::{StaticLocationResolver, UdpOutboundIpResolver};
pub use nat::{LoggingNatPinger, NoopNatService};
pub use signer::{HmacSigner, HmacSignerFactory};
