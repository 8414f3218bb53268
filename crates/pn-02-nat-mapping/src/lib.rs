//! # NAT Port Mapping Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Gives a service a way to ask the NAT gateway for a port forward without
//! doing any network I/O at construction time.
//!
//! ```text
//! NatPortMapper::new(public_ip, outbound_ip, protocol, label)   (per service)
//!        │
//!        │ build(port)                     no I/O
//!        ▼
//! PortMappingHook ── invoke() ──→ MappingBackend::map()   (UPnP IGD)
//!                 ── release() ─→ MappingBackend::unmap()
//! ```
//!
//! ## Rules
//!
//! - When the public IP equals the outbound IP the node is not behind NAT and
//!   `invoke` returns [`MappingOutcome::NotRequired`] without any I/O.
//! - Invoking a hook again re-adds the mapping, which renews its lease.
//! - The mapper never retries; bounding and retrying is the caller's job.
//! - No lock is held while the backend talks to the gateway.
//! - Every attempt is published as a `NodeEvent::PortMapping` event.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{DisabledBackend, UpnpBackend};
pub use domain::errors::NatError;
pub use domain::mapper::{
    MappingOutcome, MappingRequest, NatPortMapper, PortMappingHook, DEFAULT_LEASE_SECS,
};
pub use ports::MappingBackend;
