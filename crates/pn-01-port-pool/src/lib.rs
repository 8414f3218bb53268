//! # Port Pool Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Supplies listening ports to tunnel services. A pool is created fresh for
//! every service instance and never shared across instances.
//!
//! | Kind | `next()` |
//! |------|----------|
//! | `Fixed(p)` | always `p`, unlimited |
//! | `FixedRange(lo, hi)` | a port in `lo..=hi` not currently leased, `Exhausted` otherwise |
//! | `Dynamic(range)` | a port in `range` not leased and currently unbound on the host |
//!
//! ## Leases
//!
//! Every allocation is a [`PortLease`]. Dropping the lease returns the port
//! to the pool, so two live leases drawn from one range pool never share a
//! port.
//!
//! ```text
//! PortPool::next() ──→ PortLease(port) ──drop──→ port free again
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;

pub use domain::errors::PortPoolError;
pub use domain::pool::{PoolKind, PortLease, PortPool, DEFAULT_DYNAMIC_RANGE, MAX_DYNAMIC_ATTEMPTS};
pub use ports::{PortProbe, UdpProbe};
