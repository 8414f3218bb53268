//! # Node Runtime Library
//!
//! Composition root and service lifecycle of the provider node. The main
//! entry point is the `main.rs` binary; the modules are exposed for tests.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and the node-level collaborators
//! - `adapters/` - port implementations (resolvers, signer, NAT)
//! - `wiring/` - bootstrap chain and per-service dialog factories
//! - `manager` - starts and stops services

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod manager;
pub mod wiring;

pub use container::{ConfigError, NodeConfig, NodeContainer};
pub use manager::{ManagerError, ServiceInfo, ServicesManager, StartRequest};
pub use wiring::{bootstrap_services, ServiceComponents};
