//! # Node Container
//!
//! Composition root of the provider node: configuration plus every
//! node-level collaborator, built once at process start. Components receive
//! only the narrow trait objects they need from here.

pub mod config;
pub mod node;

pub use config::{ConfigError, NodeConfig};
pub use node::NodeContainer;
