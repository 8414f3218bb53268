//! # Shared Types Crate
//!
//! This crate contains all domain entities shared by the provider node
//! subsystems: identities, locations, service options, proposals and the
//! ports for collaborators that live outside this workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Typed options**: `ServiceOptions` is a sum type; a factory matches its
//!   own variant and reports a configuration error for any other.
//! - **Narrow ports**: External collaborators are traits in [`ports`], so each
//!   subsystem depends only on the capability it actually uses.

pub mod entities;
pub mod errors;
pub mod options;
pub mod ports;
pub mod proposal;

pub use entities::*;
pub use errors::*;
pub use options::*;
pub use proposal::*;
