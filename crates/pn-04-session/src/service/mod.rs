//! Service layer of the session subsystem.

pub mod factory;
pub mod handler;
pub mod manager;
