//! Domain layer of the session subsystem.

pub mod errors;
pub mod session;
