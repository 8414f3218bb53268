//! Domain layer of the services subsystem.

pub mod errors;
pub mod location;
