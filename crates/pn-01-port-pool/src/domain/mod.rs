//! Domain layer of the port pool: pool kinds, leases and errors.

pub mod errors;
pub mod pool;
