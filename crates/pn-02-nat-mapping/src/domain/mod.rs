//! Domain layer of NAT port mapping.

pub mod errors;
pub mod mapper;
