//! # Integration Tests
//!
//! `flows` drives the service crates directly with in-process doubles;
//! `e2e_choreography` boots a whole node through `node-runtime` and talks to
//! it as a consumer over the in-memory dialog transport.

pub mod doubles;
pub mod e2e_choreography;
pub mod flows;
