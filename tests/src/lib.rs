//! # Provider Node Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (port pool, mapper, registry)
//! └── src/
//!     └── integration/  # Cross-crate flows and end-to-end choreography
//!         ├── doubles.rs
//!         ├── flows.rs
//!         └── e2e_choreography.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pn-tests
//!
//! # By category
//! cargo test -p pn-tests integration::flows
//! cargo test -p pn-tests integration::e2e_choreography
//!
//! # Benchmarks
//! cargo bench -p pn-tests
//! ```

#![allow(unused_variables)]
#![allow(dead_code)]

pub mod integration;
