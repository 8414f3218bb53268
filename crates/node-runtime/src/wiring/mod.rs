//! # Service Wiring
//!
//! Connects the subsystems at process start.
//!
//! ```text
//! NodeContainer ──→ bootstrap_services ──→ ServiceRegistry ←── factories
//!                          │
//!                          ├──→ EventBasedStorage ←──bus── SessionDataTransferred
//!                          ├──→ ServiceCleaner   ←──bus── ServiceStatus(NotRunning)
//!                          └──→ ServicesManager
//!                                   ├── DialogWaiterFactory  (per service)
//!                                   └── DialogHandlerFactory (per service)
//! ```

pub mod bootstrap;
pub mod dialog;

pub use bootstrap::{bootstrap_service_components, bootstrap_services, ServiceComponents};
pub use dialog::{DialogHandlerFactory, DialogWaiterFactory};
