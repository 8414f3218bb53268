//! # Session Subsystem
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Serves accepted dialogs: every dialog gets a fresh session manager built
//! by a [`SessionManagerFactory`], and every session request is negotiated
//! through the service's [`ConfigNegotiator`].
//!
//! ```text
//! DialogWaiter ──accepted dialog──→ SessionDialogHandler
//!                                        │ factory.create(peer)      (one manager per dialog)
//!                                        ▼
//!                                   SessionManager ──provide_config──→ service
//!                                        │
//!                                        ▼
//!                                 EventBasedStorage ──SessionEvent──→ bus
//! ```
//!
//! ## Rules
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | managers are never shared across dialogs | `SessionDialogHandler::handle` |
//! | only the creating consumer may destroy a session | `NodeSessionManager::destroy` |
//! | closing a dialog destroys its sessions | `SessionDialogHandler::handle` |
//! | node collaborators are captured once | `NodeSessionManagerFactory::new` |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod service;
pub mod storage;

pub use domain::errors::SessionError;
pub use domain::session::{Session, SessionSettings, SessionStart};
pub use ports::{ConfigNegotiator, SessionManager, SessionManagerFactory};
pub use service::factory::{NodeSessionManagerFactory, SessionDependencies};
pub use service::handler::SessionDialogHandler;
pub use service::manager::NodeSessionManager;
pub use storage::connectivity::{ConnectivityEntry, ConnectivityStorage, StatusSubscriber};
pub use storage::event_based::EventBasedStorage;
pub use storage::memory::StorageMemory;
pub use storage::SessionStorage;
