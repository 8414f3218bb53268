//! # Dialog Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Accepts session-establishment dialogs from consumers on a channel scoped
//! to one `(provider, service type)` pair, and authorizes every attempt
//! against an identity allow-list before any handler sees it.
//!
//! ```text
//!  consumer ──dial(channel)──→ DialogTransport ──→ DialogListener
//!                                                     │ accept()
//!                                                     ▼
//!                                             DialogWaiter (one task per attempt)
//!                                                     │ validator.validate(peer)
//!                                    ┌────────────────┴───────────────┐
//!                                    ▼ Err                            ▼ Ok
//!                        pending.reject(IdentityNotAllowed)   handler.handle(dialog)
//! ```
//!
//! ## Access Policy
//!
//! | Allow-list | Peer | Result |
//! |------------|------|--------|
//! | empty | any | accepted |
//! | `{A, ..}` | `A` | accepted |
//! | `{A, ..}` | not listed | `IdentityNotAllowed` |
//!
//! A rejected attempt is answered with the error and leaves no state behind.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod memory;
pub mod ports;
pub mod service;

pub use domain::channel::ChannelKey;
pub use domain::errors::DialogError;
pub use domain::messages::{
    ConnectivityStatus, DialogRequest, DialogResponse, IncomingRequest, Responder, Signature,
};
pub use domain::validator::{AllowListValidator, PeerValidator};
pub use memory::{ConsumerDialog, InMemoryTransport};
pub use ports::{
    Dialog, DialogHandler, DialogListener, DialogTransport, PendingDialog, Signer, SignerFactory,
};
pub use service::waiter::DialogWaiter;
