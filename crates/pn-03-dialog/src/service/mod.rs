//! Service layer of the dialog subsystem.

pub mod waiter;
