//! Domain layer of the dialog subsystem.

pub mod channel;
pub mod errors;
pub mod messages;
pub mod validator;
