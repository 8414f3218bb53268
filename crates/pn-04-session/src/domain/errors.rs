use shared_types::{Identity, SessionId};
use thiserror::Error;

/// Errors from session management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The service could not produce a configuration for the consumer.
    #[error("config negotiation failed: {0}")]
    ConfigNegotiation(String),

    /// No such session.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session belongs to another consumer.
    #[error("session {session_id} is not owned by {peer}")]
    NotOwner { session_id: SessionId, peer: Identity },

    /// The dialog already holds the maximum number of sessions.
    #[error("session limit of {0} per dialog reached")]
    TooManySessions(usize),
}
