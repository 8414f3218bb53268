//! Requests a consumer sends over an established dialog.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::SessionId;
use tokio::sync::oneshot;
use tracing::debug;

use super::errors::DialogError;

/// Signature produced by a [`Signer`](crate::ports::Signer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Connectivity report a consumer sends after trying to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityStatus {
    pub code: u32,
    pub message: String,
}

/// Consumer-to-provider request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogRequest {
    /// Start a session, negotiating the tunnel configuration.
    CreateSession {
        config: Value,
        ping_target: Option<SocketAddr>,
    },
    /// End a session created over this dialog.
    DestroySession { session_id: SessionId },
    /// Report connectivity of a session.
    ConnectivityStatus {
        session_id: SessionId,
        status: ConnectivityStatus,
    },
}

/// Provider-to-consumer reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogResponse {
    SessionCreated {
        session_id: SessionId,
        config: Value,
        payments_required: bool,
    },
    SessionDestroyed,
    Acknowledged,
}

/// One-shot reply channel of a request.
#[derive(Debug)]
pub struct Responder(oneshot::Sender<Result<DialogResponse, DialogError>>);

impl Responder {
    #[must_use]
    pub fn new(sender: oneshot::Sender<Result<DialogResponse, DialogError>>) -> Self {
        Self(sender)
    }

    /// Send the reply. A consumer that already left is not an error.
    pub fn respond(self, result: Result<DialogResponse, DialogError>) {
        if self.0.send(result).is_err() {
            debug!("[pn-03] Consumer left before the reply was sent");
        }
    }
}

/// A request together with the channel its reply goes to.
#[derive(Debug)]
pub struct IncomingRequest {
    pub request: DialogRequest,
    pub responder: Responder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_displays_as_hex() {
        assert_eq!(Signature(vec![0x0a, 0xff, 0x00]).to_string(), "0aff00");
        assert_eq!(Signature(Vec::new()).to_string(), "");
    }
}
