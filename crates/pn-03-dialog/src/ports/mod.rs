//! Ports of the dialog subsystem.
//!
//! The transport and the signer are provided by the node; the handler is the
//! session layer that serves accepted dialogs.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::Identity;

use crate::domain::channel::ChannelKey;
use crate::domain::errors::DialogError;
use crate::domain::messages::{IncomingRequest, Signature};

// =============================================================================
// SIGNING
// =============================================================================

/// Signs on behalf of one local identity.
pub trait Signer: Send + Sync {
    fn identity(&self) -> &Identity;
    fn sign(&self, message: &[u8]) -> Signature;
}

/// Produces signers bound to local identities.
pub trait SignerFactory: Send + Sync {
    fn signer_for(&self, identity: &Identity) -> Arc<dyn Signer>;
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Channel-scoped listen primitive of the dialog transport.
#[async_trait]
pub trait DialogTransport: Send + Sync {
    /// Start listening on `channel`. Dropping the listener stops listening.
    async fn listen(
        &self,
        channel: &ChannelKey,
        signer: Arc<dyn Signer>,
    ) -> Result<Box<dyn DialogListener>, DialogError>;
}

/// Stream of inbound dialog attempts on one channel.
#[async_trait]
pub trait DialogListener: Send {
    /// Next attempt, or `None` once the transport closed the channel.
    async fn accept(&mut self) -> Option<Box<dyn PendingDialog>>;
}

/// An inbound attempt awaiting the provider's decision.
pub trait PendingDialog: Send {
    fn peer(&self) -> &Identity;

    /// Accept the attempt and open the dialog.
    fn accept(self: Box<Self>) -> Box<dyn Dialog>;

    /// Refuse the attempt, reporting `error` to the peer.
    fn reject(self: Box<Self>, error: DialogError);
}

/// An established dialog with one consumer.
#[async_trait]
pub trait Dialog: Send {
    fn peer(&self) -> &Identity;

    /// Next request, or `None` once the consumer closed the dialog.
    async fn next_request(&mut self) -> Option<IncomingRequest>;
}

// =============================================================================
// HANDLER
// =============================================================================

/// Serves an accepted dialog until it closes.
#[async_trait]
pub trait DialogHandler: Send + Sync {
    async fn handle(&self, dialog: Box<dyn Dialog>) -> Result<(), DialogError>;
}
