//! # In-Memory Dialog Transport
//!
//! Process-local transport connecting consumers and waiters through tokio
//! channels. Used by the node when no broker is configured and by tests.
//!
//! ```text
//! dial(consumer, channel) ──Attempt──→ MemoryListener ──→ PendingDialog
//!        ▲                                                  │ accept / reject
//!        └──────────────── decision (oneshot) ──────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Identity;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::channel::ChannelKey;
use crate::domain::errors::DialogError;
use crate::domain::messages::{DialogRequest, DialogResponse, IncomingRequest, Responder, Signature};
use crate::ports::{Dialog, DialogListener, DialogTransport, PendingDialog, Signer};

const ATTEMPT_BUFFER: usize = 64;
const REQUEST_BUFFER: usize = 16;

struct Attempt {
    peer: Identity,
    decision: oneshot::Sender<Result<Accepted, DialogError>>,
}

struct Accepted {
    provider: Identity,
    signature: Signature,
    requests: mpsc::Sender<IncomingRequest>,
}

type Channels = Arc<Mutex<HashMap<ChannelKey, mpsc::Sender<Attempt>>>>;

/// Transport whose channels live in this process.
#[derive(Default, Clone)]
pub struct InMemoryTransport {
    channels: Channels,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a waiter listens on `channel`.
    #[must_use]
    pub fn is_listening(&self, channel: &ChannelKey) -> bool {
        self.channels
            .lock()
            .get(channel)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Open a dialog to the provider listening on `channel` as `consumer`.
    ///
    /// # Errors
    ///
    /// - [`DialogError::NoListener`] when nobody listens on the channel
    /// - the provider's rejection, e.g. [`DialogError::IdentityNotAllowed`]
    pub async fn dial(
        &self,
        consumer: Identity,
        channel: &ChannelKey,
    ) -> Result<ConsumerDialog, DialogError> {
        let sender = self
            .channels
            .lock()
            .get(channel)
            .cloned()
            .ok_or_else(|| DialogError::NoListener(channel.clone()))?;

        let (decision, decided) = oneshot::channel();
        sender
            .send(Attempt {
                peer: consumer,
                decision,
            })
            .await
            .map_err(|_| DialogError::NoListener(channel.clone()))?;

        let accepted = decided.await.map_err(|_| DialogError::TransportClosed)??;
        Ok(ConsumerDialog {
            provider: accepted.provider,
            signature: accepted.signature,
            requests: accepted.requests,
        })
    }
}

#[async_trait]
impl DialogTransport for InMemoryTransport {
    async fn listen(
        &self,
        channel: &ChannelKey,
        signer: Arc<dyn Signer>,
    ) -> Result<Box<dyn DialogListener>, DialogError> {
        let mut channels = self.channels.lock();
        if channels
            .get(channel)
            .is_some_and(|sender| !sender.is_closed())
        {
            return Err(DialogError::ChannelBusy(channel.clone()));
        }

        let (sender, attempts) = mpsc::channel(ATTEMPT_BUFFER);
        channels.insert(channel.clone(), sender.clone());
        debug!(channel = %channel, "[pn-03] Listening on in-memory channel");

        Ok(Box::new(MemoryListener {
            channel: channel.clone(),
            signer,
            attempts,
            sender,
            channels: Arc::clone(&self.channels),
        }))
    }
}

struct MemoryListener {
    channel: ChannelKey,
    signer: Arc<dyn Signer>,
    attempts: mpsc::Receiver<Attempt>,
    sender: mpsc::Sender<Attempt>,
    channels: Channels,
}

#[async_trait]
impl DialogListener for MemoryListener {
    async fn accept(&mut self) -> Option<Box<dyn PendingDialog>> {
        let attempt = self.attempts.recv().await?;
        Some(Box::new(MemoryPending {
            attempt,
            channel: self.channel.clone(),
            signer: Arc::clone(&self.signer),
        }))
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        let mut channels = self.channels.lock();
        if channels
            .get(&self.channel)
            .is_some_and(|sender| sender.same_channel(&self.sender))
        {
            channels.remove(&self.channel);
            debug!(channel = %self.channel, "[pn-03] Released in-memory channel");
        }
    }
}

struct MemoryPending {
    attempt: Attempt,
    channel: ChannelKey,
    signer: Arc<dyn Signer>,
}

impl PendingDialog for MemoryPending {
    fn peer(&self) -> &Identity {
        &self.attempt.peer
    }

    fn accept(self: Box<Self>) -> Box<dyn Dialog> {
        let (requests, incoming) = mpsc::channel(REQUEST_BUFFER);
        let signature = self.signer.sign(self.channel.as_str().as_bytes());
        debug!(
            channel = %self.channel,
            signature = %signature,
            "[pn-03] Signed channel for consumer"
        );
        let accepted = Accepted {
            provider: self.signer.identity().clone(),
            signature,
            requests,
        };
        if self.attempt.decision.send(Ok(accepted)).is_err() {
            debug!(peer = %self.attempt.peer, "[pn-03] Consumer gave up before acceptance");
        }
        Box::new(MemoryDialog {
            peer: self.attempt.peer,
            incoming,
        })
    }

    fn reject(self: Box<Self>, error: DialogError) {
        // The consumer may already be gone; nothing to clean up either way.
        let _ = self.attempt.decision.send(Err(error));
    }
}

struct MemoryDialog {
    peer: Identity,
    incoming: mpsc::Receiver<IncomingRequest>,
}

#[async_trait]
impl Dialog for MemoryDialog {
    fn peer(&self) -> &Identity {
        &self.peer
    }

    async fn next_request(&mut self) -> Option<IncomingRequest> {
        self.incoming.recv().await
    }
}

/// Consumer end of an accepted dialog. Dropping it closes the dialog.
#[derive(Debug)]
pub struct ConsumerDialog {
    provider: Identity,
    signature: Signature,
    requests: mpsc::Sender<IncomingRequest>,
}

impl ConsumerDialog {
    /// Identity of the provider that accepted the dialog.
    #[must_use]
    pub fn provider(&self) -> &Identity {
        &self.provider
    }

    /// Provider's signature over the channel key.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Send a request and wait for the reply.
    ///
    /// # Errors
    ///
    /// [`DialogError::TransportClosed`] if the provider side is gone, or the
    /// provider's error reply.
    pub async fn request(&self, request: DialogRequest) -> Result<DialogResponse, DialogError> {
        let (reply, replied) = oneshot::channel();
        self.requests
            .send(IncomingRequest {
                request,
                responder: Responder::new(reply),
            })
            .await
            .map_err(|_| DialogError::TransportClosed)?;
        replied.await.map_err(|_| DialogError::TransportClosed)?
    }

    /// Close the dialog.
    pub fn close(self) {
        drop(self);
    }
}
