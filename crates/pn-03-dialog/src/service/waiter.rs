//! # Dialog Waiter
//!
//! A waiter is bound to one channel for its whole life and is never reused
//! across service restarts. `serve` spawns the accept loop; every attempt is
//! validated and handled on its own task so that a slow peer never holds up
//! the others.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::channel::ChannelKey;
use crate::domain::errors::DialogError;
use crate::domain::validator::PeerValidator;
use crate::ports::{DialogHandler, DialogListener, DialogTransport, PendingDialog, Signer};

/// Listens for dialogs on one `(provider, service type)` channel.
pub struct DialogWaiter {
    transport: Arc<dyn DialogTransport>,
    channel: ChannelKey,
    signer: Arc<dyn Signer>,
    validator: Arc<dyn PeerValidator>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DialogWaiter {
    #[must_use]
    pub fn new(
        transport: Arc<dyn DialogTransport>,
        channel: ChannelKey,
        signer: Arc<dyn Signer>,
        validator: Arc<dyn PeerValidator>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            channel,
            signer,
            validator,
            shutdown,
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &ChannelKey {
        &self.channel
    }

    /// Whether the accept loop is running.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start listening and hand every authorized dialog to `handler`.
    ///
    /// Returns once the listener is registered; the accept loop runs on a
    /// spawned task until [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// - [`DialogError::AlreadyServing`] if called twice
    /// - the transport's error if the channel cannot be listened on
    pub async fn serve(&self, handler: Arc<dyn DialogHandler>) -> Result<(), DialogError> {
        if self.task.lock().is_some() || *self.shutdown.borrow() {
            return Err(DialogError::AlreadyServing(self.channel.clone()));
        }

        let listener = self
            .transport
            .listen(&self.channel, Arc::clone(&self.signer))
            .await?;
        info!(channel = %self.channel, "[pn-03] Waiting for dialogs");

        let task = tokio::spawn(accept_loop(
            listener,
            self.channel.clone(),
            Arc::clone(&self.validator),
            handler,
            self.shutdown.subscribe(),
        ));

        let mut slot = self.task.lock();
        if slot.is_some() {
            task.abort();
            return Err(DialogError::AlreadyServing(self.channel.clone()));
        }
        *slot = Some(task);
        Ok(())
    }

    /// Stop accepting dialogs and release the channel.
    ///
    /// Dialogs already being handled run to completion on their own tasks.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(channel = %self.channel, error = %e, "[pn-03] Accept loop ended abnormally");
            }
        }
        info!(channel = %self.channel, "[pn-03] Dialog waiter stopped");
    }
}

async fn accept_loop(
    mut listener: Box<dyn DialogListener>,
    channel: ChannelKey,
    validator: Arc<dyn PeerValidator>,
    handler: Arc<dyn DialogHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            attempt = listener.accept() => {
                let Some(pending) = attempt else {
                    debug!(channel = %channel, "[pn-03] Transport closed the channel");
                    break;
                };
                tokio::spawn(process_attempt(
                    pending,
                    channel.clone(),
                    Arc::clone(&validator),
                    Arc::clone(&handler),
                ));
            }
        }
    }
    // Dropping the listener releases the channel on the transport.
    drop(listener);
}

async fn process_attempt(
    pending: Box<dyn PendingDialog>,
    channel: ChannelKey,
    validator: Arc<dyn PeerValidator>,
    handler: Arc<dyn DialogHandler>,
) {
    let peer = pending.peer().clone();
    if let Err(e) = validator.validate(&peer) {
        warn!(channel = %channel, peer = %peer, error = %e, "[pn-03] Dialog rejected");
        pending.reject(e);
        return;
    }

    debug!(channel = %channel, peer = %peer, "[pn-03] Dialog accepted");
    let dialog = pending.accept();
    match handler.handle(dialog).await {
        Ok(()) => debug!(channel = %channel, peer = %peer, "[pn-03] Dialog closed"),
        Err(e) => warn!(channel = %channel, peer = %peer, error = %e, "[pn-03] Dialog handler failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messages::{DialogRequest, DialogResponse, Signature};
    use crate::domain::validator::AllowListValidator;
    use crate::memory::InMemoryTransport;
    use crate::ports::Dialog;
    use async_trait::async_trait;
    use serde_json::json;
    use shared_types::Identity;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestSigner(Identity);

    impl Signer for TestSigner {
        fn identity(&self) -> &Identity {
            &self.0
        }

        fn sign(&self, message: &[u8]) -> Signature {
            Signature(message.to_vec())
        }
    }

    /// Answers every request with `Acknowledged` and counts dialogs.
    #[derive(Default)]
    struct CountingHandler {
        dialogs: AtomicUsize,
    }

    #[async_trait]
    impl DialogHandler for CountingHandler {
        async fn handle(&self, mut dialog: Box<dyn Dialog>) -> Result<(), DialogError> {
            self.dialogs.fetch_add(1, Ordering::SeqCst);
            while let Some(incoming) = dialog.next_request().await {
                incoming.responder.respond(Ok(DialogResponse::Acknowledged));
            }
            Ok(())
        }
    }

    fn id(n: u8) -> Identity {
        Identity::from_address(&format!("0x{:040x}", n))
    }

    fn waiter(
        transport: &Arc<InMemoryTransport>,
        validator: AllowListValidator,
    ) -> DialogWaiter {
        let provider = id(100);
        DialogWaiter::new(
            transport.clone(),
            ChannelKey::new(&provider, "noop"),
            Arc::new(TestSigner(provider)),
            Arc::new(validator),
        )
    }

    #[tokio::test]
    async fn test_allowed_peer_reaches_handler() {
        let transport = Arc::new(InMemoryTransport::new());
        let waiter = waiter(&transport, AllowListValidator::new([id(1)]));
        let handler = Arc::new(CountingHandler::default());
        waiter.serve(handler.clone()).await.unwrap();

        let dialog = transport.dial(id(1), waiter.channel()).await.unwrap();
        let response = dialog
            .request(DialogRequest::CreateSession {
                config: json!({}),
                ping_target: None,
            })
            .await
            .unwrap();
        assert_eq!(response, DialogResponse::Acknowledged);
        assert_eq!(handler.dialogs.load(Ordering::SeqCst), 1);
        assert_eq!(dialog.provider(), &id(100));
    }

    #[tokio::test]
    async fn test_disallowed_peer_rejected() {
        let transport = Arc::new(InMemoryTransport::new());
        let waiter = waiter(&transport, AllowListValidator::new([id(1)]));
        let handler = Arc::new(CountingHandler::default());
        waiter.serve(handler.clone()).await.unwrap();

        let err = transport.dial(id(2), waiter.channel()).await.unwrap_err();
        assert_eq!(err, DialogError::IdentityNotAllowed(id(2)));
        assert_eq!(handler.dialogs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_serve_twice_fails() {
        let transport = Arc::new(InMemoryTransport::new());
        let waiter = waiter(&transport, AllowListValidator::open());
        let handler = Arc::new(CountingHandler::default());

        waiter.serve(handler.clone()).await.unwrap();
        assert!(waiter.is_serving());
        assert!(matches!(
            waiter.serve(handler).await,
            Err(DialogError::AlreadyServing(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_releases_channel() {
        let transport = Arc::new(InMemoryTransport::new());
        let waiter = waiter(&transport, AllowListValidator::open());
        waiter.serve(Arc::new(CountingHandler::default())).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter.stop())
            .await
            .expect("stop should finish");
        assert!(!waiter.is_serving());

        let err = transport.dial(id(1), waiter.channel()).await.unwrap_err();
        assert!(matches!(err, DialogError::NoListener(_)));
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_other_peers() {
        struct SlowFirst;

        #[async_trait]
        impl DialogHandler for SlowFirst {
            async fn handle(&self, mut dialog: Box<dyn Dialog>) -> Result<(), DialogError> {
                if dialog.peer() == &id(1) {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                while let Some(incoming) = dialog.next_request().await {
                    incoming.responder.respond(Ok(DialogResponse::Acknowledged));
                }
                Ok(())
            }
        }

        let transport = Arc::new(InMemoryTransport::new());
        let waiter = waiter(&transport, AllowListValidator::open());
        waiter.serve(Arc::new(SlowFirst)).await.unwrap();

        let _slow = transport.dial(id(1), waiter.channel()).await.unwrap();
        let fast = transport.dial(id(2), waiter.channel()).await.unwrap();
        let response = tokio::time::timeout(
            Duration::from_secs(1),
            fast.request(DialogRequest::DestroySession {
                session_id: shared_types::SessionId::generate(),
            }),
        )
        .await
        .expect("second peer must not wait for the first");
        assert_eq!(response.unwrap(), DialogResponse::Acknowledged);
    }
}
