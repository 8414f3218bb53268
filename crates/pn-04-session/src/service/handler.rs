//! # Session Dialog Handler
//!
//! Serves one accepted dialog: builds a fresh session manager for the peer,
//! answers its requests in order and destroys the sessions it created once
//! the peer closes the dialog.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pn_03_dialog::{Dialog, DialogError, DialogHandler, DialogRequest, DialogResponse};
use shared_types::ports::PromiseStorage;
use shared_types::Identity;
use tracing::{debug, info};

use crate::domain::errors::SessionError;
use crate::ports::{ConfigNegotiator, SessionManager, SessionManagerFactory};
use crate::storage::connectivity::{ConnectivityEntry, StatusSubscriber};

pub struct SessionDialogHandler {
    factory: Arc<dyn SessionManagerFactory>,
    config_provider: Arc<dyn ConfigNegotiator>,
    promise_storage: Arc<dyn PromiseStorage>,
    provider: Identity,
    connectivity: Arc<dyn StatusSubscriber>,
}

impl SessionDialogHandler {
    #[must_use]
    pub fn new(
        factory: Arc<dyn SessionManagerFactory>,
        config_provider: Arc<dyn ConfigNegotiator>,
        promise_storage: Arc<dyn PromiseStorage>,
        provider: Identity,
        connectivity: Arc<dyn StatusSubscriber>,
    ) -> Self {
        Self {
            factory,
            config_provider,
            promise_storage,
            provider,
            connectivity,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &Identity {
        &self.provider
    }

    /// Promise storage payments of this service are settled against.
    #[must_use]
    pub fn promise_storage(&self) -> &Arc<dyn PromiseStorage> {
        &self.promise_storage
    }

    async fn serve_request(
        &self,
        manager: &dyn SessionManager,
        request: DialogRequest,
    ) -> Result<DialogResponse, SessionError> {
        match request {
            DialogRequest::CreateSession {
                config,
                ping_target,
            } => {
                let start = manager
                    .start(self.config_provider.as_ref(), &config, ping_target)
                    .await?;
                Ok(DialogResponse::SessionCreated {
                    session_id: start.session_id,
                    config: start.config,
                    payments_required: start.payments_required,
                })
            }
            DialogRequest::DestroySession { session_id } => {
                manager
                    .destroy(self.config_provider.as_ref(), &session_id)
                    .await?;
                Ok(DialogResponse::SessionDestroyed)
            }
            DialogRequest::ConnectivityStatus { session_id, status } => {
                self.connectivity.subscribe(ConnectivityEntry {
                    session_id,
                    consumer_id: manager.consumer().clone(),
                    status,
                    reported_at: Utc::now(),
                });
                Ok(DialogResponse::Acknowledged)
            }
        }
    }
}

#[async_trait]
impl DialogHandler for SessionDialogHandler {
    async fn handle(&self, mut dialog: Box<dyn Dialog>) -> Result<(), DialogError> {
        let peer = dialog.peer().clone();
        let manager = self.factory.create(&peer);
        info!(peer = %peer, provider = %self.provider, "[pn-04] Serving dialog");

        while let Some(incoming) = dialog.next_request().await {
            let result = self
                .serve_request(manager.as_ref(), incoming.request)
                .await
                .map_err(|e| {
                    debug!(peer = %peer, error = %e, "[pn-04] Request failed");
                    DialogError::RequestFailed(e.to_string())
                });
            incoming.responder.respond(result);
        }

        manager.destroy_all(self.config_provider.as_ref()).await;
        info!(peer = %peer, "[pn-04] Dialog closed, sessions destroyed");
        Ok(())
    }
}
