//! # Services Manager
//!
//! Starts and stops services on behalf of the operator.
//!
//! ```text
//! start: lookup factory → create → stamp provider → waiter + handler
//!        → waiter.serve(handler) → Running → spawn service.serve()
//! stop:  waiter.stop() → service.stop() → join serve task → NotRunning
//! ```
//!
//! Every service id reports `Starting` once and `NotRunning` exactly once,
//! whether it is stopped, fails to start or its `serve` fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pn_03_dialog::{DialogError, DialogWaiter};
use pn_05_services::{Service, ServiceError, ServiceRegistry};
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{Identity, ServiceId, ServiceOptions, ServiceProposal, ServiceState};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::wiring::dialog::{DialogHandlerFactory, DialogWaiterFactory};

/// How long `stop` waits for a service's `serve` to return.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Dialog(#[from] DialogError),

    #[error("service {0} is not running")]
    NotFound(ServiceId),
}

/// Operator request to start one service.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub service_type: String,
    pub options: ServiceOptions,
    /// Consumers allowed to open dialogs; empty allows everyone.
    pub access_policy: Vec<Identity>,
}

/// Snapshot of a running service.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub service_type: String,
    pub proposal: ServiceProposal,
}

struct RunningService {
    service_type: String,
    proposal: ServiceProposal,
    service: Arc<dyn Service>,
    waiter: DialogWaiter,
    task: Mutex<Option<JoinHandle<()>>>,
}

type Services = Arc<Mutex<HashMap<ServiceId, Arc<RunningService>>>>;

pub struct ServicesManager {
    registry: Arc<ServiceRegistry>,
    waiters: DialogWaiterFactory,
    handlers: DialogHandlerFactory,
    publisher: Arc<dyn EventPublisher>,
    provider: Identity,
    services: Services,
}

impl ServicesManager {
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry>,
        waiters: DialogWaiterFactory,
        handlers: DialogHandlerFactory,
        publisher: Arc<dyn EventPublisher>,
        provider: Identity,
    ) -> Self {
        Self {
            registry,
            waiters,
            handlers,
            publisher,
            provider,
            services: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a service and begin accepting dialogs for it.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::UnsupportedServiceType`] for unregistered types
    /// - the factory's error
    /// - the dialog transport's error when the channel is busy
    pub async fn start(&self, request: StartRequest) -> Result<ServiceId, ManagerError> {
        let StartRequest {
            service_type,
            options,
            access_policy,
        } = request;
        let id = ServiceId::generate();
        let status = StatusReporter {
            publisher: Arc::clone(&self.publisher),
            provider: self.provider.clone(),
            service_id: id,
            service_type: service_type.clone(),
        };
        status.report(ServiceState::Starting).await;

        let (service, proposal) = match self.registry.create(&service_type, options).await {
            Ok(created) => created,
            Err(e) => {
                error!(service_type = %service_type, error = %e, "[runtime] Service failed to start");
                status.report(ServiceState::NotRunning).await;
                return Err(e.into());
            }
        };
        let proposal = proposal.with_provider(self.provider.clone());

        let waiter = self.waiters.create(&service_type, &access_policy);
        let negotiator = Arc::clone(&service).negotiator();
        let handler = self.handlers.create(proposal.clone(), id, negotiator);
        if let Err(e) = waiter.serve(handler).await {
            error!(service_type = %service_type, error = %e, "[runtime] Dialog waiter failed to start");
            status.report(ServiceState::NotRunning).await;
            return Err(e.into());
        }

        let running = Arc::new(RunningService {
            service_type: service_type.clone(),
            proposal,
            service: Arc::clone(&service),
            waiter,
            task: Mutex::new(None),
        });
        self.services.lock().insert(id, Arc::clone(&running));

        // Running goes out before serve can fail and report NotRunning.
        status.report(ServiceState::Running).await;
        let task = tokio::spawn(serve_service(
            service,
            Arc::clone(&self.services),
            status.clone(),
        ));
        *running.task.lock() = Some(task);

        info!(
            service_id = %id,
            service_type = %service_type,
            allowed = access_policy.len(),
            "[runtime] Service started"
        );
        Ok(id)
    }

    /// Stop a running service.
    ///
    /// # Errors
    ///
    /// [`ManagerError::NotFound`] when no such service is running.
    pub async fn stop(&self, id: ServiceId) -> Result<(), ManagerError> {
        let running = self
            .services
            .lock()
            .remove(&id)
            .ok_or(ManagerError::NotFound(id))?;

        running.waiter.stop().await;
        if let Err(e) = running.service.stop().await {
            warn!(service_id = %id, error = %e, "[runtime] Service stop reported an error");
        }
        let task = running.task.lock().take();
        if let Some(task) = task {
            match tokio::time::timeout(STOP_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(service_id = %id, error = %e, "[runtime] Serve task ended abnormally");
                }
                Err(_) => warn!(service_id = %id, "[runtime] Service did not stop in time"),
            }
        }

        StatusReporter {
            publisher: Arc::clone(&self.publisher),
            provider: self.provider.clone(),
            service_id: id,
            service_type: running.service_type.clone(),
        }
        .report(ServiceState::NotRunning)
        .await;
        info!(service_id = %id, service_type = %running.service_type, "[runtime] Service stopped");
        Ok(())
    }

    /// Stop every running service. Failures are logged.
    pub async fn stop_all(&self) {
        let ids: Vec<ServiceId> = self.services.lock().keys().copied().collect();
        for id in ids {
            if let Err(e) = self.stop(id).await {
                warn!(service_id = %id, error = %e, "[runtime] Failed to stop service");
            }
        }
    }

    /// Running services.
    #[must_use]
    pub fn list(&self) -> Vec<ServiceInfo> {
        self.services
            .lock()
            .iter()
            .map(|(id, running)| ServiceInfo {
                id: *id,
                service_type: running.service_type.clone(),
                proposal: running.proposal.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

#[derive(Clone)]
struct StatusReporter {
    publisher: Arc<dyn EventPublisher>,
    provider: Identity,
    service_id: ServiceId,
    service_type: String,
}

impl StatusReporter {
    async fn report(&self, status: ServiceState) {
        self.publisher
            .publish(NodeEvent::ServiceStatus {
                service_id: self.service_id,
                provider_id: self.provider.clone(),
                service_type: self.service_type.clone(),
                status,
            })
            .await;
    }
}

/// Run `serve`. A failing service tears itself down unless `stop` already
/// took it out of the running set.
async fn serve_service(service: Arc<dyn Service>, services: Services, status: StatusReporter) {
    let Err(e) = service.serve().await else {
        return;
    };
    error!(service_id = %status.service_id, error = %e, "[runtime] Service failed while serving");

    let running = services.lock().remove(&status.service_id);
    if let Some(running) = running {
        running.waiter.stop().await;
        status.report(ServiceState::NotRunning).await;
    }
}
