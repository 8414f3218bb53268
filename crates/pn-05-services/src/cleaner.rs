//! # Service Cleaner
//!
//! Purges session storage when a service stops. Runs on the bus subscriber
//! task so the publisher of the status event never waits for the purge.

use std::sync::Arc;

use pn_04_session::SessionStorage;
use shared_bus::{
    EventFilter, EventTopic, HandlerSubscription, InMemoryEventBus, NodeEvent, SubscriptionError,
};
use shared_types::{ServiceId, ServiceState};
use tracing::info;

pub struct ServiceCleaner {
    sessions: Arc<dyn SessionStorage>,
}

impl ServiceCleaner {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStorage>) -> Self {
        Self { sessions }
    }

    /// React to one event. Only `NotRunning` service statuses matter.
    pub async fn handle_event(&self, event: &NodeEvent) {
        if let NodeEvent::ServiceStatus {
            service_id,
            status: ServiceState::NotRunning,
            ..
        } = event
        {
            self.clean(service_id).await;
        }
    }

    async fn clean(&self, service_id: &ServiceId) {
        let removed = self.sessions.remove_for_service(service_id).await;
        info!(service_id = %service_id, removed, "[pn-05] Cleaned sessions of stopped service");
    }

    /// Subscribe the cleaner to service status events.
    ///
    /// # Errors
    ///
    /// Propagates the bus subscription error.
    pub fn subscribe(
        self: Arc<Self>,
        bus: &InMemoryEventBus,
    ) -> Result<HandlerSubscription, SubscriptionError> {
        bus.subscribe_handler(
            "service-cleaner",
            EventFilter::topics(vec![EventTopic::ServiceStatus]),
            move |event| {
                let cleaner = Arc::clone(&self);
                async move {
                    cleaner.handle_event(&event).await;
                    Ok::<(), std::convert::Infallible>(())
                }
            },
        )
    }
}
