//! # Event-Based Session Storage
//!
//! Wraps [`StorageMemory`] and mirrors every change onto the bus as a
//! `NodeEvent::Session`. Traffic counters flow the other way: tunnels publish
//! `SessionDataTransferred` and the storage applies them once subscribed.

use std::sync::Arc;

use async_trait::async_trait;
use shared_bus::{
    EventFilter, EventPublisher, EventTopic, HandlerSubscription, InMemoryEventBus, NodeEvent,
    SessionStatus, SubscriptionError,
};
use shared_types::{ServiceId, SessionId};
use tracing::{debug, info};

use super::memory::StorageMemory;
use super::SessionStorage;
use crate::domain::session::Session;

pub struct EventBasedStorage {
    inner: Arc<StorageMemory>,
    bus: Arc<InMemoryEventBus>,
}

impl EventBasedStorage {
    #[must_use]
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            inner: Arc::new(StorageMemory::new()),
            bus,
        }
    }

    /// Start applying traffic counters published on the bus.
    ///
    /// # Errors
    ///
    /// Propagates the bus subscription error.
    pub fn subscribe(&self) -> Result<HandlerSubscription, SubscriptionError> {
        let inner = Arc::clone(&self.inner);
        self.bus.subscribe_handler(
            "session-storage",
            EventFilter::topics(vec![EventTopic::Session]),
            move |event| {
                let inner = Arc::clone(&inner);
                async move {
                    if let NodeEvent::SessionDataTransferred {
                        session_id,
                        bytes_received,
                        bytes_sent,
                    } = event
                    {
                        if !inner.update_stats(&session_id, bytes_received, bytes_sent) {
                            return Err(format!("traffic for unknown session {session_id}"));
                        }
                    }
                    Ok(())
                }
            },
        )
    }

    async fn publish(&self, status: SessionStatus, session: &Session) {
        self.bus
            .publish(NodeEvent::Session {
                status,
                session: session.snapshot(),
            })
            .await;
    }
}

#[async_trait]
impl SessionStorage for EventBasedStorage {
    async fn add(&self, session: Session) {
        info!(
            session_id = %session.id,
            consumer = %session.consumer_id,
            service_type = %session.service_type,
            "[pn-04] Session created"
        );
        self.inner.insert(session.clone());
        self.publish(SessionStatus::Created, &session).await;
    }

    fn find(&self, id: &SessionId) -> Option<Session> {
        self.inner.find(id)
    }

    async fn remove(&self, id: &SessionId) -> Option<Session> {
        let session = self.inner.take(id)?;
        info!(session_id = %id, "[pn-04] Session removed");
        self.publish(SessionStatus::Removed, &session).await;
        Some(session)
    }

    async fn remove_for_service(&self, service_id: &ServiceId) -> usize {
        let removed = self.inner.take_for_service(service_id);
        for session in &removed {
            self.publish(SessionStatus::Removed, session).await;
        }
        debug!(service_id = %service_id, count = removed.len(), "[pn-04] Removed service sessions");
        removed.len()
    }

    fn get_all(&self) -> Vec<Session> {
        self.inner.get_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::Identity;
    use std::time::Duration;

    fn session(service_id: ServiceId) -> Session {
        Session::new(
            SessionId::generate(),
            service_id,
            "wireguard",
            Identity::from_address("0x0000000000000000000000000000000000000002"),
            json!({"key": "abc"}),
        )
    }

    #[tokio::test]
    async fn test_changes_are_published() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Session]));
        let storage = EventBasedStorage::new(bus.clone());
        let s = session(ServiceId::generate());
        let id = s.id;

        storage.add(s).await;
        storage.remove(&id).await.unwrap();

        match events.try_recv().unwrap().unwrap() {
            NodeEvent::Session { status, session } => {
                assert_eq!(status, SessionStatus::Created);
                assert_eq!(session.session_id, id);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            events.try_recv().unwrap().unwrap(),
            NodeEvent::Session {
                status: SessionStatus::Removed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_subscribe_applies_traffic() {
        let bus = Arc::new(InMemoryEventBus::new());
        let storage = EventBasedStorage::new(bus.clone());
        let _handle = storage.subscribe().unwrap();
        let s = session(ServiceId::generate());
        let id = s.id;
        storage.add(s).await;

        bus.publish(NodeEvent::SessionDataTransferred {
            session_id: id,
            bytes_received: 512,
            bytes_sent: 1024,
        })
        .await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while storage.find(&id).map(|s| s.bytes_sent) != Some(1024) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("traffic should be applied");
    }

    #[test]
    fn test_subscribe_outside_runtime_fails() {
        let storage = EventBasedStorage::new(Arc::new(InMemoryEventBus::new()));
        assert!(matches!(storage.subscribe(), Err(SubscriptionError::NoRuntime)));
    }
}
