//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::{EventFilter, NodeEvent};
use crate::subscriber::{HandlerSubscription, Subscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Returns the number of active subscribers that received the event.
    async fn publish(&self, event: NodeEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<NodeEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Run `handler` for every event matching `filter` on a dedicated task.
    ///
    /// The subscription is registered before this returns, so every event
    /// published afterwards reaches the handler. Handler errors are logged
    /// and never propagated to the publisher.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::NoRuntime`] when called outside a tokio
    /// runtime.
    pub fn subscribe_handler<F, Fut, E>(
        &self,
        name: &'static str,
        filter: EventFilter,
        handler: F,
    ) -> Result<HandlerSubscription, SubscriptionError>
    where
        F: Fn(NodeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SubscriptionError::NoRuntime)?;
        let mut subscription = self.subscribe(filter).named(name);

        let task = runtime.spawn(async move {
            while let Some(event) = subscription.recv().await {
                let topic = event.topic();
                if let Err(e) = handler(event).await {
                    warn!(handler = name, topic = ?topic, error = %e, "[Bus] Event handler failed");
                }
            }
            debug!(handler = name, "[Bus] Event handler finished (bus closed)");
        });

        debug!(handler = name, "[Bus] Event handler subscribed");
        Ok(HandlerSubscription::new(name, task))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: NodeEvent) -> usize {
        let topic = event.topic();
        let source = event.source_subsystem();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    topic = ?topic,
                    source = source,
                    receivers = receiver_count,
                    "Event published"
                );
                receiver_count
            }
            Err(_) => {
                // No receivers - event is dropped
                debug!(topic = ?topic, source = source, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
