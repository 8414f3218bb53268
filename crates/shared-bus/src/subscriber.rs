//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{EventFilter, NodeEvent};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// A handler subscription was requested outside a tokio runtime.
    #[error("Event handlers require a running tokio runtime")]
    NoRuntime,
}

/// A subscription handle for receiving events.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<NodeEvent>,

    /// Filter for this subscription.
    filter: EventFilter,

    /// Owner reported when events are dropped.
    name: &'static str,

    /// Events dropped because this subscriber fell behind.
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<NodeEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            name: "subscription",
            lagged: 0,
        }
    }

    pub(crate) fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Total events dropped because the subscriber lagged behind the bus.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn record_lag(&mut self, count: u64) {
        self.lagged += count;
        warn!(
            subscriber = self.name,
            lagged = count,
            "[Bus] Subscriber lagged, events dropped"
        );
    }

    /// Receive the next event that matches the filter.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<NodeEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.record_lag(count);
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<NodeEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.record_lag(count);
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// Handle of a handler task started by
/// [`InMemoryEventBus::subscribe_handler`](crate::InMemoryEventBus::subscribe_handler).
///
/// Dropping the handle leaves the handler running; call [`cancel`](Self::cancel)
/// to stop it.
pub struct HandlerSubscription {
    name: &'static str,
    task: JoinHandle<()>,
}

impl HandlerSubscription {
    pub(crate) fn new(name: &'static str, task: JoinHandle<()>) -> Self {
        Self { name, task }
    }

    /// Name the handler was registered under.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the handler task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the handler task.
    pub fn cancel(&self) {
        debug!(handler = self.name, "[Bus] Event handler cancelled");
        self.task.abort();
    }
}
