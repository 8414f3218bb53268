//! # Shared Bus - Event Bus for Inter-Subsystem Communication
//!
//! Lifecycle, session and port mapping events flow through this bus. The
//! publisher never waits for subscribers: events are fanned out over a tokio
//! broadcast channel and every handler runs on its own task.
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ ServicesManager  │                    │  ServiceCleaner  │
//! │                  │    publish()       │                  │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │          │
//!                      │              │ ─────────┘
//!                      └──────────────┘  subscribe_handler()
//! ```
//!
//! Handler errors are logged by the bus and never reach the publisher.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{
    EventFilter, EventTopic, NodeEvent, PortMappingStage, SessionSnapshot, SessionStatus,
};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{HandlerSubscription, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
