//! # Node Events
//!
//! Defines all event types that flow through the shared bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::entities::{Identity, ServiceId, ServiceState, SessionId};

/// Subsystem id used for events published by the node runtime itself.
pub const RUNTIME_SUBSYSTEM: u8 = 0;

/// Point-in-time view of a consumer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub service_id: ServiceId,
    pub service_type: String,
    pub consumer_id: Identity,
    pub started_at: DateTime<Utc>,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// Session lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Created,
    Removed,
}

/// Phase of a port mapping attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortMappingStage {
    /// The mapping was requested from the gateway.
    Mapping,
    /// The mapping was removed from the gateway.
    Unmapping,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeEvent {
    // =========================================================================
    // RUNTIME: SERVICE LIFECYCLE
    // =========================================================================
    /// A service changed lifecycle state.
    ServiceStatus {
        service_id: ServiceId,
        provider_id: Identity,
        service_type: String,
        status: ServiceState,
    },

    // =========================================================================
    // SUBSYSTEM 4: SESSIONS
    // =========================================================================
    /// A session was created or removed.
    Session {
        status: SessionStatus,
        session: SessionSnapshot,
    },

    /// Traffic counters of a session were updated by the tunnel.
    SessionDataTransferred {
        session_id: SessionId,
        bytes_received: u64,
        bytes_sent: u64,
    },

    // =========================================================================
    // SUBSYSTEM 2: NAT PORT MAPPING
    // =========================================================================
    /// A port mapping attempt finished.
    PortMapping {
        stage: PortMappingStage,
        port: u16,
        protocol: String,
        successful: bool,
        error: Option<String>,
    },
}

impl NodeEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ServiceStatus { .. } => EventTopic::ServiceStatus,
            Self::Session { .. } | Self::SessionDataTransferred { .. } => EventTopic::Session,
            Self::PortMapping { .. } => EventTopic::PortMapping,
        }
    }

    /// Get the originating subsystem id.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::ServiceStatus { .. } => RUNTIME_SUBSYSTEM,
            Self::Session { .. } | Self::SessionDataTransferred { .. } => 4,
            Self::PortMapping { .. } => 2,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Service lifecycle transitions.
    ServiceStatus,
    /// Session lifecycle and traffic.
    Session,
    /// NAT port mapping results.
    PortMapping,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}
