//! Session entity.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_bus::SessionSnapshot;
use shared_types::{Identity, ServiceId, SessionId};

/// A consumer session of one service instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub service_id: ServiceId,
    pub service_type: String,
    pub consumer_id: Identity,
    /// Configuration negotiated with the service.
    pub config: Value,
    pub started_at: DateTime<Utc>,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

impl Session {
    #[must_use]
    pub fn new(
        id: SessionId,
        service_id: ServiceId,
        service_type: &str,
        consumer_id: Identity,
        config: Value,
    ) -> Self {
        Self {
            id,
            service_id,
            service_type: service_type.to_string(),
            consumer_id,
            config,
            started_at: Utc::now(),
            bytes_received: 0,
            bytes_sent: 0,
        }
    }

    /// View of the session as published on the bus.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            service_id: self.service_id,
            service_type: self.service_type.clone(),
            consumer_id: self.consumer_id.clone(),
            started_at: self.started_at,
            bytes_received: self.bytes_received,
            bytes_sent: self.bytes_sent,
        }
    }
}

/// Reply data of a successfully started session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStart {
    pub session_id: SessionId,
    pub config: Value,
    pub payments_required: bool,
}

/// Node-level session settings, fixed at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Maximum live sessions a single dialog may hold.
    pub max_sessions_per_dialog: usize,
    /// Upper bound on one NAT ping towards a consumer.
    pub ping_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions_per_dialog: 4,
            ping_timeout: Duration::from_secs(10),
        }
    }
}
