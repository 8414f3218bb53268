//! Host NAT forwarding and hole punching.

use std::net::SocketAddr;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ports::{NatPinger, NatRule, NatService};
use shared_types::NatServiceError;
use tracing::{debug, info};

/// Keeps forwarding rules in memory without touching the host firewall.
/// Used where the tunnel processes manage forwarding themselves.
#[derive(Debug, Default)]
pub struct NoopNatService {
    enabled: Mutex<bool>,
    rules: Mutex<Vec<NatRule>>,
}

impl NoopNatService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock()
    }

    #[must_use]
    pub fn rules(&self) -> Vec<NatRule> {
        self.rules.lock().clone()
    }
}

#[async_trait]
impl NatService for NoopNatService {
    async fn enable(&self) -> Result<(), NatServiceError> {
        *self.enabled.lock() = true;
        info!("[runtime] NAT forwarding enabled (no-op)");
        Ok(())
    }

    async fn disable(&self) -> Result<(), NatServiceError> {
        *self.enabled.lock() = false;
        self.rules.lock().clear();
        info!("[runtime] NAT forwarding disabled (no-op)");
        Ok(())
    }

    async fn add(&self, rule: &NatRule) -> Result<(), NatServiceError> {
        if !self.is_enabled() {
            return Err(NatServiceError::Forwarding("NAT forwarding is not enabled".into()));
        }
        debug!(subnet = %rule.source_subnet, target = %rule.target_ip, "[runtime] NAT rule added");
        let mut rules = self.rules.lock();
        if !rules.contains(rule) {
            rules.push(rule.clone());
        }
        Ok(())
    }

    async fn del(&self, rule: &NatRule) -> Result<(), NatServiceError> {
        debug!(subnet = %rule.source_subnet, "[runtime] NAT rule removed");
        self.rules.lock().retain(|r| r != rule);
        Ok(())
    }
}

/// Logs ping requests; real hole punching lives in the tunnel processes.
#[derive(Debug, Default)]
pub struct LoggingNatPinger;

#[async_trait]
impl NatPinger for LoggingNatPinger {
    async fn ping_target(&self, target: SocketAddr) {
        debug!(target = %target, "[runtime] NAT ping requested");
    }
}
