//! # Port Pool
//!
//! The pool kind is decided once, when the owning service factory runs.
//! Range and dynamic pools track live leases in a shared set guarded by a
//! `parking_lot` mutex; the lock is held only while picking a port.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use shared_types::PortRange;
use tracing::{debug, warn};

use super::errors::PortPoolError;
use crate::ports::{PortProbe, UdpProbe};

/// Range dynamic pools draw from unless configured otherwise.
pub const DEFAULT_DYNAMIC_RANGE: PortRange = PortRange {
    start: 40000,
    end: 50000,
};

/// Upper bound on host probes per dynamic allocation.
pub const MAX_DYNAMIC_ATTEMPTS: usize = 1000;

/// Allocation strategy of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// A single configured port, handed out without limit.
    Fixed(u16),
    /// A configured closed range.
    FixedRange(PortRange),
    /// Free host ports from a range.
    Dynamic(PortRange),
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(port) => write!(f, "fixed({port})"),
            Self::FixedRange(range) => write!(f, "fixed-range({range})"),
            Self::Dynamic(range) => write!(f, "dynamic({range})"),
        }
    }
}

type Allocations = Arc<Mutex<HashSet<u16>>>;

/// Supplies ports to one service instance.
pub struct PortPool {
    kind: PoolKind,
    allocated: Allocations,
    probe: Arc<dyn PortProbe>,
}

impl PortPool {
    /// Pool that always returns `port`.
    #[must_use]
    pub fn fixed(port: u16) -> Self {
        Self::with_probe(PoolKind::Fixed(port), Arc::new(UdpProbe))
    }

    /// Pool over the closed range `range`.
    #[must_use]
    pub fn fixed_range(range: PortRange) -> Self {
        Self::with_probe(PoolKind::FixedRange(range), Arc::new(UdpProbe))
    }

    /// Pool of free host ports in [`DEFAULT_DYNAMIC_RANGE`].
    #[must_use]
    pub fn dynamic() -> Self {
        Self::with_probe(PoolKind::Dynamic(DEFAULT_DYNAMIC_RANGE), Arc::new(UdpProbe))
    }

    /// Pool of the given kind checking host ports with `probe`.
    #[must_use]
    pub fn with_probe(kind: PoolKind, probe: Arc<dyn PortProbe>) -> Self {
        Self {
            kind,
            allocated: Arc::new(Mutex::new(HashSet::new())),
            probe,
        }
    }

    /// Allocation strategy of this pool.
    #[must_use]
    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Number of live leases.
    #[must_use]
    pub fn leased(&self) -> usize {
        self.allocated.lock().len()
    }

    /// Lease the next port.
    ///
    /// # Errors
    ///
    /// - [`PortPoolError::Exhausted`] when every port of a fixed range is leased
    /// - [`PortPoolError::NoFreePort`] when a dynamic pool finds no unbound port
    pub fn next(&self) -> Result<PortLease, PortPoolError> {
        match self.kind {
            PoolKind::Fixed(port) => Ok(PortLease {
                port,
                allocations: None,
            }),
            PoolKind::FixedRange(range) => self.next_in_range(range),
            PoolKind::Dynamic(range) => self.next_dynamic(range),
        }
    }

    fn next_in_range(&self, range: PortRange) -> Result<PortLease, PortPoolError> {
        let mut allocated = self.allocated.lock();
        let port = (range.start..=range.end)
            .find(|port| !allocated.contains(port))
            .ok_or(PortPoolError::Exhausted {
                range,
                capacity: range.capacity(),
            })?;
        allocated.insert(port);
        drop(allocated);

        debug!(port, range = %range, "[pn-01] Leased port from fixed range");
        Ok(self.lease(port))
    }

    fn next_dynamic(&self, range: PortRange) -> Result<PortLease, PortPoolError> {
        let capacity = range.capacity();
        let attempts = capacity.min(MAX_DYNAMIC_ATTEMPTS);
        if capacity == 0 {
            return Err(PortPoolError::NoFreePort { range, attempts: 0 });
        }
        let offset = rand::thread_rng().gen_range(0..capacity);

        for step in 0..attempts {
            let index = (offset + step) % capacity;
            let Ok(index) = u16::try_from(index) else {
                break;
            };
            let port = range.start + index;

            let mut allocated = self.allocated.lock();
            if allocated.contains(&port) || !self.probe.is_free(port) {
                continue;
            }
            allocated.insert(port);
            drop(allocated);

            debug!(port, range = %range, "[pn-01] Leased dynamic port");
            return Ok(self.lease(port));
        }

        warn!(range = %range, attempts, "[pn-01] No free dynamic port");
        Err(PortPoolError::NoFreePort { range, attempts })
    }

    fn lease(&self, port: u16) -> PortLease {
        PortLease {
            port,
            allocations: Some(Arc::clone(&self.allocated)),
        }
    }
}

impl fmt::Debug for PortPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortPool")
            .field("kind", &self.kind)
            .field("leased", &self.leased())
            .finish()
    }
}

/// A port handed out by a [`PortPool`], returned to the pool on drop.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    allocations: Option<Allocations>,
}

impl PortLease {
    /// The leased port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        if let Some(allocations) = &self.allocations {
            allocations.lock().remove(&self.port);
            debug!(port = self.port, "[pn-01] Released port");
        }
    }
}
