use shared_types::PortRange;
use thiserror::Error;

/// Errors from port allocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortPoolError {
    /// Every port of a fixed range is leased.
    #[error("port range {range} exhausted ({capacity} ports leased)")]
    Exhausted { range: PortRange, capacity: usize },

    /// No unbound port was found in the dynamic range.
    #[error("no free port in {range} after {attempts} attempts")]
    NoFreePort { range: PortRange, attempts: usize },
}
