//! # External Collaborator Ports
//!
//! Traits for the collaborators that live outside this workspace: location
//! and IP detection, the NAT forwarding service, NAT hole punching and the
//! blockchain/payment stack.
//!
//! The payment and registry collaborators are opaque to the provider core.
//! They are passed through to session-manager factories untouched, so their
//! ports carry no methods here.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;

use crate::entities::Location;
use crate::errors::{NatServiceError, ResolveError};

// =============================================================================
// RESOLVERS
// =============================================================================

/// Detects the node's geographic location.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn detect_location(&self) -> Result<Location, ResolveError>;
}

/// Detects the IP address of the interface used for outbound traffic.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn outbound_ip(&self) -> Result<IpAddr, ResolveError>;
}

// =============================================================================
// NAT
// =============================================================================

/// A forwarding rule from a VPN subnet to the provider's outbound interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatRule {
    /// VPN subnet in CIDR form.
    pub source_subnet: String,
    /// Outbound IP traffic is forwarded through.
    pub target_ip: IpAddr,
}

/// Host-level NAT forwarding used by the tunnel services.
#[async_trait]
pub trait NatService: Send + Sync {
    async fn enable(&self) -> Result<(), NatServiceError>;
    async fn disable(&self) -> Result<(), NatServiceError>;
    async fn add(&self, rule: &NatRule) -> Result<(), NatServiceError>;
    async fn del(&self, rule: &NatRule) -> Result<(), NatServiceError>;
}

/// Punches a hole towards a consumer behind NAT.
#[async_trait]
pub trait NatPinger: Send + Sync {
    async fn ping_target(&self, target: SocketAddr);
}

/// Tracks NAT traversal attempts.
pub trait NatTracker: Send + Sync {}

// =============================================================================
// BLOCKCHAIN & PAYMENTS (opaque)
// =============================================================================

/// Registers provider identities on chain.
pub trait IdentityRegistry: Send + Sync {}

/// Submits settlement transactions.
pub trait Transactor: Send + Sync {}

/// Reads on-chain state.
pub trait BlockchainHelper: Send + Sync {}

/// Stores payment promises received from consumers.
pub trait PromiseStorage: Send + Sync {}

/// Stores invoices issued to consumers.
pub trait InvoiceStorage: Send + Sync {}

