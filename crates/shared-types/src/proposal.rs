//! # Service Proposals
//!
//! A proposal is the market-facing description of a running service. It is
//! produced once per successful factory invocation and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::entities::{Identity, Location};
use crate::options::TransportProtocol;

/// Proposal format version advertised to consumers.
pub const PROPOSAL_FORMAT: &str = "service-proposal/v3";

/// Location as advertised in a proposal.
///
/// Unlike [`Location`] it does not carry the node's IP address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalLocation {
    pub continent: String,
    pub country: String,
    pub city: String,
    pub asn: u32,
    pub isp: String,
    pub node_type: String,
}

impl From<&Location> for ProposalLocation {
    fn from(location: &Location) -> Self {
        Self {
            continent: location.continent.clone(),
            country: location.country.clone(),
            city: location.city.clone(),
            asn: location.asn,
            isp: location.isp.clone(),
            node_type: location.node_type.clone(),
        }
    }
}

/// Protocol-specific metadata of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServiceDefinition {
    /// OpenVPN tunnel over the given transport.
    Openvpn { protocol: TransportProtocol },
    /// WireGuard tunnel (always UDP).
    Wireguard,
    /// No tunnel at all.
    Noop,
}

/// Market-facing descriptor of a runnable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProposal {
    /// Proposal format version.
    pub format: String,
    /// Service type identifier (`"openvpn"`, `"wireguard"`, `"noop"`).
    pub service_type: String,
    /// Provider offering the service; stamped by the services manager.
    pub provider_id: Option<Identity>,
    /// Where the service runs.
    pub location: ProposalLocation,
    /// Protocol metadata.
    pub service_definition: ServiceDefinition,
}

impl ServiceProposal {
    /// Create a proposal for `service_type` at `location`.
    #[must_use]
    pub fn new(
        service_type: &str,
        location: &Location,
        service_definition: ServiceDefinition,
    ) -> Self {
        Self {
            format: PROPOSAL_FORMAT.to_string(),
            service_type: service_type.to_string(),
            provider_id: None,
            location: ProposalLocation::from(location),
            service_definition,
        }
    }

    /// Return the proposal stamped with the offering provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Identity) -> Self {
        self.provider_id = Some(provider);
        self
    }
}
