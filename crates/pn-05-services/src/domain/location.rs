use std::net::IpAddr;

use shared_types::Location;

/// Location details a running OpenVPN service hands to its consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocationInfo {
    pub public_ip: IpAddr,
    pub outbound_ip: IpAddr,
    pub country: String,
}

impl ServiceLocationInfo {
    #[must_use]
    pub fn new(location: &Location, outbound_ip: IpAddr) -> Self {
        Self {
            public_ip: location.ip,
            outbound_ip,
            country: location.country.clone(),
        }
    }
}
