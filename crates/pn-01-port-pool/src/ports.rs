//! Outbound ports of the port pool.

use std::net::{Ipv4Addr, UdpSocket};

/// Checks whether a local port is currently free on the host.
pub trait PortProbe: Send + Sync {
    fn is_free(&self, port: u16) -> bool;
}

/// Probes by binding a UDP socket on all interfaces.
///
/// The socket is closed again immediately, so the answer is only a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpProbe;

impl PortProbe for UdpProbe {
    fn is_free(&self, port: u16) -> bool {
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
    }
}
