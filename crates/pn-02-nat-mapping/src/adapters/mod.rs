//! Mapping backends.

mod disabled;
mod upnp;

pub use disabled::DisabledBackend;
pub use upnp::UpnpBackend;
