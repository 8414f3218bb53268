use std::fmt;

use shared_types::Identity;

/// Transport channel of one service instance, `"{provider}.{service_type}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// Derive the channel for `provider` offering `service_type`.
    #[must_use]
    pub fn new(provider: &Identity, service_type: &str) -> Self {
        Self(format!("{}.{}", provider.address, service_type))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
