//! Peer authorization.

use std::collections::HashSet;

use shared_types::Identity;

use super::errors::DialogError;

/// Decides whether a peer may open a dialog.
pub trait PeerValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`DialogError::IdentityNotAllowed`] for a refused peer.
    fn validate(&self, peer: &Identity) -> Result<(), DialogError>;
}

/// Validator over a fixed set of identities. An empty set admits everyone.
#[derive(Debug, Clone, Default)]
pub struct AllowListValidator {
    allowed: HashSet<Identity>,
}

impl AllowListValidator {
    #[must_use]
    pub fn new(allowed: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Validator admitting every peer.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// Whether the list is empty, i.e. every peer is admitted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl PeerValidator for AllowListValidator {
    fn validate(&self, peer: &Identity) -> Result<(), DialogError> {
        if self.allowed.is_empty() || self.allowed.contains(peer) {
            return Ok(());
        }
        Err(DialogError::IdentityNotAllowed(peer.clone()))
    }
}
