//! # HMAC Dialog Signer
//!
//! Every provider identity signs with its own key: the MAC is keyed by the
//! node secret and prefixed with the identity's address, so signatures of
//! one identity never verify for another.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use pn_03_dialog::{Signature, Signer, SignerFactory};
use sha2::Sha256;
use shared_types::Identity;

type HmacSha256 = Hmac<Sha256>;

const IDENTITY_SEPARATOR: u8 = 0x1f;

/// Produces [`HmacSigner`]s from one node secret.
#[derive(Clone)]
pub struct HmacSignerFactory {
    mac: HmacSha256,
}

impl HmacSignerFactory {
    /// # Errors
    ///
    /// Never for HMAC-SHA256, which accepts keys of any length; the error
    /// type is the `hmac` crate's.
    pub fn new(secret: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    /// Concrete signer for `identity`.
    #[must_use]
    pub fn signer(&self, identity: &Identity) -> HmacSigner {
        let mut mac = self.mac.clone();
        mac.update(identity.address.as_bytes());
        mac.update(&[IDENTITY_SEPARATOR]);
        HmacSigner {
            identity: identity.clone(),
            mac,
        }
    }
}

impl SignerFactory for HmacSignerFactory {
    fn signer_for(&self, identity: &Identity) -> Arc<dyn Signer> {
        Arc::new(self.signer(identity))
    }
}

/// Signs dialog messages on behalf of one identity.
pub struct HmacSigner {
    identity: Identity,
    mac: HmacSha256,
}

impl HmacSigner {
    /// Check a signature produced by this signer.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(&signature.0).is_ok()
    }
}

impl Signer for HmacSigner {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn sign(&self, message: &[u8]) -> Signature {
        let mut mac = self.mac.clone();
        mac.update(message);
        Signature(mac.finalize().into_bytes().to_vec())
    }
}
