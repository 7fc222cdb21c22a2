//! Message signing over canonical JSON
//!
//! [`MessageSigner`] signs the canonical serialization of a payload, so any
//! party that re-serializes the same logical JSON obtains the same bytes.
//! Verification never fails loudly: malformed keys, malformed signatures and
//! payloads that cannot be serialized all report "not verified".

use serde::Serialize;

use crate::canonical::to_canonical_bytes;
use crate::error::Result;
use crate::keys::{OperatorKey, PublicKey, SignatureBytes};

/// Signs and verifies JSON payloads
pub struct MessageSigner;

impl MessageSigner {
    /// Sign the canonical JSON serialization of `payload`
    pub fn sign<T: Serialize + ?Sized>(payload: &T, key: &OperatorKey) -> Result<SignatureBytes> {
        let bytes = to_canonical_bytes(payload)?;
        Ok(key.sign(&bytes))
    }

    /// Verify a signature over the canonical JSON serialization of `payload`
    pub fn verify<T: Serialize + ?Sized>(
        payload: &T,
        signature: &SignatureBytes,
        public_key: &PublicKey,
    ) -> bool {
        let bytes = match to_canonical_bytes(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "payload not serializable, treating as unverified");
                return false;
            }
        };
        Self::verify_bytes(&bytes, signature, public_key)
    }

    /// Verify a signature over already-canonical bytes
    pub fn verify_bytes(bytes: &[u8], signature: &SignatureBytes, public_key: &PublicKey) -> bool {
        match public_key.verify(bytes, signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(scheme = %public_key.scheme(), error = %e, "signature rejected");
                false
            }
        }
    }
}
