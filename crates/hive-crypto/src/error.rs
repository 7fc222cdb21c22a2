//! Cryptographic error types

use crate::keys::KeyScheme;
use thiserror::Error;

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors in key handling and signing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key or signature text is not valid hex
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Decoded key has a length no encoding of the scheme accepts
    #[error("Invalid {scheme} key length: {actual} bytes")]
    InvalidKeyLength {
        /// Scheme the bytes were parsed under
        scheme: KeyScheme,
        /// Length of the decoded key
        actual: usize,
    },

    /// Secret key bytes are rejected by the scheme
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    /// Public key bytes are rejected by the scheme
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature bytes are malformed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signature does not match message and key
    #[error("Signature verification failed")]
    VerificationFailed,

    /// Payload could not be serialized canonically
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(e: serde_json::Error) -> Self {
        CryptoError::Serialization(e.to_string())
    }
}
