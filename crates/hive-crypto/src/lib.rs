//! # HiveMind Cryptography
//!
//! Key material and message authentication for HiveMind:
//! - Operator key parsing over two signature schemes with an explicit,
//!   ordered list of parser attempts
//! - Canonical JSON serialization shared by signer and verifier
//! - Deterministic signing and non-panicking verification
//! - Keccak-256 for contract function selectors
//!
//! ## Schemes
//!
//! | Scheme | Public key | Signature |
//! |--------|------------|-----------|
//! | Ed25519 | 32 bytes | 64 bytes |
//! | ECDSA secp256k1 | 33 bytes (compressed) | 64 bytes (`r ‖ s`) |

pub mod canonical;
pub mod error;
pub mod hash;
pub mod keys;
pub mod signer;

pub use canonical::*;
pub use error::*;
pub use hash::*;
pub use keys::*;
pub use signer::*;

/// Cryptographic prelude
pub mod prelude {
    pub use crate::canonical::to_canonical_bytes;
    pub use crate::error::{CryptoError, Result};
    pub use crate::keys::{
        parse_private_key, KeyParseOutcome, KeyScheme, OperatorKey, ParsedKey, PublicKey,
        SignatureBytes,
    };
    pub use crate::signer::MessageSigner;
}
