//! Operator key material
//!
//! Private keys arrive as hex text, optionally `0x`-prefixed, in one of two
//! signature schemes. Parsing is an explicit ordered list of attempts that
//! yields a tagged [`KeyParseOutcome`] instead of relying on error-driven
//! fallback, so the policy can be inspected and tested.
//!
//! | Scheme | Raw form | DER prefix |
//! |--------|----------|------------|
//! | Ed25519 | 32-byte seed (or seed ‖ public key) | `302e020100300506032b657004220420` |
//! | ECDSA secp256k1 | 32-byte scalar | `3030020100300706052b8104000a04220420` |

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// DER prefix of a PKCS#8 Ed25519 private key
pub const ED25519_DER_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// DER prefix of a secp256k1 private key as exported by the ledger tooling
pub const ECDSA_DER_PREFIX: [u8; 18] = [
    0x30, 0x30, 0x02, 0x01, 0x00, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x04, 0x22,
    0x04, 0x20,
];

/// Raw private key size for both schemes
pub const SECRET_KEY_SIZE: usize = 32;

/// Ed25519 public key size
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Compressed SEC1 secp256k1 public key size
pub const ECDSA_PUBLIC_KEY_SIZE: usize = 33;

/// Default order of parser attempts
pub const DEFAULT_SCHEME_ORDER: [KeyScheme; 2] = [KeyScheme::Ed25519, KeyScheme::Ecdsa];

/// Supported signature schemes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    /// Ed25519 (EdDSA over Curve25519)
    Ed25519,
    /// ECDSA over secp256k1
    Ecdsa,
}

impl fmt::Display for KeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScheme::Ed25519 => write!(f, "ED25519"),
            KeyScheme::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

impl FromStr for KeyScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyScheme::Ed25519),
            "ecdsa" | "ecdsa_secp256k1" | "secp256k1" => Ok(KeyScheme::Ecdsa),
            other => Err(CryptoError::InvalidSecretKey(format!(
                "unknown key scheme '{}'",
                other
            ))),
        }
    }
}

/// Public half of an operator or agent key
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    scheme: KeyScheme,
    #[serde(with = "hex_bytes")]
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create from raw bytes, validating the length for the scheme
    pub fn from_bytes(scheme: KeyScheme, bytes: &[u8]) -> Result<Self> {
        let expected = match scheme {
            KeyScheme::Ed25519 => ED25519_PUBLIC_KEY_SIZE,
            KeyScheme::Ecdsa => ECDSA_PUBLIC_KEY_SIZE,
        };
        if bytes.len() != expected {
            return Err(CryptoError::InvalidPublicKey(format!(
                "{} public key must be {} bytes, got {}",
                scheme,
                expected,
                bytes.len()
            )));
        }
        Ok(Self {
            scheme,
            bytes: bytes.to_vec(),
        })
    }

    /// Create from hex text (optionally `0x`-prefixed)
    pub fn from_hex(scheme: KeyScheme, s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_hex_prefix(s))?;
        Self::from_bytes(scheme, &bytes)
    }

    /// Signature scheme of this key
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Raw key bytes (32 for Ed25519, 33 compressed for ECDSA)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex encoding of the raw bytes
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Verify a signature over `message`
    pub fn verify(&self, message: &[u8], signature: &SignatureBytes) -> Result<()> {
        match self.scheme {
            KeyScheme::Ed25519 => {
                let key_bytes: [u8; ED25519_PUBLIC_KEY_SIZE] = self
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| CryptoError::InvalidPublicKey("bad length".to_string()))?;
                let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
                let sig = ed25519_dalek::Signature::from_slice(signature.as_bytes())
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                verifying_key
                    .verify(message, &sig)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
            KeyScheme::Ecdsa => {
                let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.bytes)
                    .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
                let sig = k256::ecdsa::Signature::from_slice(signature.as_bytes())
                    .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
                verifying_key
                    .verify(message, &sig)
                    .map_err(|_| CryptoError::VerificationFailed)
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PublicKey({}, {}...)", self.scheme, &hex[..16.min(hex.len())])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Signature bytes (64 bytes for both schemes; ECDSA is compact `r ‖ s`)
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureBytes(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl SignatureBytes {
    /// Raw signature bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from hex text
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex::decode(strip_hex_prefix(s))?))
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}...)", &hex[..16.min(hex.len())])
    }
}

/// Private signing key under one of the supported schemes
///
/// Both inner key types zeroize their secret on drop.
pub enum OperatorKey {
    /// Ed25519 signing key
    Ed25519(ed25519_dalek::SigningKey),
    /// secp256k1 ECDSA signing key
    Ecdsa(k256::ecdsa::SigningKey),
}

impl OperatorKey {
    /// Build a key from raw 32-byte secret material
    pub fn from_secret_bytes(scheme: KeyScheme, secret: &[u8]) -> Result<Self> {
        match scheme {
            KeyScheme::Ed25519 => parse_ed25519(secret).map(OperatorKey::Ed25519),
            KeyScheme::Ecdsa => parse_ecdsa(secret).map(OperatorKey::Ecdsa),
        }
    }

    /// Signature scheme of this key
    pub fn scheme(&self) -> KeyScheme {
        match self {
            OperatorKey::Ed25519(_) => KeyScheme::Ed25519,
            OperatorKey::Ecdsa(_) => KeyScheme::Ecdsa,
        }
    }

    /// Derive the public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            OperatorKey::Ed25519(key) => PublicKey {
                scheme: KeyScheme::Ed25519,
                bytes: key.verifying_key().to_bytes().to_vec(),
            },
            OperatorKey::Ecdsa(key) => PublicKey {
                scheme: KeyScheme::Ecdsa,
                bytes: key
                    .verifying_key()
                    .as_affine()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec(),
            },
        }
    }

    /// Deterministically sign a message
    pub fn sign(&self, message: &[u8]) -> SignatureBytes {
        match self {
            OperatorKey::Ed25519(key) => SignatureBytes(key.sign(message).to_bytes().to_vec()),
            OperatorKey::Ecdsa(key) => {
                let sig: k256::ecdsa::Signature = key.sign(message);
                SignatureBytes(sig.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperatorKey({}, <redacted>)", self.scheme())
    }
}

/// A key that parsed successfully, tagged with its scheme
#[derive(Debug)]
pub struct ParsedKey {
    /// Scheme whose parser accepted the input
    pub scheme: KeyScheme,
    /// The parsed key
    pub key: OperatorKey,
}

/// Result of running the ordered parser attempts
#[derive(Debug)]
pub enum KeyParseOutcome {
    /// One parser accepted the key
    Parsed(ParsedKey),
    /// Every attempted parser rejected the key
    NoneParsed {
        /// Each attempted scheme with the reason it rejected the input
        attempts: Vec<(KeyScheme, CryptoError)>,
    },
}

impl KeyParseOutcome {
    /// Convert into an `Option`, discarding the attempt log
    pub fn into_parsed(self) -> Option<ParsedKey> {
        match self {
            KeyParseOutcome::Parsed(parsed) => Some(parsed),
            KeyParseOutcome::NoneParsed { .. } => None,
        }
    }
}

/// Remove a leading `0x`/`0X` and surrounding whitespace
pub fn strip_hex_prefix(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Parse a private key string by trying each scheme in `order`
///
/// The first parser that accepts the bytes wins. An input that is not hex at
/// all is reported against every scheme.
pub fn parse_private_key(raw: &str, order: &[KeyScheme]) -> KeyParseOutcome {
    let decoded = match hex::decode(strip_hex_prefix(raw)) {
        Ok(bytes) => Zeroizing::new(bytes),
        Err(e) => {
            let err = CryptoError::from(e);
            return KeyParseOutcome::NoneParsed {
                attempts: order.iter().map(|s| (*s, err.clone())).collect(),
            };
        }
    };

    let mut attempts = Vec::with_capacity(order.len());
    for scheme in order {
        let result = match scheme {
            KeyScheme::Ed25519 => parse_ed25519(&decoded).map(OperatorKey::Ed25519),
            KeyScheme::Ecdsa => parse_ecdsa(&decoded).map(OperatorKey::Ecdsa),
        };
        match result {
            Ok(key) => {
                tracing::debug!(scheme = %scheme, "private key parsed");
                return KeyParseOutcome::Parsed(ParsedKey {
                    scheme: *scheme,
                    key,
                });
            }
            Err(e) => {
                tracing::debug!(scheme = %scheme, error = %e, "key parser rejected input");
                attempts.push((*scheme, e));
            }
        }
    }

    KeyParseOutcome::NoneParsed { attempts }
}

fn parse_ed25519(bytes: &[u8]) -> Result<ed25519_dalek::SigningKey> {
    let (seed, embedded_public) = match bytes.len() {
        SECRET_KEY_SIZE => (bytes, None),
        48 if bytes.starts_with(&ED25519_DER_PREFIX) => (&bytes[ED25519_DER_PREFIX.len()..], None),
        64 => (&bytes[..SECRET_KEY_SIZE], Some(&bytes[SECRET_KEY_SIZE..])),
        actual => {
            return Err(CryptoError::InvalidKeyLength {
                scheme: KeyScheme::Ed25519,
                actual,
            })
        }
    };

    let mut seed_arr = Zeroizing::new([0u8; SECRET_KEY_SIZE]);
    seed_arr.copy_from_slice(seed);
    let key = ed25519_dalek::SigningKey::from_bytes(&seed_arr);

    // Seed ‖ public key form must be self-consistent
    if let Some(public) = embedded_public {
        if key.verifying_key().to_bytes().as_slice() != public {
            return Err(CryptoError::InvalidSecretKey(
                "embedded public key does not match seed".to_string(),
            ));
        }
    }

    Ok(key)
}

fn parse_ecdsa(bytes: &[u8]) -> Result<k256::ecdsa::SigningKey> {
    let scalar = match bytes.len() {
        SECRET_KEY_SIZE => bytes,
        50 if bytes.starts_with(&ECDSA_DER_PREFIX) => &bytes[ECDSA_DER_PREFIX.len()..],
        actual => {
            return Err(CryptoError::InvalidKeyLength {
                scheme: KeyScheme::Ecdsa,
                actual,
            })
        }
    };

    k256::ecdsa::SigningKey::from_slice(scalar)
        .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(super::strip_hex_prefix(&s)).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn ecdsa_der_hex() -> String {
        format!("{}{}", hex::encode(ECDSA_DER_PREFIX), SEED_HEX)
    }

    #[test]
    fn test_raw_hex_parses_as_ed25519_first() {
        let outcome = parse_private_key(SEED_HEX, &DEFAULT_SCHEME_ORDER);
        let parsed = outcome.into_parsed().unwrap();
        assert_eq!(parsed.scheme, KeyScheme::Ed25519);
    }

    #[test]
    fn test_prefix_is_stripped() {
        let with_prefix = format!("0x{}", SEED_HEX);
        let a = parse_private_key(&with_prefix, &DEFAULT_SCHEME_ORDER)
            .into_parsed()
            .unwrap();
        let b = parse_private_key(SEED_HEX, &DEFAULT_SCHEME_ORDER)
            .into_parsed()
            .unwrap();
        assert_eq!(a.key.public_key(), b.key.public_key());
    }

    #[test]
    fn test_ed25519_der_form() {
        let der = format!("{}{}", hex::encode(ED25519_DER_PREFIX), SEED_HEX);
        let parsed = parse_private_key(&der, &DEFAULT_SCHEME_ORDER)
            .into_parsed()
            .unwrap();
        let raw = parse_private_key(SEED_HEX, &DEFAULT_SCHEME_ORDER)
            .into_parsed()
            .unwrap();
        assert_eq!(parsed.scheme, KeyScheme::Ed25519);
        assert_eq!(parsed.key.public_key(), raw.key.public_key());
    }

    #[test]
    fn test_ecdsa_der_falls_back_to_second_scheme() {
        let outcome = parse_private_key(&ecdsa_der_hex(), &DEFAULT_SCHEME_ORDER);
        let parsed = outcome.into_parsed().unwrap();
        assert_eq!(parsed.scheme, KeyScheme::Ecdsa);
        assert_eq!(parsed.key.public_key().as_bytes().len(), ECDSA_PUBLIC_KEY_SIZE);
    }

    #[test]
    fn test_pinned_order_only_tries_that_scheme() {
        let parsed = parse_private_key(SEED_HEX, &[KeyScheme::Ecdsa])
            .into_parsed()
            .unwrap();
        assert_eq!(parsed.scheme, KeyScheme::Ecdsa);
    }

    #[test]
    fn test_garbage_reports_every_attempt() {
        match parse_private_key("not-a-key", &DEFAULT_SCHEME_ORDER) {
            KeyParseOutcome::NoneParsed { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].0, KeyScheme::Ed25519);
                assert_eq!(attempts[1].0, KeyScheme::Ecdsa);
            }
            KeyParseOutcome::Parsed(_) => panic!("garbage must not parse"),
        }
    }

    #[test]
    fn test_wrong_length_rejected_by_both() {
        match parse_private_key("abcdef", &DEFAULT_SCHEME_ORDER) {
            KeyParseOutcome::NoneParsed { attempts } => {
                assert!(matches!(
                    attempts[0].1,
                    CryptoError::InvalidKeyLength { actual: 3, .. }
                ));
            }
            KeyParseOutcome::Parsed(_) => panic!("short key must not parse"),
        }
    }

    #[test]
    fn test_seed_and_public_key_form_checked() {
        let key = parse_private_key(SEED_HEX, &DEFAULT_SCHEME_ORDER)
            .into_parsed()
            .unwrap()
            .key;
        let good = format!("{}{}", SEED_HEX, key.public_key().to_hex());
        assert!(parse_private_key(&good, &[KeyScheme::Ed25519])
            .into_parsed()
            .is_some());

        let bad = format!("{}{}", SEED_HEX, "00".repeat(32));
        assert!(parse_private_key(&bad, &[KeyScheme::Ed25519])
            .into_parsed()
            .is_none());
    }

    #[test]
    fn test_sign_verify_both_schemes() {
        for scheme in DEFAULT_SCHEME_ORDER {
            let key = OperatorKey::from_secret_bytes(scheme, &hex::decode(SEED_HEX).unwrap())
                .unwrap();
            let sig = key.sign(b"hello ledger");
            assert!(key.public_key().verify(b"hello ledger", &sig).is_ok());
            assert_eq!(
                key.public_key().verify(b"hello ledgeR", &sig),
                Err(CryptoError::VerificationFailed)
            );
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        for scheme in DEFAULT_SCHEME_ORDER {
            let key = OperatorKey::from_secret_bytes(scheme, &hex::decode(SEED_HEX).unwrap())
                .unwrap();
            assert_eq!(key.sign(b"payload"), key.sign(b"payload"));
        }
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let key = OperatorKey::from_secret_bytes(KeyScheme::Ecdsa, &hex::decode(SEED_HEX).unwrap())
            .unwrap();
        let public = key.public_key();
        let restored = PublicKey::from_hex(KeyScheme::Ecdsa, &public.to_hex()).unwrap();
        assert_eq!(public, restored);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let seed = hex::decode(SEED_HEX).unwrap();
        let key = OperatorKey::from_secret_bytes(KeyScheme::Ed25519, &seed).unwrap();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains(SEED_HEX));
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("ED25519".parse::<KeyScheme>().unwrap(), KeyScheme::Ed25519);
        assert_eq!("ecdsa".parse::<KeyScheme>().unwrap(), KeyScheme::Ecdsa);
        assert!("rsa".parse::<KeyScheme>().is_err());
    }
}
