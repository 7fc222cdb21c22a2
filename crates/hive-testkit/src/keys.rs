//! Deterministic test keys

use hive_crypto::{keccak256, KeyScheme, OperatorKey, ECDSA_DER_PREFIX, ED25519_DER_PREFIX};

/// Operator account used by fixtures
pub const TEST_ACCOUNT: &str = "0.0.1001";

/// 32-byte secret derived from a label
pub fn test_secret(label: &str) -> [u8; 32] {
    keccak256(label.as_bytes())
}

/// Key for `scheme` derived from a label
///
/// Keccak output is a valid secp256k1 scalar for every label used in tests.
pub fn test_key(scheme: KeyScheme, label: &str) -> OperatorKey {
    match OperatorKey::from_secret_bytes(scheme, &test_secret(label)) {
        Ok(key) => key,
        Err(e) => panic!("test key '{}' rejected: {}", label, e),
    }
}

/// Raw hex of a label's secret, `0x`-prefixed
pub fn test_key_hex(label: &str) -> String {
    format!("0x{}", hex::encode(test_secret(label)))
}

/// DER hex of a label's secret under `scheme`
pub fn test_key_der_hex(scheme: KeyScheme, label: &str) -> String {
    let prefix: &[u8] = match scheme {
        KeyScheme::Ed25519 => &ED25519_DER_PREFIX,
        KeyScheme::Ecdsa => &ECDSA_DER_PREFIX,
    };
    format!("{}{}", hex::encode(prefix), hex::encode(test_secret(label)))
}
