//! Keccak-256 hashing
//!
//! Contract function selectors and deterministic test key derivation both
//! use the Ethereum flavour of Keccak (pre-NIST padding).

use sha3::{Digest, Keccak256};

/// Hash data with Keccak-256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_transfer_selector() {
        let digest = keccak256(b"transfer(address,uint256)");
        assert_eq!(hex::encode(&digest[..4]), "a9059cbb");
    }
}
