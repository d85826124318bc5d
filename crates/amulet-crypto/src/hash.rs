//! Hash functions for candidate digests

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 hash, lowercase hex encoded
pub fn sha256_hex(data: &[u8]) -> HexDigest {
    HexDigest(hex::encode(sha256(data)))
}

/// A lowercase hex-encoded digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexDigest(String);

impl HexDigest {
    /// Wrap an already hex-encoded digest, normalising to lowercase.
    /// Returns `None` if `hex` contains anything but hex digits.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        if hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for HexDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest function applied to candidate bytes.
///
/// Implementations must be pure: the same bytes always produce the same digest.
pub trait DigestHasher: Send + Sync {
    /// Short algorithm name (e.g. "SHA-256")
    fn algorithm(&self) -> &'static str;

    /// Hash `data` and return the hex-encoded digest
    fn hex_digest(&self, data: &[u8]) -> HexDigest;
}

/// SHA-256 digest hasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl DigestHasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        "SHA-256"
    }

    fn hex_digest(&self, data: &[u8]) -> HexDigest {
        sha256_hex(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let result = sha256(b"hello");
        assert_eq!(
            hex::encode(result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_hex_is_lowercase_and_full_length() {
        let digest = sha256_hex("amulet probe 174".as_bytes());
        assert_eq!(digest.len(), DIGEST_HEX_LEN);
        assert_eq!(
            digest.as_str(),
            "2743ea51fa660a60307b8888b91d37ffb8828a4d844f16d1fe832afdf76e12e2"
        );
    }

    #[test]
    fn test_hasher_is_deterministic() {
        let hasher = Sha256Hasher;
        let a = hasher.hex_digest("the same words".as_bytes());
        let b = hasher.hex_digest("the same words".as_bytes());
        assert_eq!(a, b);
        assert_ne!(a, hasher.hex_digest("other words".as_bytes()));
    }

    #[test]
    fn test_from_hex() {
        let digest = HexDigest::from_hex("ABCDEF8888").unwrap();
        assert_eq!(digest.as_str(), "abcdef8888");
        assert!(HexDigest::from_hex("xyz").is_none());
    }
}
