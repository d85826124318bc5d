//! Amulet Crypto Primitives
//!
//! Digest computation for amulet candidates.

pub mod hash;

pub use self::hash::{sha256, sha256_hex, DigestHasher, HexDigest, Sha256Hasher, DIGEST_HEX_LEN};
