//! Digest gate applied to every candidate

use serde::{Deserialize, Serialize};

use amulet_crypto::{DigestHasher, HexDigest, Sha256Hasher};

use crate::matcher::{Pattern, PatternError};

/// Candidates longer than this (in UTF-8 bytes) are never hashed
pub const MAX_CANDIDATE_BYTES: usize = 64;

/// Filter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Maximum candidate length in UTF-8 bytes
    pub max_candidate_bytes: usize,
    /// Pattern a digest must match to pass
    pub gate: Pattern,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_candidate_bytes: MAX_CANDIDATE_BYTES,
            gate: Pattern::contains("8888"),
        }
    }
}

/// Outcome of running one candidate through the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the digest matched the gate
    pub passes: bool,
    /// The digest, `None` when the candidate was rejected before hashing
    pub digest: Option<HexDigest>,
}

impl Verdict {
    fn rejected() -> Self {
        Self {
            passes: false,
            digest: None,
        }
    }
}

/// Hashes candidates and gates them on a digest pattern
#[derive(Debug, Clone)]
pub struct DigestFilter<H = Sha256Hasher> {
    hasher: H,
    config: FilterConfig,
}

impl DigestFilter<Sha256Hasher> {
    /// SHA-256 filter with the default "8888" gate and 64-byte limit
    pub fn sha256() -> Self {
        Self {
            hasher: Sha256Hasher,
            config: FilterConfig::default(),
        }
    }
}

impl Default for DigestFilter<Sha256Hasher> {
    fn default() -> Self {
        Self::sha256()
    }
}

impl<H: DigestHasher> DigestFilter<H> {
    /// Create a filter, validating the gate pattern
    pub fn new(hasher: H, config: FilterConfig) -> Result<Self, PatternError> {
        config.gate.validate()?;
        Ok(Self { hasher, config })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Check one candidate.
    ///
    /// Over-long candidates are rejected without being hashed.
    pub fn check(&self, candidate: &str) -> Verdict {
        let bytes = candidate.as_bytes();
        if bytes.len() > self.config.max_candidate_bytes {
            return Verdict::rejected();
        }

        let digest = self.hasher.hex_digest(bytes);
        Verdict {
            passes: self.config.gate.is_match(digest.as_str()),
            digest: Some(digest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and delegates to SHA-256
    #[derive(Default)]
    struct CountingHasher {
        calls: AtomicUsize,
    }

    impl DigestHasher for CountingHasher {
        fn algorithm(&self) -> &'static str {
            "counting"
        }

        fn hex_digest(&self, data: &[u8]) -> HexDigest {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Sha256Hasher.hex_digest(data)
        }
    }

    fn counting_filter() -> DigestFilter<CountingHasher> {
        DigestFilter::new(CountingHasher::default(), FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_long_candidates_skip_hashing() {
        let filter = counting_filter();

        let verdict = filter.check(&"a".repeat(65));
        assert_eq!(verdict, Verdict { passes: false, digest: None });

        // 22 three-byte characters = 66 bytes but only 22 chars
        let verdict = filter.check(&"€".repeat(22));
        assert!(!verdict.passes);
        assert!(verdict.digest.is_none());

        assert_eq!(filter.hasher().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_boundary_length_is_hashed() {
        let filter = counting_filter();

        let verdict = filter.check(&"a".repeat(64));
        assert!(verdict.digest.is_some());
        assert_eq!(filter.hasher().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_known_digests() {
        let filter = DigestFilter::sha256();

        let hit = filter.check("amulet probe 174");
        assert!(hit.passes);
        assert_eq!(
            hit.digest.unwrap().as_str(),
            "2743ea51fa660a60307b8888b91d37ffb8828a4d844f16d1fe832afdf76e12e2"
        );

        let miss = filter.check("amulet probe 128");
        assert!(!miss.passes);
        assert_eq!(
            miss.digest.unwrap().as_str(),
            "537c19034d491dbde34aceae364b22dc06644e5d3df5c2e2ce6690fe515f4d63"
        );
    }

    #[test]
    fn test_filter_is_deterministic() {
        let filter = DigestFilter::sha256();
        for text in ["", "a", "the cat sat on the mat.", "amulet probe 1899"] {
            assert_eq!(filter.check(text), filter.check(text));
        }
    }

    #[test]
    fn test_invalid_gate_is_rejected() {
        let config = FilterConfig {
            gate: Pattern::contains("zz"),
            ..FilterConfig::default()
        };
        assert!(DigestFilter::new(Sha256Hasher, config).is_err());
    }
}
