//! A candidate whose digest passed the gate

use serde::{Deserialize, Serialize};

use amulet_crypto::HexDigest;
use amulet_pattern::{classify, Rarity};

/// An amulet: candidate text, its digest and the tier the digest earns.
///
/// Fields are private so a hit never changes after the worker creates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    text: String,
    digest: HexDigest,
    rarity: Rarity,
}

impl Hit {
    /// Create a hit, classifying its digest
    pub fn new(text: impl Into<String>, digest: HexDigest) -> Self {
        let rarity = classify(digest.as_str());
        Self {
            text: text.into(),
            digest,
            rarity,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn digest(&self) -> &HexDigest {
        &self.digest
    }

    pub fn rarity(&self) -> Rarity {
        self.rarity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amulet_crypto::sha256_hex;

    #[test]
    fn test_hit_is_classified_on_creation() {
        let text = "amulet probe 174081";
        let hit = Hit::new(text, sha256_hex(text.as_bytes()));
        assert_eq!(hit.text(), text);
        assert_eq!(hit.rarity(), Rarity::Rare);
        assert!(hit.digest().as_str().contains("888888"));
    }
}
