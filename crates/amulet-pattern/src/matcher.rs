//! Hex digest pattern matching

use serde::{Deserialize, Serialize};
use thiserror::Error;

use amulet_crypto::DIGEST_HEX_LEN;

/// Characters that can appear in a hex digest
pub const HEX_ALPHABET: &str = "0123456789abcdef";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern is empty")]
    EmptyPattern,
    #[error("Pattern contains invalid character '{0}' (valid: {1})")]
    InvalidCharacter(char, String),
    #[error("Pattern too long (max {0} characters)")]
    PatternTooLong(usize),
}

/// A hex substring a digest must contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// The hex string to match (lowercase)
    pub value: String,
}

impl Pattern {
    /// Create a pattern matching anywhere in the digest
    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            value: value.into().to_ascii_lowercase(),
        }
    }

    /// Validate pattern against the hex alphabet and digest length
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.value.is_empty() {
            return Err(PatternError::EmptyPattern);
        }
        if self.value.len() > DIGEST_HEX_LEN {
            return Err(PatternError::PatternTooLong(DIGEST_HEX_LEN));
        }
        if let Some(c) = self.value.chars().find(|c| !HEX_ALPHABET.contains(*c)) {
            return Err(PatternError::InvalidCharacter(c, HEX_ALPHABET.to_string()));
        }
        Ok(())
    }

    /// Check a lowercase hex digest against this pattern
    pub fn is_match(&self, digest: &str) -> bool {
        digest.contains(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_match() {
        let pattern = Pattern::contains("8888");

        assert!(pattern.is_match("2743ea51fa660a60307b8888b91d"));
        assert!(pattern.is_match("8888"));
        assert!(!pattern.is_match("88a88b888c"));
    }

    #[test]
    fn test_pattern_is_lowercased() {
        let pattern = Pattern::contains("BEEF");
        assert_eq!(pattern.value, "beef");
        assert!(pattern.is_match("00beef00"));
    }

    #[test]
    fn test_validate_pattern() {
        assert!(Pattern::contains("8888").validate().is_ok());
        assert_eq!(Pattern::contains("").validate(), Err(PatternError::EmptyPattern));
        assert!(matches!(
            Pattern::contains("ghij").validate(),
            Err(PatternError::InvalidCharacter('g', _))
        ));
        assert_eq!(
            Pattern::contains("8".repeat(65)).validate(),
            Err(PatternError::PatternTooLong(64))
        );
    }
}
