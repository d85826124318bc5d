//! Amulet Pattern Engine
//!
//! Digest gating and rarity classification for amulet candidates.

mod matcher;
mod rarity;
mod filter;
pub mod odds;

pub use matcher::{Pattern, PatternError, HEX_ALPHABET};
pub use rarity::{classify, longest_run, Rarity, LUCKY_DIGIT, MAX_RUN, MIN_RUN, RUN_TIERS};
pub use filter::{DigestFilter, FilterConfig, Verdict, MAX_CANDIDATE_BYTES};
pub use odds::{expected_attempts, format_attempts, run_probability, tier_probability};
