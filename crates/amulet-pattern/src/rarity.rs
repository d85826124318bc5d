//! Rarity tiers derived from runs of the lucky digit

use std::fmt;

use serde::{Deserialize, Serialize};

/// The hex digit whose runs decide rarity
pub const LUCKY_DIGIT: char = '8';

/// Shortest run that still counts as an amulet
pub const MIN_RUN: usize = 4;

/// Longest run with its own tier
pub const MAX_RUN: usize = 10;

const RUN_NEEDLE: &str = "8888888888";

/// Run length to tier, scanned longest first.
/// A digest holding both a 4-run and a 7-run must come out `Epic`.
pub const RUN_TIERS: [(usize, Rarity); 7] = [
    (10, Rarity::Unknown),
    (9, Rarity::Mythic),
    (8, Rarity::Legendary),
    (7, Rarity::Epic),
    (6, Rarity::Rare),
    (5, Rarity::Uncommon),
    (4, Rarity::Common),
];

/// Rarity tier of an amulet.
///
/// Variants are declared in rank order so the derived `Ord` matches `rank()`,
/// with `NotAnAmulet` sorting after every reportable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    #[serde(rename = "common")]
    Common,
    #[serde(rename = "uncommon")]
    Uncommon,
    #[serde(rename = "rare")]
    Rare,
    #[serde(rename = "epic")]
    Epic,
    #[serde(rename = "legendary")]
    Legendary,
    #[serde(rename = "mythic")]
    Mythic,
    #[serde(rename = "???")]
    Unknown,
    #[serde(rename = "not an amulet")]
    NotAnAmulet,
}

impl Rarity {
    /// All reportable tiers, lowest rank first
    pub const REPORTABLE: [Rarity; 7] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythic,
        Rarity::Unknown,
    ];

    /// Ranking used to order reports: common = 1 .. "???" = 7.
    /// `None` for digests that are not amulets.
    pub fn rank(self) -> Option<u8> {
        match self {
            Rarity::Common => Some(1),
            Rarity::Uncommon => Some(2),
            Rarity::Rare => Some(3),
            Rarity::Epic => Some(4),
            Rarity::Legendary => Some(5),
            Rarity::Mythic => Some(6),
            Rarity::Unknown => Some(7),
            Rarity::NotAnAmulet => None,
        }
    }

    /// Run length of the lucky digit that earns this tier
    pub fn run_length(self) -> Option<usize> {
        RUN_TIERS
            .iter()
            .find(|(_, tier)| *tier == self)
            .map(|(len, _)| *len)
    }

    pub fn is_reportable(self) -> bool {
        self != Rarity::NotAnAmulet
    }

    /// Label used in reports and storage
    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
            Rarity::Unknown => "???",
            Rarity::NotAnAmulet => "not an amulet",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a hex digest by its longest run of the lucky digit
pub fn classify(digest: &str) -> Rarity {
    for (len, tier) in RUN_TIERS {
        if digest.contains(&RUN_NEEDLE[..len]) {
            return tier;
        }
    }
    Rarity::NotAnAmulet
}

/// Length of the longest run of `digit` in `digest`
pub fn longest_run(digest: &str, digit: char) -> usize {
    let mut best = 0;
    let mut current = 0;
    for c in digest.chars() {
        if c == digit {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_run_length_maps_to_its_tier() {
        assert_eq!(classify("00008888000"), Rarity::Common);
        assert_eq!(classify("0888880"), Rarity::Uncommon);
        assert_eq!(classify("08888880"), Rarity::Rare);
        assert_eq!(classify("088888880"), Rarity::Epic);
        assert_eq!(classify("0888888880"), Rarity::Legendary);
        assert_eq!(classify("08888888880"), Rarity::Mythic);
        assert_eq!(classify("088888888880"), Rarity::Unknown);
    }

    #[test]
    fn test_runs_longer_than_ten_stay_unknown() {
        assert_eq!(classify(&"8".repeat(64)), Rarity::Unknown);
    }

    #[test]
    fn test_longest_run_wins() {
        // A 4-run early and a 7-run later
        assert_eq!(classify("8888a1b2c38888888d"), Rarity::Epic);
        // Exactly eight, followed by f
        assert_eq!(
            classify("0a88888888f3b8888c0000000000000000000000000000000000000000000000"),
            Rarity::Legendary
        );
    }

    #[test]
    fn test_short_runs_are_not_amulets() {
        assert_eq!(classify("888a888b88c8"), Rarity::NotAnAmulet);
        assert_eq!(classify(""), Rarity::NotAnAmulet);
        assert_eq!(
            classify("537c19034d491dbde34aceae364b22dc06644e5d3df5c2e2ce6690fe515f4d63"),
            Rarity::NotAnAmulet
        );
    }

    #[test]
    fn test_rank_order() {
        let ranks: Vec<u8> = Rarity::REPORTABLE.iter().filter_map(|r| r.rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(Rarity::NotAnAmulet.rank(), None);
        assert!(Rarity::Common < Rarity::Unknown);
        assert!(Rarity::Unknown < Rarity::NotAnAmulet);
    }

    #[test]
    fn test_run_length_lookup() {
        assert_eq!(Rarity::Legendary.run_length(), Some(8));
        assert_eq!(Rarity::Unknown.run_length(), Some(MAX_RUN));
        assert_eq!(Rarity::Common.run_length(), Some(MIN_RUN));
        assert_eq!(Rarity::NotAnAmulet.run_length(), None);
    }

    #[test]
    fn test_longest_run_agrees_with_classifier() {
        let digest = "4f8888888401d92fd7706e7abf40473fe9cf76b2a2ad2a2ea1c29a6fdfea69b2";
        assert_eq!(longest_run(digest, LUCKY_DIGIT), 7);
        assert_eq!(classify(digest), Rarity::Epic);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Rarity::Unknown.to_string(), "???");
        assert_eq!(Rarity::NotAnAmulet.to_string(), "not an amulet");
        assert_eq!(Rarity::Mythic.label(), "mythic");
    }
}
