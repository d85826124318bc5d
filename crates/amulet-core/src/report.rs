//! Result aggregation and run reports

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use tracing::warn;

use amulet_pattern::Rarity;

use crate::hit::Hit;

/// Timestamp format used for report rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attempts spent per hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptsPerHit {
    Ratio(f64),
    /// No hits were found
    Unbounded,
}

impl AttemptsPerHit {
    fn new(attempts: u64, hits: usize) -> Self {
        if hits == 0 {
            AttemptsPerHit::Unbounded
        } else {
            AttemptsPerHit::Ratio(attempts as f64 / hits as f64)
        }
    }

    pub fn ratio(self) -> Option<f64> {
        match self {
            AttemptsPerHit::Ratio(r) => Some(r),
            AttemptsPerHit::Unbounded => None,
        }
    }
}

impl fmt::Display for AttemptsPerHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptsPerHit::Ratio(r) => write!(f, "{:.2}", r),
            AttemptsPerHit::Unbounded => f.write_str("Infinity"),
        }
    }
}

impl Serialize for AttemptsPerHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttemptsPerHit::Ratio(r) => serializer.serialize_f64(*r),
            AttemptsPerHit::Unbounded => serializer.serialize_str("Infinity"),
        }
    }
}

/// Number of hits in one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierCount {
    pub rarity: Rarity,
    pub count: usize,
}

/// Run-level aggregates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    /// Attempts completed
    pub attempts: u64,
    /// Reportable hits
    pub hits: usize,
    /// Hits dropped because their digest earned no tier
    pub excluded: usize,
    /// Distinct hit texts
    pub unique_texts: usize,
    /// Sum of hit text lengths in characters
    pub total_chars: usize,
    /// Sum of hit text lengths in UTF-8 bytes
    pub total_bytes: usize,
    /// Mean hit text length in characters (0 when there are no hits)
    pub average_length: f64,
    pub attempts_per_hit: AttemptsPerHit,
    pub elapsed_secs: f64,
    /// Non-empty tiers, lowest rank first
    pub tiers: Vec<TierCount>,
}

impl ReportStats {
    /// Hits in `rarity`
    pub fn count(&self, rarity: Rarity) -> usize {
        self.tiers
            .iter()
            .find(|t| t.rarity == rarity)
            .map_or(0, |t| t.count)
    }
}

/// Ordered hits of one run plus its aggregates
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Captured once when the report is built; shared by every row
    pub timestamp: DateTime<Local>,
    /// Hits sorted by ascending rarity rank, collection order within a tier
    pub entries: Vec<Hit>,
    pub stats: ReportStats,
}

impl Report {
    /// Timestamp rendered for storage
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as pretty JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Aggregate a closed hit collection, stamping it with the current time
pub fn aggregate(hits: Vec<Hit>, attempts: u64, elapsed: Duration) -> Report {
    aggregate_at(hits, attempts, elapsed, Local::now())
}

/// Aggregate a closed hit collection with an explicit timestamp
pub fn aggregate_at(hits: Vec<Hit>, attempts: u64, elapsed: Duration, timestamp: DateTime<Local>) -> Report {
    let total = hits.len();
    let mut entries: Vec<Hit> = hits.into_iter().filter(|h| h.rarity().is_reportable()).collect();
    let excluded = total - entries.len();
    if excluded > 0 {
        warn!(excluded, "Dropped hits whose digest earned no rarity tier");
    }

    // `sort_by_key` is stable: equal tiers keep collection order
    entries.sort_by_key(|h| h.rarity().rank());

    let unique_texts = entries
        .iter()
        .map(|h| h.text())
        .collect::<HashSet<_>>()
        .len();
    let total_chars: usize = entries.iter().map(|h| h.text().chars().count()).sum();
    let total_bytes: usize = entries.iter().map(|h| h.text().len()).sum();
    let average_length = if entries.is_empty() {
        0.0
    } else {
        total_chars as f64 / entries.len() as f64
    };

    let tiers = Rarity::REPORTABLE
        .iter()
        .map(|&rarity| TierCount {
            rarity,
            count: entries.iter().filter(|h| h.rarity() == rarity).count(),
        })
        .filter(|t| t.count > 0)
        .collect();

    let stats = ReportStats {
        attempts,
        hits: entries.len(),
        excluded,
        unique_texts,
        total_chars,
        total_bytes,
        average_length,
        attempts_per_hit: AttemptsPerHit::new(attempts, entries.len()),
        elapsed_secs: elapsed.as_secs_f64(),
        tiers,
    };

    Report {
        timestamp,
        entries,
        stats,
    }
}
