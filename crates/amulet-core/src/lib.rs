//! Amulet Core Engine
//!
//! Parallel amulet mining, result aggregation and report persistence.

mod hit;
mod search;
mod stats;
mod report;
mod sink;

pub use hit::Hit;
pub use search::{mine, AmuletMiner, CancelToken, MineConfig, MineError, MineOutcome};
pub use stats::MineStats;
pub use report::{aggregate, aggregate_at, AttemptsPerHit, Report, ReportStats, TierCount, TIMESTAMP_FORMAT};
pub use sink::{CsvReportSink, ReportSink, SinkError, SinkReceipt, CSV_HEADER};

// Re-exports for convenience
pub use amulet_crypto::{DigestHasher, HexDigest, Sha256Hasher};
pub use amulet_pattern::{classify, DigestFilter, FilterConfig, Pattern, Rarity, Verdict};
pub use amulet_source::{CandidateSource, ListSource, MarkovChain, MarkovConfig, MarkovSource, SourceError, SourceKind};
