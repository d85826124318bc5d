//! Amulet Candidate Sources
//!
//! Trait-based abstraction over the text generators that feed the miner.

pub mod traits;
pub mod markov;
pub mod list;

pub use traits::{CandidateSource, SourceError, SourceKind};
pub use markov::{MarkovChain, MarkovConfig, MarkovSource};
pub use list::ListSource;
