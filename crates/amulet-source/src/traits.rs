//! Candidate source trait and types

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by candidate sources
#[derive(Error, Debug)]
pub enum SourceError {
    /// One draw failed; later draws may succeed
    #[error("transient source fault: {0}")]
    Transient(String),
    /// The source cannot produce candidates any more
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus produced no usable sentences")]
    EmptyCorpus,
}

impl SourceError {
    /// Whether the error should abort the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SourceError::Transient(_))
    }
}

/// Kind of candidate source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Word-level Markov chain over a text corpus
    Markov,
    /// Fixed list of candidates, cycled
    List,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Markov => write!(f, "Markov chain"),
            SourceKind::List => write!(f, "Word list"),
        }
    }
}

/// Produces candidate texts on demand.
///
/// Implementations are shared by reference across worker threads, so every
/// draw must be safe to run concurrently with any other.
pub trait CandidateSource: Send + Sync {
    /// Short human-readable name
    fn name(&self) -> &str;

    /// Source kind
    fn kind(&self) -> SourceKind;

    /// Draw one candidate. `Ok(None)` means this draw produced nothing.
    fn draw(&self) -> Result<Option<String>, SourceError>;
}
