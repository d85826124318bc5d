//! Amulet mining engine

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use amulet_crypto::{DigestHasher, Sha256Hasher};
use amulet_pattern::{DigestFilter, Verdict};
use amulet_source::{CandidateSource, SourceError};

use crate::hit::Hit;
use crate::report::{aggregate, Report};
use crate::stats::MineStats;

/// How often progress callbacks fire
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Recoverable faults logged individually per worker before going quiet
const FAULT_LOG_LIMIT: u64 = 5;

/// Mining configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MineConfig {
    /// Number of workers (0 = auto)
    pub workers: usize,
    /// Attempts to dispatch
    pub attempts: u64,
    /// Attempts a worker claims at a time
    pub batch_size: usize,
    /// Maximum time in seconds (0 = unlimited)
    pub max_time_secs: u64,
}

impl Default for MineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            attempts: 500_000,
            batch_size: 1000,
            max_time_secs: 0,
        }
    }
}

impl MineConfig {
    /// Resolved worker count
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Caller-held signal that stops a run from dispatching new attempts.
///
/// Attempts already in flight finish and their hits are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fatal mining failures
#[derive(Error, Debug)]
pub enum MineError {
    #[error("candidate source unavailable after {attempts_completed} attempts: {reason}")]
    SourceUnavailable {
        reason: String,
        attempts_completed: u64,
        /// Hits collected before the failure
        hits: Vec<Hit>,
    },
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("mining worker panicked after {attempts_completed} attempts")]
    WorkerPanicked { attempts_completed: u64 },
}

impl MineError {
    /// Attempts that completed before the run failed
    pub fn attempts_completed(&self) -> u64 {
        match self {
            MineError::SourceUnavailable { attempts_completed, .. }
            | MineError::WorkerPanicked { attempts_completed } => *attempts_completed,
            MineError::Pool(_) => 0,
        }
    }

    /// Hits salvaged from the failed run
    pub fn partial_hits(&self) -> &[Hit] {
        match self {
            MineError::SourceUnavailable { hits, .. } => hits,
            _ => &[],
        }
    }

    /// Take ownership of the salvaged hits
    pub fn into_partial_hits(self) -> Vec<Hit> {
        match self {
            MineError::SourceUnavailable { hits, .. } => hits,
            _ => Vec::new(),
        }
    }
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct MineOutcome {
    /// Hits in collection order (worker by worker)
    pub hits: Vec<Hit>,
    /// Attempts completed
    pub attempts: u64,
    /// Attempts the run was configured for
    pub requested: u64,
    /// Attempts lost to recoverable faults (counted as misses)
    pub faults: u64,
    pub elapsed: Duration,
}

impl MineOutcome {
    /// Whether every configured attempt ran
    pub fn is_complete(&self) -> bool {
        self.attempts >= self.requested
    }

    /// Aggregate the hits into a report
    pub fn into_report(self) -> Report {
        aggregate(self.hits, self.attempts, self.elapsed)
    }
}

enum Attempt {
    Miss,
    Hit(Hit),
    Fault(String),
    Fatal(SourceError),
}

/// Parallel amulet miner
pub struct AmuletMiner<H = Sha256Hasher> {
    source: Arc<dyn CandidateSource>,
    filter: DigestFilter<H>,
    config: MineConfig,
    cancel: CancelToken,
    hit_feed: Option<Sender<Hit>>,
}

impl AmuletMiner<Sha256Hasher> {
    /// Create a miner with the default SHA-256 "8888" filter
    pub fn new(source: Arc<dyn CandidateSource>, config: MineConfig) -> Self {
        Self::with_filter(source, DigestFilter::sha256(), config)
    }
}

impl<H: DigestHasher> AmuletMiner<H> {
    /// Create a miner with a custom filter
    pub fn with_filter(source: Arc<dyn CandidateSource>, filter: DigestFilter<H>, config: MineConfig) -> Self {
        Self {
            source,
            filter,
            config,
            cancel: CancelToken::new(),
            hit_feed: None,
        }
    }

    pub fn config(&self) -> &MineConfig {
        &self.config
    }

    /// Token that cancels this miner's runs
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Receive each hit as soon as a worker finds it.
    /// Subscribing again replaces the previous feed.
    pub fn subscribe(&mut self) -> Receiver<Hit> {
        let (tx, rx) = unbounded();
        self.hit_feed = Some(tx);
        rx
    }

    /// Run the configured attempts, blocking until all have resolved
    pub fn run(&self) -> Result<MineOutcome, MineError> {
        self.run_with_callback(|_| {})
    }

    /// Run with a callback fired periodically with live stats
    pub fn run_with_callback<F>(&self, mut callback: F) -> Result<MineOutcome, MineError>
    where
        F: FnMut(&MineStats),
    {
        let stats = MineStats::new(self.config.attempts);
        let workers = self.config.worker_count().max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("amulet-worker-{i}"))
            .build()?;

        info!(
            workers,
            attempts = self.config.attempts,
            batch_size = self.config.batch_size,
            source = self.source.name(),
            "Finding amulets"
        );

        let claimed = AtomicU64::new(0);
        let (fatal_tx, fatal_rx) = bounded::<SourceError>(1);
        let (done_tx, done_rx) = bounded::<()>(1);

        let joined = thread::scope(|scope| {
            let search = scope.spawn(|| {
                // Dropped on unwind too, so the progress loop always wakes
                let done_tx = done_tx;
                let buffers: Vec<Vec<Hit>> = pool.install(|| {
                    (0..workers)
                        .into_par_iter()
                        .map(|worker| self.work(worker, &claimed, &stats, &fatal_tx))
                        .collect()
                });
                stats.stop();
                let _ = done_tx.send(());
                buffers
            });

            loop {
                callback(&*stats);
                match done_rx.recv_timeout(PROGRESS_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            callback(&*stats);

            search.join()
        });

        let attempts = stats.total_attempts();
        let buffers = match joined {
            Ok(buffers) => buffers,
            Err(payload) => {
                error!("Mining worker panicked: {}", panic_message(&*payload));
                return Err(MineError::WorkerPanicked {
                    attempts_completed: attempts,
                });
            }
        };

        // Per-worker buffers are merged once, after every worker has finished
        let hits: Vec<Hit> = buffers.into_iter().flatten().collect();
        let elapsed = stats.elapsed();

        if let Ok(err) = fatal_rx.try_recv() {
            error!(
                attempts_completed = attempts,
                hits = hits.len(),
                "Mining aborted: {err}"
            );
            return Err(MineError::SourceUnavailable {
                reason: err.to_string(),
                attempts_completed: attempts,
                hits,
            });
        }

        let faults = stats.total_faults();
        if faults > 0 {
            warn!(faults, "Attempts lost to recoverable faults were counted as misses");
        }
        if attempts < self.config.attempts {
            warn!(
                attempts,
                requested = self.config.attempts,
                "Run stopped before dispatching every attempt"
            );
        }
        info!(
            attempts,
            hits = hits.len(),
            elapsed_secs = elapsed.as_secs_f64(),
            rate = stats.attempts_per_second(),
            "Mining finished"
        );

        Ok(MineOutcome {
            hits,
            attempts,
            requested: self.config.attempts,
            faults,
            elapsed,
        })
    }

    /// One worker: claim batches of attempts until none remain
    fn work(
        &self,
        worker: usize,
        claimed: &AtomicU64,
        stats: &MineStats,
        fatal_tx: &Sender<SourceError>,
    ) -> Vec<Hit> {
        let batch_size = self.config.batch_size.max(1) as u64;
        let total = self.config.attempts;
        let max_time = self.config.max_time_secs;

        let mut hits = Vec::new();
        let mut faults = 0u64;

        while stats.is_running() {
            // Check limits
            if self.cancel.is_cancelled() {
                debug!(worker, "Cancelled");
                stats.stop();
                break;
            }
            if max_time > 0 && stats.elapsed().as_secs() >= max_time {
                debug!(worker, "Time limit reached");
                stats.stop();
                break;
            }

            let start = claimed.fetch_add(batch_size, Ordering::Relaxed);
            if start >= total {
                break;
            }
            let end = start.saturating_add(batch_size).min(total);

            let mut completed = 0u64;
            for _ in start..end {
                match self.attempt() {
                    Attempt::Miss => {}
                    Attempt::Hit(hit) => {
                        stats.add_hit();
                        if let Some(feed) = &self.hit_feed {
                            let _ = feed.send(hit.clone());
                        }
                        hits.push(hit);
                    }
                    Attempt::Fault(reason) => {
                        faults += 1;
                        stats.add_fault();
                        if faults <= FAULT_LOG_LIMIT {
                            warn!(worker, "Attempt failed, counted as a miss: {reason}");
                        }
                    }
                    Attempt::Fatal(err) => {
                        stats.add_attempts(completed);
                        error!(worker, "Candidate source failed: {err}");
                        let _ = fatal_tx.try_send(err);
                        stats.stop();
                        return hits;
                    }
                }
                completed += 1;
            }

            stats.add_attempts(completed);
        }

        if faults > FAULT_LOG_LIMIT {
            warn!(worker, faults, "Further attempt failures were not logged");
        }
        hits
    }

    /// Draw, filter and classify one candidate
    fn attempt(&self) -> Attempt {
        let text = match panic::catch_unwind(AssertUnwindSafe(|| self.source.draw())) {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => return Attempt::Miss,
            Ok(Err(err)) if err.is_fatal() => return Attempt::Fatal(err),
            Ok(Err(err)) => return Attempt::Fault(err.to_string()),
            Err(payload) => return Attempt::Fault(panic_message(&*payload)),
        };

        match self.filter.check(&text) {
            Verdict {
                passes: true,
                digest: Some(digest),
            } => Attempt::Hit(Hit::new(text, digest)),
            _ => Attempt::Miss,
        }
    }
}

/// Run `attempts` attempts over `workers` workers with default settings
pub fn mine(workers: usize, attempts: u64, source: Arc<dyn CandidateSource>) -> Result<MineOutcome, MineError> {
    let config = MineConfig {
        workers,
        attempts,
        ..MineConfig::default()
    };
    AmuletMiner::new(source, config).run()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}
