//! Live mining statistics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe mining statistics
#[derive(Debug)]
pub struct MineStats {
    /// Attempts completed
    pub attempts: AtomicU64,
    /// Hits collected
    pub hits: AtomicU64,
    /// Attempts lost to recoverable faults
    pub faults: AtomicU64,
    /// Attempts the run was configured for
    target: u64,
    /// Start time
    start_time: Instant,
    /// Whether the run is still dispatching attempts
    pub running: AtomicBool,
}

impl MineStats {
    /// Create new stats for a run of `target` attempts
    pub fn new(target: u64) -> Arc<Self> {
        Arc::new(Self::with_target(target))
    }

    fn with_target(target: u64) -> Self {
        Self {
            attempts: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            target,
            start_time: Instant::now(),
            running: AtomicBool::new(true),
        }
    }

    /// Increment completed attempts by amount
    pub fn add_attempts(&self, count: u64) {
        self.attempts.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total attempts completed
    pub fn total_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn total_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn total_faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get attempts per second
    pub fn attempts_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_attempts() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Fraction of the configured attempts completed, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.target == 0 {
            1.0
        } else {
            (self.total_attempts() as f64 / self.target as f64).min(1.0)
        }
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop dispatching new attempts
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Get formatted stats string
    pub fn format(&self) -> String {
        let attempts = self.total_attempts();
        let rate = self.attempts_per_second();

        let remaining = self.target.saturating_sub(attempts);
        let eta = if rate > 0.0 {
            remaining as f64 / rate
        } else {
            0.0
        };

        format!(
            "[{:.2} Kcand/s][Total {}/{}][{:.1}%][Hits {}][Faults {}][Done in {}]",
            rate / 1_000.0,
            format_count(attempts),
            format_count(self.target),
            self.progress() * 100.0,
            self.total_hits(),
            self.total_faults(),
            format_duration(eta)
        )
    }
}

impl Default for MineStats {
    fn default() -> Self {
        Self::with_target(0)
    }
}

fn format_count(count: u64) -> String {
    if count >= 1_000_000_000_000 {
        format!("{:.2}T", count as f64 / 1e12)
    } else if count >= 1_000_000_000 {
        format!("{:.2}G", count as f64 / 1e9)
    } else if count >= 1_000_000 {
        format!("{:.2}M", count as f64 / 1e6)
    } else if count >= 1000 {
        format!("{:.2}K", count as f64 / 1e3)
    } else {
        format!("{}", count)
    }
}

fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 {
        return "now".to_string();
    }
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.0}s", seconds)
    } else if seconds < 3600.0 {
        format!("{:.0}m", seconds / 60.0)
    } else if seconds < 86400.0 {
        format!("{:.1}h", seconds / 3600.0)
    } else {
        format!("{:.1}d", seconds / 86400.0)
    }
}
