//! Common utilities used across the crate.
//!
//! This module provides the parallelism switch used by the pair-ranking
//! sweep and the rate-limited logging gate used by the scorer.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators. The
/// actual thread pool is whatever rayon pool is installed at the call
/// site; components don't manage thread pools, they just respect this
/// flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }
}

// =============================================================================
// Rate-limited logging
// =============================================================================

/// A log gate that emits at `info` level a bounded number of times, then
/// demotes the message to `trace`.
///
/// Counters are read and written with Relaxed operations rather than a
/// read-modify-write: a decrement lost to a concurrent caller only slows
/// the decay of the logging rate, which is tolerable.
pub(crate) struct CountedLog {
    remaining: AtomicI64,
}

impl CountedLog {
    pub(crate) const fn new(count: i64) -> Self {
        Self {
            remaining: AtomicI64::new(count),
        }
    }

    pub(crate) fn log(&self, args: fmt::Arguments<'_>) {
        let remaining = self.remaining.load(Ordering::Relaxed);
        if remaining > 0 {
            self.remaining.store(remaining - 1, Ordering::Relaxed);
            log::info!("{}", args);
        } else {
            log::trace!("{}", args);
        }
    }
}
