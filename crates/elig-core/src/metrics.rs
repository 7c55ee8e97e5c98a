//! Process-wide verification counters.
//!
//! Incremented at the call site; [`Metrics::flush`] emits the current values
//! as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

/// Atomic counters, no locking.
pub struct Metrics {
    verifications_started: AtomicU64,
    verifications_skipped: AtomicU64,
    fallbacks_invoked: AtomicU64,
    fallbacks_failed: AtomicU64,
    source_errors: AtomicU64,
    stale_credentials: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            verifications_started: AtomicU64::new(0),
            verifications_skipped: AtomicU64::new(0),
            fallbacks_invoked: AtomicU64::new(0),
            fallbacks_failed: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            stale_credentials: AtomicU64::new(0),
        }
    }

    pub fn inc_started(&self) {
        self.verifications_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.verifications_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback(&self) {
        self.fallbacks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback_failed(&self) {
        self.fallbacks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a source error; auth rejections also bump the stale-credential counter.
    pub fn inc_source_error(&self, stale_credential: bool) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
        if stale_credential {
            self.stale_credentials.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            verifications_started = self.verifications_started(),
            verifications_skipped = self.verifications_skipped(),
            fallbacks_invoked = self.fallbacks_invoked(),
            fallbacks_failed = self.fallbacks_failed(),
            source_errors = self.source_errors(),
            stale_credentials = self.stale_credentials(),
        );
    }

    pub fn verifications_started(&self) -> u64 {
        self.verifications_started.load(Ordering::Relaxed)
    }

    pub fn verifications_skipped(&self) -> u64 {
        self.verifications_skipped.load(Ordering::Relaxed)
    }

    pub fn fallbacks_invoked(&self) -> u64 {
        self.fallbacks_invoked.load(Ordering::Relaxed)
    }

    pub fn fallbacks_failed(&self) -> u64 {
        self.fallbacks_failed.load(Ordering::Relaxed)
    }

    pub fn source_errors(&self) -> u64 {
        self.source_errors.load(Ordering::Relaxed)
    }

    pub fn stale_credentials(&self) -> u64 {
        self.stale_credentials.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.verifications_started.store(0, Ordering::Relaxed);
        self.verifications_skipped.store(0, Ordering::Relaxed);
        self.fallbacks_invoked.store(0, Ordering::Relaxed);
        self.fallbacks_failed.store(0, Ordering::Relaxed);
        self.source_errors.store(0, Ordering::Relaxed);
        self.stale_credentials.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_and_reset() {
        let m = Metrics::new();
        m.inc_started();
        m.inc_started();
        m.inc_source_error(true);
        m.inc_source_error(false);
        assert_eq!(m.verifications_started(), 2);
        assert_eq!(m.source_errors(), 2);
        assert_eq!(m.stale_credentials(), 1);
        m.flush();
        m.reset();
        assert_eq!(m.verifications_started(), 0);
        assert_eq!(m.stale_credentials(), 0);
    }
}
