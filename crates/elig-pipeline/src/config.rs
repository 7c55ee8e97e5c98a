//! Pipeline configuration.
//!
//! Defaults come from the environment (`ELIG_*`), the same way the
//! CLI reads them; a TOML file can override any field.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduler windows, dispatch spacing and source limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Appointments this close get a `24h_auto` check.
    pub window_24h_hours: i64,
    /// Appointments this close get a `7d_auto` check.
    pub window_7d_hours: i64,
    /// Medicaid patients are re-checked inside this window.
    pub medicaid_window_hours: i64,
    /// Spacing between consecutive auto-dispatches.
    pub stagger_ms: u64,
    /// Upper bound of the random delay added to each dispatch.
    pub jitter_ms: u64,
    pub source_timeout_secs: u64,
    /// Verifications allowed to run at once.
    pub max_concurrent: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            window_24h_hours: env_or("ELIG_WINDOW_24H_HOURS", 24),
            window_7d_hours: env_or("ELIG_WINDOW_7D_HOURS", 168),
            medicaid_window_hours: env_or("ELIG_MEDICAID_WINDOW_HOURS", 72),
            stagger_ms: env_or("ELIG_STAGGER_MS", 250),
            jitter_ms: env_or("ELIG_JITTER_MS", 500),
            source_timeout_secs: env_or("ELIG_SOURCE_TIMEOUT_SECS", 30),
            max_concurrent: env_or("ELIG_MAX_CONCURRENT", 8),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    /// No stagger or jitter, so dispatches start immediately.
    pub fn immediate(mut self) -> Self {
        self.stagger_ms = 0;
        self.jitter_ms = 0;
        self
    }
}
