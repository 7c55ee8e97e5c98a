//! Per-patient phase and result storage.
//!
//! A [`VerificationStore`] holds one [`PhaseSnapshot`] per patient: the
//! current phase plus the result the pipeline last published. Readers never
//! observe a terminal phase without its result because both are written by
//! a single call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elig_core::{Trigger, VerificationResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::phase::Phase;

/// What a reader sees for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub patient_id: String,
    pub phase: Phase,
    pub result: Option<VerificationResult>,
    pub trigger: Trigger,
    /// Identifies the run that produced this snapshot.
    pub run_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl PhaseSnapshot {
    pub fn is_in_flight(&self) -> bool {
        self.phase.is_in_flight()
    }
}

/// Phase/result store shared by the controller and its readers.
///
/// Guarantees:
/// - `begin` discards any prior snapshot for the patient wholesale
/// - `commit` replaces phase and result together
/// - `set_phase` keeps the current result
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Start a new run: phase `api`, no result.
    async fn begin(&self, patient_id: &str, trigger: Trigger, run_id: Uuid) -> StoreResult<()>;

    /// Move to `phase`, keeping the current result.
    async fn set_phase(&self, patient_id: &str, phase: Phase) -> StoreResult<()>;

    /// Publish `result` together with `phase`.
    async fn commit(
        &self,
        patient_id: &str,
        phase: Phase,
        result: VerificationResult,
    ) -> StoreResult<()>;

    async fn snapshot(&self, patient_id: &str) -> StoreResult<Option<PhaseSnapshot>>;

    /// Reset an `error` snapshot back to idle. Returns whether anything was
    /// cleared; snapshots in any other phase are left alone.
    async fn clear_error(&self, patient_id: &str) -> StoreResult<bool>;

    /// All snapshots, ordered by patient id.
    async fn list(&self) -> StoreResult<Vec<PhaseSnapshot>>;
}
