//! In-memory [`VerificationStore`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use elig_core::{Trigger, VerificationResult};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::phase::Phase;
use crate::store::{PhaseSnapshot, VerificationStore};

/// Snapshots keyed by patient id behind one lock, so phase and result always
/// change together.
#[derive(Debug, Default)]
pub struct MemoryVerificationStore {
    snapshots: Mutex<HashMap<String, PhaseSnapshot>>,
}

impl MemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PhaseSnapshot>> {
        // A panic while holding the lock cannot leave a half-written
        // snapshot: every write is a single insert or field assignment.
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn begin(&self, patient_id: &str, trigger: Trigger, run_id: Uuid) -> StoreResult<()> {
        let mut snapshots = self.lock();
        snapshots.insert(
            patient_id.to_string(),
            PhaseSnapshot {
                patient_id: patient_id.to_string(),
                phase: Phase::Api,
                result: None,
                trigger,
                run_id,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn set_phase(&self, patient_id: &str, phase: Phase) -> StoreResult<()> {
        let mut snapshots = self.lock();
        let snap = snapshots
            .get_mut(patient_id)
            .ok_or_else(|| StoreError::NotFound(patient_id.to_string()))?;
        snap.phase = phase;
        snap.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(
        &self,
        patient_id: &str,
        phase: Phase,
        result: VerificationResult,
    ) -> StoreResult<()> {
        let mut snapshots = self.lock();
        let snap = snapshots
            .get_mut(patient_id)
            .ok_or_else(|| StoreError::NotFound(patient_id.to_string()))?;
        snap.phase = phase;
        snap.result = Some(result);
        snap.updated_at = Utc::now();
        Ok(())
    }

    async fn snapshot(&self, patient_id: &str) -> StoreResult<Option<PhaseSnapshot>> {
        Ok(self.lock().get(patient_id).cloned())
    }

    async fn clear_error(&self, patient_id: &str) -> StoreResult<bool> {
        let mut snapshots = self.lock();
        match snapshots.get(patient_id) {
            Some(snap) if snap.phase == Phase::Error => {
                snapshots.remove(patient_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> StoreResult<Vec<PhaseSnapshot>> {
        let mut all: Vec<PhaseSnapshot> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
        Ok(all)
    }
}
