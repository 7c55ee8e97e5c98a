//! Verification phase controller.
//!
//! Drives one patient through `api → [rpa → merging] → complete | error`,
//! publishing every phase to a [`VerificationStore`]. Per patient, at most
//! one run is in flight; a second request while one runs is a no-op.
//!
//! Source failures never escape as errors. They become a failed
//! [`VerificationResult`] in the `error` phase (api) or are absorbed
//! (fallback). `Err` from this module means the store or the phase
//! machine itself broke.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use elig_core::{
    classify, emit_fallback_failed, emit_phase, emit_source_failed, emit_triage_evaluated,
    emit_verification_finished, emit_verification_skipped, emit_verification_started, merge,
    triage, verification_span, ErrorCategory, Patient, PatientIdentity, ResultSource,
    SourceError, ThinDataAssessment, Trigger, TriageResult, VerificationResult, METRICS,
    THIN_DATA_FLAG,
};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::phase::{Phase, PhaseEvent};
use crate::source::VerificationSource;
use crate::store::VerificationStore;

/// What a call to [`VerificationPhaseController::verify`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// A run for this patient was already in flight.
    Skipped,
    Finished {
        phase: Phase,
        result: VerificationResult,
    },
}

impl VerifyOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, VerifyOutcome::Skipped)
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            VerifyOutcome::Skipped => None,
            VerifyOutcome::Finished { phase, .. } => Some(*phase),
        }
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            VerifyOutcome::Skipped => None,
            VerifyOutcome::Finished { result, .. } => Some(result),
        }
    }
}

// ---------------------------------------------------------------------------
// In-flight set
// ---------------------------------------------------------------------------

type InFlight = Arc<Mutex<HashSet<String>>>;

fn lock(set: &InFlight) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a patient's in-flight slot; releasing happens on drop, so a run
/// that errors or panics still frees the patient.
pub struct InFlightGuard {
    set: InFlight,
    patient_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.patient_id);
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Runs verifications against a primary source and an optional fallback.
///
/// Cheap to clone; clones share the store, the sources and the in-flight set.
#[derive(Clone)]
pub struct VerificationPhaseController {
    store: Arc<dyn VerificationStore>,
    api: Arc<dyn VerificationSource>,
    fallback: Option<Arc<dyn VerificationSource>>,
    config: PipelineConfig,
    in_flight: InFlight,
    permits: Arc<Semaphore>,
}

fn advance(patient_id: &str, from: Phase, event: PhaseEvent) -> Result<Phase> {
    let to = from.apply(event)?;
    emit_phase(patient_id, from.as_str(), to.as_str());
    Ok(to)
}

impl VerificationPhaseController {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        api: Arc<dyn VerificationSource>,
        config: PipelineConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            store,
            api,
            fallback: None,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            permits,
        }
    }

    /// Source consulted when the api answer is thin.
    pub fn with_fallback(mut self, fallback: Arc<dyn VerificationSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn store(&self) -> &Arc<dyn VerificationStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_in_flight(&self, patient_id: &str) -> bool {
        lock(&self.in_flight).contains(patient_id)
    }

    /// Claim the patient's slot. Check and insert happen under one lock, so
    /// two callers can never both win.
    fn claim(&self, patient_id: &str) -> Option<InFlightGuard> {
        let mut set = lock(&self.in_flight);
        if !set.insert(patient_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            patient_id: patient_id.to_string(),
        })
    }

    fn skip(&self, patient_id: &str, trigger: Trigger) -> VerifyOutcome {
        METRICS.inc_skipped();
        emit_verification_skipped(patient_id, trigger);
        VerifyOutcome::Skipped
    }

    /// Verify one patient and wait for the terminal phase.
    pub async fn verify(&self, patient: &Patient, trigger: Trigger) -> Result<VerifyOutcome> {
        let Some(guard) = self.claim(&patient.id) else {
            return Ok(self.skip(&patient.id, trigger));
        };
        let span = verification_span(&patient.id, trigger);
        let outcome = self.run(patient, trigger).instrument(span).await;
        drop(guard);
        outcome
    }

    /// Claim the patient now and run in the background. Returns `None` when a
    /// run is already in flight.
    pub fn spawn_verify(
        &self,
        patient: Patient,
        trigger: Trigger,
    ) -> Option<JoinHandle<Result<VerifyOutcome>>> {
        let Some(guard) = self.claim(&patient.id) else {
            self.skip(&patient.id, trigger);
            return None;
        };
        let controller = self.clone();
        let span = verification_span(&patient.id, trigger);
        Some(tokio::spawn(
            async move {
                let _guard = guard;
                controller.run(&patient, trigger).await
            }
            .instrument(span),
        ))
    }

    /// Verify many patients concurrently. Outcomes come back in input order;
    /// a patient listed twice runs once and the repeat reports `Skipped`.
    pub async fn verify_batch(
        &self,
        patients: &[Patient],
        trigger: Trigger,
    ) -> Vec<Result<VerifyOutcome>> {
        let handles: Vec<_> = patients
            .iter()
            .map(|p| self.spawn_verify(p.clone(), trigger))
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle {
                None => Ok(VerifyOutcome::Skipped),
                Some(h) => h.await.map_err(PipelineError::from).and_then(|r| r),
            });
        }
        outcomes
    }

    /// Clear an `error` snapshot, then verify again.
    pub async fn retry(&self, patient: &Patient, trigger: Trigger) -> Result<VerifyOutcome> {
        if self.store.clear_error(&patient.id).await? {
            debug!(patient_id = %patient.id, "cleared error before retry");
        }
        self.verify(patient, trigger).await
    }

    /// Triage the patient against whatever result the store currently holds.
    pub async fn triage(&self, patient: &Patient) -> Result<TriageResult> {
        let snapshot = self.store.snapshot(&patient.id).await?;
        let result = snapshot.as_ref().and_then(|s| s.result.as_ref());
        let t = triage(patient, result);
        emit_triage_evaluated(&patient.id, t.level(), t.block().len(), t.notify().len());
        Ok(t)
    }

    // -- pipeline -----------------------------------------------------------

    async fn run(&self, patient: &Patient, trigger: Trigger) -> Result<VerifyOutcome> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;

        let id = patient.id.as_str();
        let started = Instant::now();
        METRICS.inc_started();
        emit_verification_started(id, trigger);

        let prior = self
            .store
            .snapshot(id)
            .await?
            .map(|s| s.phase)
            .unwrap_or_default();
        // In flight with no claim held means an earlier run was interrupted.
        let prior = if prior.is_in_flight() { Phase::Idle } else { prior };
        let phase = advance(id, prior, PhaseEvent::Start)?;
        self.store.begin(id, trigger, Uuid::new_v4()).await?;

        let identity = patient.identity();
        let (phase, result) = match self.call(self.api.as_ref(), &identity, trigger).await {
            Err(err) => {
                self.record_source_error(id, self.api.name(), &err);
                let phase = advance(id, phase, PhaseEvent::ApiFailed)?;
                let result = VerificationResult::failed(err.category, err.message)
                    .with_source(ResultSource::Api);
                (phase, result)
            }
            Ok(mut primary) => {
                if primary.source.is_none() {
                    primary.source = Some(ResultSource::Api);
                }
                let assessment = classify(Some(&primary));
                match &self.fallback {
                    Some(fallback) if assessment.thin => {
                        self.run_fallback(id, phase, primary, &assessment, fallback.as_ref(), &identity)
                            .await?
                    }
                    _ => {
                        primary.action_flags.remove(THIN_DATA_FLAG);
                        (advance(id, phase, PhaseEvent::ApiSucceeded)?, primary)
                    }
                }
            }
        };

        self.store.commit(id, phase, result.clone()).await?;
        emit_verification_finished(
            id,
            trigger,
            phase.as_str(),
            result.verification_status.as_str(),
            result.source.map(|s| s.as_str()).unwrap_or("none"),
            started.elapsed().as_millis() as u64,
        );
        Ok(VerifyOutcome::Finished { phase, result })
    }

    async fn run_fallback(
        &self,
        id: &str,
        phase: Phase,
        mut primary: VerificationResult,
        assessment: &ThinDataAssessment,
        fallback: &dyn VerificationSource,
        identity: &PatientIdentity,
    ) -> Result<(Phase, VerificationResult)> {
        primary.action_flags.insert(THIN_DATA_FLAG);
        let phase = advance(id, phase, PhaseEvent::ApiThin)?;
        // Readers see the api answer, flagged, while the fallback runs.
        self.store.commit(id, phase, primary.clone()).await?;
        METRICS.inc_fallback();
        debug!(
            patient_id = %id,
            reason = %assessment.reason,
            missing = ?assessment.missing_fields,
            "api data thin, invoking fallback"
        );

        match self.call(fallback, identity, Trigger::RpaFallback).await {
            Err(err) => {
                METRICS.inc_fallback_failed();
                METRICS.inc_source_error(err.category.credential_likely_stale());
                emit_fallback_failed(id, err.category, &err.message);
                let phase = advance(id, phase, PhaseEvent::FallbackFailed)?;
                primary.action_flags.remove(THIN_DATA_FLAG);
                Ok((phase, primary))
            }
            Ok(mut secondary) => {
                if secondary.source.is_none() {
                    secondary.source = Some(ResultSource::Rpa);
                }
                let phase = advance(id, phase, PhaseEvent::FallbackSucceeded)?;
                self.store.set_phase(id, phase).await?;
                let merged = merge(&primary, &secondary);
                let phase = advance(id, phase, PhaseEvent::Merged)?;
                Ok((phase, merged))
            }
        }
    }

    /// One source call with a timeout and panic containment.
    async fn call(
        &self,
        source: &dyn VerificationSource,
        identity: &PatientIdentity,
        trigger: Trigger,
    ) -> std::result::Result<VerificationResult, SourceError> {
        let timeout = self.config.source_timeout();
        let request = AssertUnwindSafe(source.request(identity, trigger)).catch_unwind();
        match tokio::time::timeout(timeout, request).await {
            Err(_) => Err(SourceError::new(
                ErrorCategory::SourceUnavailable,
                format!("{} timed out after {}s", source.name(), timeout.as_secs()),
            )),
            Ok(Err(_)) => Err(SourceError::new(
                ErrorCategory::Unknown,
                format!("{} failed unexpectedly", source.name()),
            )),
            Ok(Ok(answer)) => answer,
        }
    }

    fn record_source_error(&self, id: &str, source: &str, err: &SourceError) {
        METRICS.inc_source_error(err.category.credential_likely_stale());
        emit_source_failed(id, source, err.category, &err.message);
    }
}
