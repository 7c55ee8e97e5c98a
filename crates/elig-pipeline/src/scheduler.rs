//! Automatic verification ahead of appointments.
//!
//! Picks a trigger per patient from how far away the appointment is, skips
//! patients that are running or already done for that trigger, and spreads
//! the dispatches out so a morning schedule does not hit the source at once.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use elig_core::{is_medicaid, Patient, Trigger};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::controller::{VerificationPhaseController, VerifyOutcome};
use crate::error::Result;
use crate::phase::Phase;
use crate::store::PhaseSnapshot;

/// One planned automatic verification.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVerification {
    pub patient: Patient,
    pub trigger: Trigger,
    pub delay: Duration,
    /// The last run failed with a retryable error that must be cleared first.
    pub clear_error: bool,
}

#[derive(Debug, Clone)]
pub struct AutoTriggerScheduler {
    config: PipelineConfig,
}

impl AutoTriggerScheduler {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Trigger for a patient's next appointment, if it falls in any window.
    /// Past appointments and patients without one get nothing.
    pub fn select_trigger(&self, patient: &Patient, now: DateTime<Utc>) -> Option<Trigger> {
        let hours = patient.hours_until_appointment(now)?;
        if hours < 0 {
            return None;
        }
        if hours <= self.config.window_24h_hours {
            Some(Trigger::Auto24h)
        } else if hours <= self.config.medicaid_window_hours && is_medicaid(patient) {
            Some(Trigger::MedicaidAuto)
        } else if hours <= self.config.window_7d_hours {
            Some(Trigger::Auto7d)
        } else {
            None
        }
    }

    /// Build the dispatch plan. Delays grow by `stagger_ms` per entry with up
    /// to `jitter_ms` of random spread on top.
    pub fn plan<R: Rng>(
        &self,
        patients: &[Patient],
        snapshots: &HashMap<String, PhaseSnapshot>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<ScheduledVerification> {
        let mut plan = Vec::new();
        for patient in patients {
            let Some(trigger) = self.select_trigger(patient, now) else {
                continue;
            };
            let Some(clear_error) = admit(snapshots.get(&patient.id), trigger) else {
                debug!(patient_id = %patient.id, trigger = %trigger, "auto-verify not needed");
                continue;
            };
            let index = plan.len() as u64;
            let jitter = if self.config.jitter_ms == 0 {
                0
            } else {
                rng.gen_range(0..=self.config.jitter_ms)
            };
            plan.push(ScheduledVerification {
                patient: patient.clone(),
                trigger,
                delay: Duration::from_millis(index * self.config.stagger_ms + jitter),
                clear_error,
            });
        }
        info!(
            candidates = patients.len(),
            planned = plan.len(),
            "auto-verification plan built"
        );
        plan
    }

    /// [`plan`](Self::plan) against the controller's store, leaving out
    /// patients the controller is running right now.
    pub async fn plan_for<R: Rng>(
        &self,
        controller: &VerificationPhaseController,
        patients: &[Patient],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<ScheduledVerification>> {
        let snapshots: HashMap<String, PhaseSnapshot> = controller
            .store()
            .list()
            .await?
            .into_iter()
            .map(|s| (s.patient_id.clone(), s))
            .collect();
        let idle: Vec<Patient> = patients
            .iter()
            .filter(|p| {
                let running = controller.is_in_flight(&p.id);
                if running {
                    debug!(patient_id = %p.id, "auto-verify skipped; run in progress");
                }
                !running
            })
            .cloned()
            .collect();
        Ok(self.plan(&idle, &snapshots, now, rng))
    }

    /// Spawn one task per entry: sleep for its delay, then verify. Entries
    /// whose patient is claimed by then come back `Skipped`.
    pub fn dispatch(
        &self,
        controller: &VerificationPhaseController,
        plan: Vec<ScheduledVerification>,
    ) -> Vec<JoinHandle<Result<VerifyOutcome>>> {
        plan.into_iter()
            .map(|entry| {
                let controller = controller.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(entry.delay).await;
                    if entry.clear_error {
                        controller.retry(&entry.patient, entry.trigger).await
                    } else {
                        controller.verify(&entry.patient, entry.trigger).await
                    }
                })
            })
            .collect()
    }
}

/// `Some(clear_error)` when the patient should be verified for `trigger`.
///
/// A stored `api`/`rpa`/`merging` phase can be left by a run that died before
/// committing. Live runs are filtered out in [`AutoTriggerScheduler::plan_for`].
fn admit(snapshot: Option<&PhaseSnapshot>, trigger: Trigger) -> Option<bool> {
    let Some(snap) = snapshot else {
        return Some(false);
    };
    match snap.phase {
        Phase::Complete if snap.trigger == trigger => None,
        Phase::Error => {
            let retryable = snap
                .result
                .as_ref()
                .and_then(|r| r.fail_category)
                .map(|c| c.is_retryable())
                .unwrap_or(true);
            retryable.then_some(true)
        }
        Phase::Idle | Phase::Api | Phase::Rpa | Phase::Merging | Phase::Complete => Some(false),
    }
}
