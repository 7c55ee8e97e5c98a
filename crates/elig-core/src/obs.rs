//! Structured lifecycle events for verification runs.
//!
//! Events carry patient ids only. Names, dates of birth and member ids are
//! never logged.

use tracing::{info, warn};

use crate::domain::{ErrorCategory, Trigger};
use crate::triage::TriageLevel;

/// RAII guard entering a span tagged with the patient id and trigger.
pub struct VerificationSpan {
    _span: tracing::span::EnteredSpan,
}

impl VerificationSpan {
    pub fn enter(patient_id: &str, trigger: Trigger) -> Self {
        Self {
            _span: verification_span(patient_id, trigger).entered(),
        }
    }
}

/// The span itself, for async code that attaches it with `Instrument`.
/// An entered guard must not be held across an `.await`.
pub fn verification_span(patient_id: &str, trigger: Trigger) -> tracing::Span {
    tracing::info_span!(
        "elig.verify",
        patient_id = %patient_id,
        trigger = %trigger,
    )
}

pub fn emit_verification_started(patient_id: &str, trigger: Trigger) {
    info!(event = "verification.started", patient_id = %patient_id, trigger = %trigger);
}

/// A phase transition. Audit consumers key off this event.
pub fn emit_phase(patient_id: &str, from: &str, to: &str) {
    info!(event = "verification.phase", patient_id = %patient_id, from = %from, to = %to);
}

pub fn emit_verification_finished(
    patient_id: &str,
    trigger: Trigger,
    phase: &str,
    status: &str,
    source: &str,
    duration_ms: u64,
) {
    info!(
        event = "verification.finished",
        patient_id = %patient_id,
        trigger = %trigger,
        phase = %phase,
        status = %status,
        source = %source,
        duration_ms = duration_ms,
    );
}

pub fn emit_verification_skipped(patient_id: &str, trigger: Trigger) {
    info!(
        event = "verification.skipped",
        patient_id = %patient_id,
        trigger = %trigger,
        reason = "already in flight",
    );
}

/// A source failed. Stale credentials are flagged for separate alerting.
pub fn emit_source_failed(patient_id: &str, source: &str, category: ErrorCategory, message: &str) {
    warn!(
        event = "verification.source_failed",
        patient_id = %patient_id,
        source = %source,
        category = %category,
        retryable = category.is_retryable(),
        credential_stale = category.credential_likely_stale(),
        error = %message,
    );
}

/// The fallback failed; the api-only result is kept.
pub fn emit_fallback_failed(patient_id: &str, category: ErrorCategory, message: &str) {
    warn!(
        event = "verification.fallback_failed",
        patient_id = %patient_id,
        category = %category,
        error = %message,
    );
}

pub fn emit_triage_evaluated(patient_id: &str, level: TriageLevel, blocks: usize, notifies: usize) {
    info!(
        event = "triage.evaluated",
        patient_id = %patient_id,
        level = %level,
        blocks = blocks,
        notifies = notifies,
    );
}
