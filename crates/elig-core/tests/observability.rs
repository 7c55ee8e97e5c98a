//! Smoke tests for structured verification events.

use elig_core::{
    emit_fallback_failed, emit_phase, emit_source_failed, emit_triage_evaluated,
    emit_verification_finished, emit_verification_skipped, emit_verification_started,
    ErrorCategory, TriageLevel, Trigger, VerificationSpan,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn started_event_carries_id_and_trigger() {
    emit_verification_started("p-100", Trigger::Auto24h);
    assert!(logs_contain("verification.started"));
    assert!(logs_contain("24h_auto"));
}

#[traced_test]
#[test]
fn phase_transition_is_logged() {
    emit_phase("p-101", "api", "rpa");
    assert!(logs_contain("verification.phase"));
}

#[traced_test]
#[test]
fn finished_event_logged() {
    emit_verification_finished("p-102", Trigger::Manual, "complete", "verified", "hybrid", 42);
    assert!(logs_contain("verification.finished"));
}

#[traced_test]
#[test]
fn skipped_event_logged() {
    emit_verification_skipped("p-103", Trigger::Batch);
    assert!(logs_contain("already in flight"));
}

#[traced_test]
#[test]
fn source_failure_flags_stale_credentials() {
    emit_source_failed("p-104", "api", ErrorCategory::AuthRejected, "401");
    assert!(logs_contain("credential_stale=true"));
}

#[traced_test]
#[test]
fn fallback_failure_is_a_warning() {
    emit_fallback_failed("p-105", ErrorCategory::SourceUnavailable, "portal down");
    assert!(logs_contain("WARN"));
    assert!(logs_contain("verification.fallback_failed"));
}

#[traced_test]
#[test]
fn triage_event_logged() {
    emit_triage_evaluated("p-106", TriageLevel::Critical, 2, 1);
    assert!(logs_contain("triage.evaluated"));
}

#[traced_test]
#[test]
fn span_wraps_events() {
    let span = VerificationSpan::enter("p-107", Trigger::Manual);
    emit_phase("p-107", "idle", "api");
    drop(span);
    assert!(logs_contain("elig.verify"));
}
