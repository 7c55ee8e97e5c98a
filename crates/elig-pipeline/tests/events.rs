//! The controller's lifecycle events reach the log.

use std::sync::Arc;

use elig_core::{
    ErrorCategory, Patient, PlanStatus, SourceError, Trigger, VerificationResult,
    VerificationStatus,
};
use elig_pipeline::{
    FixtureSource, MemoryVerificationStore, PipelineConfig, VerificationPhaseController,
};
use tracing_test::traced_test;

fn thin() -> VerificationResult {
    VerificationResult {
        verification_status: VerificationStatus::Verified,
        plan_status: PlanStatus::Active,
        ..Default::default()
    }
}

#[tokio::test]
#[traced_test]
async fn fallback_failure_is_logged_and_run_still_finishes() {
    let api = FixtureSource::new("api").with_result("p-7", thin());
    let rpa = FixtureSource::new("rpa").with_error(
        "p-7",
        SourceError::new(ErrorCategory::AuthRejected, "portal login expired"),
    );
    let controller = VerificationPhaseController::new(
        Arc::new(MemoryVerificationStore::new()),
        Arc::new(api),
        PipelineConfig::default(),
    )
    .with_fallback(Arc::new(rpa));

    controller
        .verify(&Patient::new("p-7", "D1110"), Trigger::Manual)
        .await
        .unwrap();

    assert!(logs_contain("verification.started"));
    assert!(logs_contain("verification.phase"));
    assert!(logs_contain("verification.fallback_failed"));
    assert!(logs_contain("portal login expired"));
    assert!(logs_contain("verification.finished"));
}

#[tokio::test]
#[traced_test]
async fn api_failure_is_logged_with_category() {
    let api = FixtureSource::new("api");
    let controller = VerificationPhaseController::new(
        Arc::new(MemoryVerificationStore::new()),
        Arc::new(api),
        PipelineConfig::default(),
    );

    controller
        .verify(&Patient::new("p-8", "D1110"), Trigger::Auto24h)
        .await
        .unwrap();

    assert!(logs_contain("verification.source_failed"));
    assert!(logs_contain("DataNotFound"));
}
