//! Eligibility verification core.
//!
//! Pure components of the verification pipeline: Medicaid classification,
//! thin-data detection, hybrid-source merge, triage rules, pre-auth routing
//! and the out-of-network estimate. Everything here is synchronous and
//! side-effect free apart from tracing.

pub mod adjustment;
pub mod cdt;
pub mod domain;
pub mod integrity;
pub mod medicaid;
pub mod merge;
pub mod metrics;
pub mod mtc;
pub mod normalize;
pub mod obs;
pub mod oon;
pub mod payer_contact;
pub mod telemetry;
pub mod thin_data;
pub mod triage;

pub use domain::{
    format_dollars, ActionFlags, AssignmentOfBenefits, CategoryCoverage, EligError,
    ErrorCategory, FrequencyCounter, MedicaidFrequency, MedicaidInfo, MissingToothClause, Money,
    OrthoBenefits, Patient, PatientIdentity, PlanStatus, PreventiveBenefits, RestorativeBenefits,
    Result, ResultSource, SourceError, Trigger, VerificationResult, VerificationStatus,
    ToothRecord, THIN_DATA_FLAG,
};

pub use integrity::{assess, Criticality, Grade, IntegrityReport, MissingField};
pub use medicaid::{detect_state, is_medicaid, state_rules, MedicaidStateRules};
pub use merge::merge;
pub use normalize::{
    derive_action_flags, derive_verification_status, normalize as normalize_benefits,
};
pub use metrics::METRICS;
pub use mtc::{evaluate as evaluate_mtc, AffectedCode, MtcCategory, MtcFlag, MtcRisk};
pub use obs::{
    emit_fallback_failed, emit_phase, emit_source_failed, emit_triage_evaluated,
    emit_verification_finished, emit_verification_skipped, emit_verification_started,
    verification_span, VerificationSpan,
};
pub use oon::{
    calculate, run_waterfall, DataSource, FeeSchedule, NetworkStatus, OonCalculation,
    OonEstimate, OonInput, OonRequest, StepStatus, WaterfallStep,
};
pub use payer_contact::{resolve as resolve_payer_contact, PayerContact};
pub use telemetry::init_tracing;
pub use thin_data::{classify, is_thin, ThinDataAssessment};
pub use triage::{triage, TriageLevel, TriageResult};
