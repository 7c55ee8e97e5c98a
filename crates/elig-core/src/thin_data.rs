//! Thin-data detection.
//!
//! Decides whether an eligibility answer is usable as-is or must be
//! supplemented by the fallback source. [`is_thin`] is the single predicate;
//! the merger calls it too, so the two can never drift apart.

use serde::{Deserialize, Serialize};

use crate::domain::{PlanStatus, VerificationResult, VerificationStatus};

/// Fields the triage rules cannot do without, in reporting order.
pub const CRITICAL_FIELDS: [&str; 4] = [
    "missing_tooth_clause",
    "preventive",
    "annual_maximum_cents",
    "frequency_limits",
];

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinDataAssessment {
    pub thin: bool,
    pub reason: String,
    pub missing_fields: Vec<String>,
}

impl ThinDataAssessment {
    fn usable(reason: &str) -> Self {
        Self {
            thin: false,
            reason: reason.to_string(),
            missing_fields: Vec::new(),
        }
    }

    fn thin(reason: impl Into<String>, missing_fields: Vec<String>) -> Self {
        Self {
            thin: true,
            reason: reason.into(),
            missing_fields,
        }
    }
}

fn missing_critical_fields(result: &VerificationResult) -> Vec<String> {
    let present = [
        result.missing_tooth_clause.is_some(),
        result.preventive.is_some(),
        result.annual_maximum_cents.is_some(),
        result.frequency_limits.is_some(),
    ];
    CRITICAL_FIELDS
        .iter()
        .zip(present)
        .filter(|(_, p)| !p)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Classify a result. Rule order:
///
/// 1. absent result is thin
/// 2. an inactive plan is never thin (it legitimately lacks benefit detail)
/// 3. an error or unknown status is thin
/// 4. otherwise thin iff any critical field is null
pub fn classify(result: Option<&VerificationResult>) -> ThinDataAssessment {
    let Some(result) = result else {
        return ThinDataAssessment::thin("no response", CRITICAL_FIELDS.map(String::from).to_vec());
    };

    if result.plan_status == PlanStatus::Inactive {
        return ThinDataAssessment::usable("plan inactive; benefit detail not expected");
    }

    if result.verification_status.is_ambiguous() {
        return ThinDataAssessment::thin(
            format!("verification status is {}", status_label(result.verification_status)),
            missing_critical_fields(result),
        );
    }

    let missing = missing_critical_fields(result);
    if missing.is_empty() {
        ThinDataAssessment::usable("all critical fields present")
    } else {
        ThinDataAssessment::thin(
            format!("missing critical fields: {}", missing.join(", ")),
            missing,
        )
    }
}

/// The shared thin predicate.
pub fn is_thin(result: &VerificationResult) -> bool {
    classify(Some(result)).thin
}

fn status_label(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Error => "error",
        _ => "unknown",
    }
}
