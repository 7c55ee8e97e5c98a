//! The normalized eligibility response.
//!
//! A [`VerificationResult`] is created fresh per verification and is never
//! patched in place by the pipeline; retries replace it wholesale.
//!
//! Money is always integer cents. For the nullable money fields `None` means
//! "not applicable / no cap" and `Some(0)` means "explicitly exhausted".
//! The two are never interchangeable.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::ErrorCategory;
use crate::oon::OonEstimate;

/// Reserved action flag marking a result that is waiting on the fallback source.
pub const THIN_DATA_FLAG: &str = "thin_data";

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Outcome of the eligibility check itself.
///
/// Decodes leniently: any unrecognised or empty string becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerificationStatus {
    Verified,
    ActionRequired,
    Inactive,
    Error,
    #[default]
    Unknown,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::ActionRequired => "action_required",
            VerificationStatus::Inactive => "inactive",
            VerificationStatus::Error => "error",
            VerificationStatus::Unknown => "unknown",
        }
    }

    /// Error and unknown statuses carry no usable answer.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, VerificationStatus::Error | VerificationStatus::Unknown)
    }
}

impl From<String> for VerificationStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "verified" => VerificationStatus::Verified,
            "action_required" => VerificationStatus::ActionRequired,
            "inactive" => VerificationStatus::Inactive,
            "error" => VerificationStatus::Error,
            _ => VerificationStatus::Unknown,
        }
    }
}

impl From<VerificationStatus> for String {
    fn from(s: VerificationStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the insurance plan on the date of service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlanStatus {
    Active,
    Inactive,
    Terminated,
    #[default]
    Unknown,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Inactive => "inactive",
            PlanStatus::Terminated => "terminated",
            PlanStatus::Unknown => "unknown",
        }
    }
}

impl From<String> for PlanStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => PlanStatus::Active,
            "inactive" => PlanStatus::Inactive,
            "terminated" => PlanStatus::Terminated,
            _ => PlanStatus::Unknown,
        }
    }
}

impl From<PlanStatus> for String {
    fn from(s: PlanStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which channel produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Api,
    Rpa,
    Hybrid,
    Fixture,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Api => "api",
            ResultSource::Rpa => "rpa",
            ResultSource::Hybrid => "hybrid",
            ResultSource::Fixture => "fixture",
        }
    }
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action flags
// ---------------------------------------------------------------------------

/// Insertion-ordered, de-duplicated set of action flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ActionFlags(Vec<String>);

impl ActionFlags {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a flag; returns false if it was already present.
    pub fn insert(&mut self, flag: impl Into<String>) -> bool {
        let flag = flag.into();
        if self.0.iter().any(|f| *f == flag) {
            return false;
        }
        self.0.push(flag);
        true
    }

    pub fn remove(&mut self, flag: &str) {
        self.0.retain(|f| f != flag);
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.0.iter().any(|f| f == flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy with the internal `thin_data` sentinel removed.
    pub fn without_sentinel(&self) -> Self {
        let mut out = self.clone();
        out.remove(THIN_DATA_FLAG);
        out
    }

    /// Flags safe for display or export.
    pub fn export(&self) -> Vec<String> {
        self.without_sentinel().0
    }
}

impl From<Vec<String>> for ActionFlags {
    fn from(v: Vec<String>) -> Self {
        let mut flags = ActionFlags::new();
        for f in v {
            flags.insert(f);
        }
        flags
    }
}

impl From<ActionFlags> for Vec<String> {
    fn from(f: ActionFlags) -> Self {
        f.0
    }
}

impl<S: Into<String>> FromIterator<S> for ActionFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut flags = ActionFlags::new();
        for f in iter {
            flags.insert(f);
        }
        flags
    }
}

// ---------------------------------------------------------------------------
// Benefit sub-records
// ---------------------------------------------------------------------------

/// Usage counter for a frequency-limited service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyCounter {
    pub times_per_period: Option<u32>,
    pub used_this_period: Option<u32>,
    pub period: Option<String>,
    pub last_service_date: Option<NaiveDate>,
    pub next_eligible_date: Option<NaiveDate>,
}

impl FrequencyCounter {
    pub fn new(used: u32, total: u32) -> Self {
        Self {
            times_per_period: Some(total),
            used_this_period: Some(used),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreventiveBenefits {
    pub coverage_pct: Option<u32>,
    pub copay_cents: Option<i64>,
    pub deductible_applies: Option<bool>,
    pub cleaning_frequency: Option<FrequencyCounter>,
    pub bitewing_frequency: Option<FrequencyCounter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorativeBenefits {
    pub coverage_pct: Option<u32>,
    pub copay_cents: Option<i64>,
    pub deductible_applies: Option<bool>,
    /// Posterior composites are paid at the amalgam rate.
    pub composite_posterior_downgrade: bool,
    pub composite_posterior_note: Option<String>,
    pub crown_waiting_period_months: Option<u32>,
}

/// Coverage for the basic and major service categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCoverage {
    pub coverage_pct: Option<u32>,
    pub deductible_applies: Option<bool>,
    pub waiting_period_months: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrthoBenefits {
    pub coverage_pct: Option<u32>,
    pub lifetime_maximum_cents: Option<i64>,
    pub lifetime_used_cents: Option<i64>,
    pub age_limit: Option<u32>,
}

/// Missing tooth clause: teeth lost before coverage began are not replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingToothClause {
    pub applies: bool,
    pub affected_teeth: Vec<String>,
    pub excluded_services: Vec<String>,
    pub exception_pathway: Option<String>,
    pub extraction_date: Option<NaiveDate>,
    pub coverage_begin: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentOfBenefits {
    /// `Some(false)` means the payer reimburses the patient directly.
    pub assigned_to_provider: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicaidFrequency {
    /// `None` when the program reported usage without a cap.
    pub max: Option<u32>,
    pub used: u32,
}

/// State Medicaid program details returned with a result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicaidInfo {
    pub state: Option<String>,
    pub prior_auth_codes: Vec<String>,
    pub frequency_limits: BTreeMap<String, MedicaidFrequency>,
    pub copays: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

/// Normalized eligibility response from any source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationResult {
    pub verification_status: VerificationStatus,
    pub plan_status: PlanStatus,
    pub payer_name: Option<String>,
    pub payer_id: Option<String>,
    pub insurance_type: Option<String>,
    pub in_network: Option<bool>,
    pub plan_begin_date: Option<NaiveDate>,
    pub plan_end_date: Option<NaiveDate>,

    pub annual_maximum_cents: Option<i64>,
    pub annual_used_cents: Option<i64>,
    pub annual_remaining_cents: Option<i64>,
    pub individual_deductible_cents: Option<i64>,
    pub individual_deductible_met_cents: Option<i64>,
    pub family_deductible_cents: Option<i64>,
    pub family_deductible_met_cents: Option<i64>,

    pub preventive: Option<PreventiveBenefits>,
    pub restorative: Option<RestorativeBenefits>,
    pub basic: Option<CategoryCoverage>,
    pub major: Option<CategoryCoverage>,
    pub ortho: Option<OrthoBenefits>,
    pub missing_tooth_clause: Option<MissingToothClause>,
    pub assignment_of_benefits: Option<AssignmentOfBenefits>,
    /// Per-CDT-code frequency counters.
    pub frequency_limits: Option<BTreeMap<String, FrequencyCounter>>,
    pub medicaid_info: Option<MedicaidInfo>,
    pub oon_estimate: Option<OonEstimate>,

    pub action_flags: ActionFlags,
    pub verified_at: Option<DateTime<Utc>>,

    #[serde(rename = "_source")]
    pub source: Option<ResultSource>,
    #[serde(rename = "_failReason", skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
    #[serde(rename = "_failCategory", skip_serializing_if = "Option::is_none")]
    pub fail_category: Option<ErrorCategory>,
}

impl VerificationResult {
    /// A renderable terminal failure.
    pub fn failed(category: ErrorCategory, reason: impl Into<String>) -> Self {
        Self {
            verification_status: VerificationStatus::Error,
            fail_reason: Some(reason.into()),
            fail_category: Some(category),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: ResultSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_plan_active(&self) -> bool {
        self.plan_status == PlanStatus::Active
    }

    /// Staff guidance for a failed result, if it failed.
    pub fn guidance(&self) -> Option<&'static str> {
        self.fail_category.map(|c| c.guidance())
    }

    /// Cleaning counter from the preventive block, if reported.
    pub fn cleaning_frequency(&self) -> Option<&FrequencyCounter> {
        self.preventive
            .as_ref()
            .and_then(|p| p.cleaning_frequency.as_ref())
    }

    pub fn composite_downgrade(&self) -> bool {
        self.restorative
            .as_ref()
            .map(|r| r.composite_posterior_downgrade)
            .unwrap_or(false)
    }

    pub fn missing_tooth_clause_applies(&self) -> bool {
        self.missing_tooth_clause
            .as_ref()
            .map(|m| m.applies)
            .unwrap_or(false)
    }
}
