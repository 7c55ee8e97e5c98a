//! Triage rules engine.
//!
//! Evaluates a (patient, result) pair into a [`TriageResult`]: hard-stop
//! `block` reasons, soft `notify` warnings and informational `notices`.
//! Every rule runs independently and in a fixed order. Order only affects
//! list ordering; the level is derived from which lists are non-empty.

use serde::Serialize;

use crate::cdt;
use crate::domain::{format_dollars, Patient, PlanStatus, VerificationResult};
use crate::medicaid;

/// Remaining annual maximum below this (cents) earns a warning.
pub const LOW_ANNUAL_MAX_CENTS: i64 = 30_000;

/// Cleanings per period when the payer does not say.
const DEFAULT_CLEANINGS_PER_PERIOD: u32 = 2;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriageLevel {
    Clear,
    Notice,
    Warning,
    Critical,
}

impl TriageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLevel::Clear => "CLEAR",
            TriageLevel::Notice => "NOTICE",
            TriageLevel::Warning => "WARNING",
            TriageLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Triage outcome. The level is computed from the lists on construction and
/// cannot be set on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageResult {
    level: TriageLevel,
    block: Vec<String>,
    notify: Vec<String>,
    notices: Vec<String>,
}

impl TriageResult {
    pub fn new(block: Vec<String>, notify: Vec<String>, notices: Vec<String>) -> Self {
        let level = if !block.is_empty() {
            TriageLevel::Critical
        } else if !notify.is_empty() {
            TriageLevel::Warning
        } else if !notices.is_empty() {
            TriageLevel::Notice
        } else {
            TriageLevel::Clear
        };
        Self {
            level,
            block,
            notify,
            notices,
        }
    }

    pub fn level(&self) -> TriageLevel {
        self.level
    }

    pub fn block(&self) -> &[String] {
        &self.block
    }

    pub fn notify(&self) -> &[String] {
        &self.notify
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// First reason from the most severe non-empty list.
    pub fn summary(&self) -> Option<&str> {
        self.block
            .first()
            .or_else(|| self.notify.first())
            .or_else(|| self.notices.first())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Findings {
    block: Vec<String>,
    notify: Vec<String>,
    notices: Vec<String>,
}

/// Evaluate every rule for a patient. An absent result is itself critical.
pub fn triage(patient: &Patient, result: Option<&VerificationResult>) -> TriageResult {
    let Some(result) = result else {
        return TriageResult::new(
            vec!["verification not yet run".to_string()],
            Vec::new(),
            Vec::new(),
        );
    };

    let mut f = Findings::default();
    let procedure = patient.procedure.as_str();
    let prosthetic = cdt::is_prosthetic(procedure);

    check_plan_status(result, &mut f);
    check_annual_max_exhausted(result, &mut f);
    check_mtc_prosthetic(result, prosthetic, &mut f);
    check_cleaning_frequency(result, procedure, &mut f);
    check_low_annual_max(result, &mut f);
    check_composite_downgrade(result, &mut f);
    check_mtc_notice(result, prosthetic, &mut f);
    check_medicaid(patient, result, &mut f);
    check_assignment(result, &mut f);

    TriageResult::new(f.block, f.notify, f.notices)
}

fn check_plan_status(result: &VerificationResult, f: &mut Findings) {
    if result.plan_status != PlanStatus::Active {
        f.block
            .push(format!("plan status is {}, not active", result.plan_status));
    }
}

fn check_annual_max_exhausted(result: &VerificationResult, f: &mut Findings) {
    // Null means no cap; only an explicit zero is exhausted.
    if result.annual_remaining_cents == Some(0) {
        f.block.push("annual max exhausted".to_string());
    }
}

fn check_mtc_prosthetic(result: &VerificationResult, prosthetic: bool, f: &mut Findings) {
    if result.missing_tooth_clause_applies() && prosthetic {
        f.block
            .push("MTC denies coverage; pre-auth required".to_string());
    }
}

fn check_cleaning_frequency(result: &VerificationResult, procedure: &str, f: &mut Findings) {
    if !cdt::is_cleaning(procedure) {
        return;
    }
    let (used, total) = result
        .cleaning_frequency()
        .map(|c| {
            (
                c.used_this_period.unwrap_or(0),
                c.times_per_period.unwrap_or(DEFAULT_CLEANINGS_PER_PERIOD),
            )
        })
        .unwrap_or((0, DEFAULT_CLEANINGS_PER_PERIOD));

    if used >= total {
        f.block.push(format!(
            "cleaning frequency limit reached ({used}/{total} used this period)"
        ));
    } else if used > 0 {
        f.notices.push(format!(
            "{} of {total} cleanings remaining this period",
            total - used
        ));
    }
}

fn check_low_annual_max(result: &VerificationResult, f: &mut Findings) {
    if let Some(remaining) = result.annual_remaining_cents {
        if remaining > 0 && remaining < LOW_ANNUAL_MAX_CENTS && result.is_plan_active() {
            f.notify.push(format!(
                "low annual max remaining ({})",
                format_dollars(remaining)
            ));
        }
    }
}

fn check_composite_downgrade(result: &VerificationResult, f: &mut Findings) {
    if result.composite_downgrade() {
        f.notify
            .push("posterior composites downgraded to amalgam rate".to_string());
    }
}

fn check_mtc_notice(result: &VerificationResult, prosthetic: bool, f: &mut Findings) {
    if result.missing_tooth_clause_applies() && !prosthetic {
        f.notify
            .push("missing tooth clause applies; confirm extraction history".to_string());
    }
}

fn check_medicaid(patient: &Patient, result: &VerificationResult, f: &mut Findings) {
    if !(medicaid::is_medicaid(patient) || result.medicaid_info.is_some()) {
        return;
    }

    let detected = medicaid::detect_state(patient);
    let state = result
        .medicaid_info
        .as_ref()
        .and_then(|m| m.state.as_deref())
        .or(detected);
    let state_label = state.unwrap_or("state unknown");
    let static_rules = state.and_then(medicaid::state_rules);

    for code in cdt::extract_codes(&patient.procedure) {
        let (needs_pa, limit) = match &result.medicaid_info {
            Some(info) => (
                info.prior_auth_codes
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&code)),
                info.frequency_limits
                    .get(&code)
                    .and_then(|l| l.max.map(|max| (l.used, max))),
            ),
            None => match static_rules {
                Some(rules) => (
                    rules.requires_prior_auth(&code),
                    rules.frequency_max(&code).map(|max| {
                        let used = result
                            .frequency_limits
                            .as_ref()
                            .and_then(|m| m.get(&code))
                            .and_then(|c| c.used_this_period)
                            .unwrap_or(0);
                        (used, max)
                    }),
                ),
                None => (false, None),
            },
        };

        if needs_pa {
            f.notify.push(format!(
                "{code}: Medicaid prior authorization required ({state_label})"
            ));
        }
        if let Some((used, max)) = limit {
            if used >= max {
                f.block.push(format!(
                    "{code}: Medicaid frequency limit reached ({used}/{max})"
                ));
            }
        }
    }
}

fn check_assignment(result: &VerificationResult, f: &mut Findings) {
    let not_assigned = result
        .assignment_of_benefits
        .as_ref()
        .and_then(|a| a.assigned_to_provider)
        == Some(false);
    if not_assigned && result.in_network == Some(false) {
        f.notify.push(
            "benefits not assigned to provider; out-of-network payment goes to patient"
                .to_string(),
        );
    }
}
