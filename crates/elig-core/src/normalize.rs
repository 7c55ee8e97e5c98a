//! Action flags and verification status derived from reported benefits.
//!
//! Sources report benefits; whether staff must act on them is decided here,
//! once, so every source yields the same flags for the same benefits.

use crate::domain::{ActionFlags, PlanStatus, VerificationResult, VerificationStatus};

pub const FLAG_PLAN_INACTIVE: &str = "plan_inactive";
pub const FLAG_MISSING_TOOTH_CLAUSE: &str = "missing_tooth_clause";
pub const FLAG_PRE_AUTH_REQUIRED: &str = "pre_auth_required";
pub const FLAG_FREQUENCY_LIMIT: &str = "frequency_limit";
pub const FLAG_ANNUAL_MAX_EXHAUSTED: &str = "annual_max_exhausted";
pub const FLAG_ANNUAL_MAX_LOW: &str = "annual_max_low";
pub const FLAG_COMPOSITE_DOWNGRADE: &str = "composite_downgrade";
pub const FLAG_WAITING_PERIOD_ACTIVE: &str = "waiting_period_active";

/// Flags that move a verified plan to `action_required`.
const ACTION_FLAGS: &[&str] = &[
    FLAG_PLAN_INACTIVE,
    FLAG_MISSING_TOOTH_CLAUSE,
    FLAG_PRE_AUTH_REQUIRED,
    FLAG_FREQUENCY_LIMIT,
    FLAG_ANNUAL_MAX_EXHAUSTED,
    FLAG_ANNUAL_MAX_LOW,
    FLAG_COMPOSITE_DOWNGRADE,
    FLAG_WAITING_PERIOD_ACTIVE,
];

const LOW_ANNUAL_MAX_CENTS: i64 = 30_000;
const DEFAULT_CLEANINGS_PER_PERIOD: u32 = 2;

/// Flags implied by the benefits on `result`. An inactive plan yields only
/// `plan_inactive`.
pub fn derive_action_flags(result: &VerificationResult) -> ActionFlags {
    let mut flags = ActionFlags::new();
    if result.plan_status != PlanStatus::Active {
        flags.insert(FLAG_PLAN_INACTIVE);
        return flags;
    }

    if let Some(mtc) = result.missing_tooth_clause.as_ref().filter(|m| m.applies) {
        flags.insert(FLAG_MISSING_TOOTH_CLAUSE);
        if !mtc.excluded_services.is_empty() {
            flags.insert(FLAG_PRE_AUTH_REQUIRED);
        }
    }

    if let Some(counter) = result.cleaning_frequency() {
        let used = counter.used_this_period.unwrap_or(0);
        let total = counter
            .times_per_period
            .unwrap_or(DEFAULT_CLEANINGS_PER_PERIOD);
        if used >= total {
            flags.insert(FLAG_FREQUENCY_LIMIT);
        }
    }

    // `None` is "no cap reported" and never flags.
    match result.annual_remaining_cents {
        Some(0) => {
            flags.insert(FLAG_ANNUAL_MAX_EXHAUSTED);
        }
        Some(remaining) if remaining < LOW_ANNUAL_MAX_CENTS => {
            flags.insert(FLAG_ANNUAL_MAX_LOW);
        }
        _ => {}
    }

    if result.composite_downgrade() {
        flags.insert(FLAG_COMPOSITE_DOWNGRADE);
    }

    let waiting = result
        .major
        .as_ref()
        .and_then(|m| m.waiting_period_months)
        .unwrap_or(0);
    if waiting > 0 {
        flags.insert(FLAG_WAITING_PERIOD_ACTIVE);
    }

    flags
}

/// `inactive` for any plan that is not active, `action_required` when any
/// action flag is set, otherwise `verified`.
pub fn derive_verification_status(plan_status: PlanStatus, flags: &ActionFlags) -> VerificationStatus {
    if plan_status != PlanStatus::Active {
        VerificationStatus::Inactive
    } else if ACTION_FLAGS.iter().any(|f| flags.contains(f)) {
        VerificationStatus::ActionRequired
    } else {
        VerificationStatus::Verified
    }
}

/// Add derived flags to a source answer and set its status from them.
///
/// Answers that failed, carry an ambiguous status, or do not report a plan
/// status are returned untouched: there is nothing to derive from them and
/// the ambiguity must reach the thin-data check as reported. Flags the
/// source sent itself are kept, ahead of the derived ones.
pub fn normalize(mut result: VerificationResult) -> VerificationResult {
    if result.fail_category.is_some()
        || result.verification_status.is_ambiguous()
        || result.plan_status == PlanStatus::Unknown
    {
        return result;
    }
    for flag in derive_action_flags(&result).iter() {
        result.action_flags.insert(flag);
    }
    result.verification_status =
        derive_verification_status(result.plan_status, &result.action_flags);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_flags_alone_can_require_action() {
        let flags: ActionFlags = vec![FLAG_PRE_AUTH_REQUIRED].into_iter().collect();
        assert_eq!(
            derive_verification_status(PlanStatus::Active, &flags),
            VerificationStatus::ActionRequired
        );
        assert_eq!(
            derive_verification_status(PlanStatus::Active, &ActionFlags::new()),
            VerificationStatus::Verified
        );
        assert_eq!(
            derive_verification_status(PlanStatus::Terminated, &ActionFlags::new()),
            VerificationStatus::Inactive
        );
    }

    #[test]
    fn ambiguous_answers_pass_through() {
        let r = VerificationResult {
            verification_status: VerificationStatus::Unknown,
            plan_status: PlanStatus::Active,
            annual_remaining_cents: Some(0),
            ..Default::default()
        };
        assert_eq!(normalize(r.clone()), r);

        let unknown_plan = VerificationResult {
            verification_status: VerificationStatus::Verified,
            annual_remaining_cents: Some(0),
            ..Default::default()
        };
        assert_eq!(normalize(unknown_plan.clone()), unknown_plan);
    }
}
