//! Deterministic merge of a primary (api) and secondary (fallback) result.
//!
//! Only allow-listed fields are merged; everything else comes from the
//! primary. The primary always wins when it has a value. The output is
//! tagged `_source = hybrid` even when the secondary contributed nothing.

use crate::domain::{
    PlanStatus, ResultSource, VerificationResult, VerificationStatus, THIN_DATA_FLAG,
};
use crate::thin_data::is_thin;

/// Fields filled from the secondary when the primary is null.
pub const MERGED_FIELDS: &[&str] = &[
    "payer_name",
    "payer_id",
    "insurance_type",
    "in_network",
    "plan_begin_date",
    "plan_end_date",
    "annual_maximum_cents",
    "annual_used_cents",
    "annual_remaining_cents",
    "individual_deductible_cents",
    "individual_deductible_met_cents",
    "family_deductible_cents",
    "family_deductible_met_cents",
    "preventive",
    "restorative",
    "basic",
    "major",
    "ortho",
    "missing_tooth_clause",
    "assignment_of_benefits",
    "frequency_limits",
    "medicaid_info",
    "oon_estimate",
    "verified_at",
];

fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if dst.is_none() {
        if let Some(v) = src {
            *dst = Some(v.clone());
        }
    }
}

/// Merge `secondary` into `primary`.
pub fn merge(primary: &VerificationResult, secondary: &VerificationResult) -> VerificationResult {
    let mut out = primary.clone();

    fill(&mut out.payer_name, &secondary.payer_name);
    fill(&mut out.payer_id, &secondary.payer_id);
    fill(&mut out.insurance_type, &secondary.insurance_type);
    fill(&mut out.in_network, &secondary.in_network);
    fill(&mut out.plan_begin_date, &secondary.plan_begin_date);
    fill(&mut out.plan_end_date, &secondary.plan_end_date);
    fill(&mut out.annual_maximum_cents, &secondary.annual_maximum_cents);
    fill(&mut out.annual_used_cents, &secondary.annual_used_cents);
    fill(&mut out.annual_remaining_cents, &secondary.annual_remaining_cents);
    fill(
        &mut out.individual_deductible_cents,
        &secondary.individual_deductible_cents,
    );
    fill(
        &mut out.individual_deductible_met_cents,
        &secondary.individual_deductible_met_cents,
    );
    fill(&mut out.family_deductible_cents, &secondary.family_deductible_cents);
    fill(
        &mut out.family_deductible_met_cents,
        &secondary.family_deductible_met_cents,
    );
    fill(&mut out.preventive, &secondary.preventive);
    fill(&mut out.restorative, &secondary.restorative);
    fill(&mut out.basic, &secondary.basic);
    fill(&mut out.major, &secondary.major);
    fill(&mut out.ortho, &secondary.ortho);
    fill(&mut out.missing_tooth_clause, &secondary.missing_tooth_clause);
    fill(&mut out.assignment_of_benefits, &secondary.assignment_of_benefits);
    fill(&mut out.frequency_limits, &secondary.frequency_limits);
    fill(&mut out.medicaid_info, &secondary.medicaid_info);
    fill(&mut out.oon_estimate, &secondary.oon_estimate);
    fill(&mut out.verified_at, &secondary.verified_at);

    // `unknown` is the null of plan_status.
    if out.plan_status == PlanStatus::Unknown && secondary.plan_status != PlanStatus::Unknown {
        out.plan_status = secondary.plan_status;
    }

    let mut flags = primary.action_flags.without_sentinel();
    for flag in secondary.action_flags.iter() {
        if flag != THIN_DATA_FLAG {
            flags.insert(flag);
        }
    }
    out.action_flags = flags;

    let primary_needs_status =
        primary.verification_status.is_ambiguous() || is_thin(primary);
    if primary_needs_status && secondary.verification_status != VerificationStatus::Unknown {
        out.verification_status = secondary.verification_status;
        out.fail_reason = secondary.fail_reason.clone();
        out.fail_category = secondary.fail_category;
    }

    out.source = Some(ResultSource::Hybrid);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionFlags, ErrorCategory, PreventiveBenefits};

    fn api_thin() -> VerificationResult {
        VerificationResult {
            verification_status: VerificationStatus::Verified,
            plan_status: PlanStatus::Active,
            annual_maximum_cents: Some(150_000),
            annual_remaining_cents: Some(0),
            action_flags: ["pre_auth_required", THIN_DATA_FLAG].into_iter().collect(),
            source: Some(ResultSource::Api),
            ..Default::default()
        }
    }

    #[test]
    fn empty_secondary_only_retags_source() {
        let primary = api_thin();
        let merged = merge(&primary, &VerificationResult::default());

        let mut expected = primary.clone();
        expected.source = Some(ResultSource::Hybrid);
        expected.action_flags = primary.action_flags.without_sentinel();
        assert_eq!(merged, expected);
    }

    #[test]
    fn primary_values_win_including_zero() {
        let secondary = VerificationResult {
            annual_remaining_cents: Some(50_000),
            annual_used_cents: Some(100_000),
            ..Default::default()
        };
        let merged = merge(&api_thin(), &secondary);
        assert_eq!(merged.annual_remaining_cents, Some(0));
        assert_eq!(merged.annual_used_cents, Some(100_000));
    }

    #[test]
    fn nulls_are_filled_from_secondary() {
        let secondary = VerificationResult {
            preventive: Some(PreventiveBenefits {
                coverage_pct: Some(100),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(&api_thin(), &secondary);
        assert_eq!(merged.preventive.unwrap().coverage_pct, Some(100));
    }

    #[test]
    fn flags_union_without_sentinel() {
        let secondary = VerificationResult {
            action_flags: ActionFlags::from(vec![
                "composite_downgrade".to_string(),
                THIN_DATA_FLAG.to_string(),
                "pre_auth_required".to_string(),
            ]),
            ..Default::default()
        };
        let merged = merge(&api_thin(), &secondary);
        assert_eq!(
            merged.action_flags.iter().collect::<Vec<_>>(),
            vec!["pre_auth_required", "composite_downgrade"]
        );
    }

    #[test]
    fn thin_primary_takes_secondary_status() {
        let secondary = VerificationResult {
            verification_status: VerificationStatus::ActionRequired,
            ..Default::default()
        };
        let merged = merge(&api_thin(), &secondary);
        assert_eq!(merged.verification_status, VerificationStatus::ActionRequired);
    }

    #[test]
    fn errored_primary_takes_secondary_status_and_drops_failure() {
        let primary = VerificationResult::failed(ErrorCategory::SourceUnavailable, "timeout");
        let secondary = VerificationResult {
            verification_status: VerificationStatus::Verified,
            plan_status: PlanStatus::Active,
            ..Default::default()
        };
        let merged = merge(&primary, &secondary);
        assert_eq!(merged.verification_status, VerificationStatus::Verified);
        assert_eq!(merged.plan_status, PlanStatus::Active);
        assert!(merged.fail_reason.is_none());
        assert!(merged.fail_category.is_none());
    }

    #[test]
    fn complete_primary_keeps_its_status() {
        let mut primary = api_thin();
        primary.preventive = Some(Default::default());
        primary.missing_tooth_clause = Some(Default::default());
        primary.frequency_limits = Some(Default::default());
        let secondary = VerificationResult {
            verification_status: VerificationStatus::Inactive,
            ..Default::default()
        };
        let merged = merge(&primary, &secondary);
        assert_eq!(merged.verification_status, VerificationStatus::Verified);
    }
}
