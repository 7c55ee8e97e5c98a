//! Derived action flags and status over representative payer answers.

use elig_core::normalize::{derive_action_flags, normalize};
use elig_core::{PlanStatus, VerificationResult, VerificationStatus};
use serde_json::{json, Value};

fn answer(v: Value) -> VerificationResult {
    serde_json::from_value(v).unwrap()
}

fn flags(r: &VerificationResult) -> Vec<&str> {
    r.action_flags.iter().collect()
}

#[test]
fn active_clean_plan_is_verified_without_flags() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "payer_name": "Delta Dental PPO",
        "annual_maximum_cents": 200000,
        "annual_remaining_cents": 145000,
        "individual_deductible_cents": 5000,
        "individual_deductible_met_cents": 5000,
        "preventive": {
            "coverage_pct": 100,
            "cleaning_frequency": {"times_per_period": 2, "used_this_period": 1}
        },
        "restorative": {"coverage_pct": 80, "composite_posterior_downgrade": false},
        "missing_tooth_clause": {"applies": false}
    })));
    assert_eq!(r.verification_status, VerificationStatus::Verified);
    assert!(r.action_flags.is_empty());
}

#[test]
fn used_up_cleanings_need_action() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "annual_remaining_cents": 88000,
        "preventive": {
            "cleaning_frequency": {
                "times_per_period": 2,
                "used_this_period": 2,
                "next_eligible_date": "2027-01-01"
            }
        }
    })));
    assert_eq!(r.verification_status, VerificationStatus::ActionRequired);
    assert_eq!(flags(&r), vec!["frequency_limit"]);
}

#[test]
fn missing_tooth_clause_with_exclusions_needs_pre_auth() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "annual_remaining_cents": 150000,
        "individual_deductible_met_cents": 0,
        "missing_tooth_clause": {
            "applies": true,
            "affected_teeth": ["#14"],
            "excluded_services": ["D6010", "D6240"]
        }
    })));
    assert_eq!(r.verification_status, VerificationStatus::ActionRequired);
    assert_eq!(flags(&r), vec!["missing_tooth_clause", "pre_auth_required"]);
}

#[test]
fn inactive_plan_flags_only_the_plan() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "inactive",
        "annual_remaining_cents": 0,
        "missing_tooth_clause": {"applies": false}
    })));
    assert_eq!(r.verification_status, VerificationStatus::Inactive);
    assert_eq!(r.plan_status, PlanStatus::Inactive);
    assert_eq!(flags(&r), vec!["plan_inactive"]);
}

#[test]
fn composite_downgrade_and_low_max_are_both_flagged() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "annual_remaining_cents": 22000,
        "restorative": {"composite_posterior_downgrade": true},
        "missing_tooth_clause": {"applies": false}
    })));
    assert_eq!(r.verification_status, VerificationStatus::ActionRequired);
    assert_eq!(flags(&r), vec!["annual_max_low", "composite_downgrade"]);
}

#[test]
fn unmet_deductible_alone_is_still_verified() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "annual_remaining_cents": 145000,
        "individual_deductible_cents": 5000,
        "individual_deductible_met_cents": 0,
        "restorative": {"composite_posterior_downgrade": false},
        "missing_tooth_clause": {"applies": false}
    })));
    assert_eq!(r.verification_status, VerificationStatus::Verified);
    assert!(r.action_flags.is_empty());
}

#[test]
fn exhausted_and_unreported_max_stay_distinct() {
    let exhausted = answer(json!({"plan_status": "active", "annual_remaining_cents": 0}));
    assert_eq!(flags(&normalize_active(exhausted)), vec!["annual_max_exhausted"]);

    let unreported = answer(json!({"plan_status": "active", "annual_remaining_cents": null}));
    assert!(derive_action_flags(&unreported).is_empty());
}

#[test]
fn waiting_period_and_source_flags_are_kept_together() {
    let r = normalize(answer(json!({
        "verification_status": "verified",
        "plan_status": "active",
        "major": {"waiting_period_months": 12},
        "action_flags": ["portal_note"]
    })));
    assert_eq!(flags(&r), vec!["portal_note", "waiting_period_active"]);
    assert_eq!(r.verification_status, VerificationStatus::ActionRequired);
}

fn normalize_active(mut r: VerificationResult) -> VerificationResult {
    r.verification_status = VerificationStatus::Verified;
    normalize(r)
}
