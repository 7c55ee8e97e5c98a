//! Medicaid classification and pre-auth routing across realistic patients.

use elig_core::{
    detect_state, is_medicaid, resolve_payer_contact, MedicaidInfo, Patient, VerificationResult,
};

fn patient(payer_id: &str, insurance: &str) -> Patient {
    Patient {
        id: "p1".into(),
        payer_id: payer_id.into(),
        insurance_name: insurance.into(),
        procedure: "D2740".into(),
        ..Default::default()
    }
}

#[test]
fn classifier_and_router_agree_on_medicaid() {
    let cases = [
        ("MCDCA", "", true, Some("CA")),
        ("", "MassHealth Dental", true, Some("MA")),
        ("", "Medicaid Managed Care", true, None),
        ("DELTA_PPO", "Delta Dental PPO", false, None),
    ];
    for (id, name, medicaid, state) in cases {
        let p = patient(id, name);
        assert_eq!(is_medicaid(&p), medicaid, "{id}/{name}");
        assert_eq!(detect_state(&p), state, "{id}/{name}");
        let c = resolve_payer_contact(&p, None);
        assert_eq!(c.label.starts_with("Medicaid"), medicaid, "{id}/{name}");
    }
}

#[test]
fn resolve_never_leaves_fields_unset() {
    let patients = [
        patient("", ""),
        patient("MCDCA", "Medi-Cal"),
        patient("", "Medicaid"),
        patient("CIGNA", ""),
        patient("", "United Concordia"),
        patient("ZZZ", "Unheard Of Mutual"),
    ];
    for p in &patients {
        let c = resolve_payer_contact(p, None);
        let json = serde_json::to_value(&c).unwrap();
        for key in ["name", "email", "fax", "label"] {
            assert!(json[key].is_string(), "{key} missing for {p:?}");
        }
    }
}

#[test]
fn result_payer_fields_take_part_in_routing() {
    let r = VerificationResult {
        payer_id: Some("guardian".into()),
        ..Default::default()
    };
    let c = resolve_payer_contact(&patient("", "Employer Plan"), Some(&r));
    assert_eq!(c.name, "Guardian Dental Pre-Treatment");

    let r = VerificationResult {
        payer_name: Some("Aetna Dental".into()),
        ..Default::default()
    };
    let c = resolve_payer_contact(&patient("", ""), Some(&r));
    assert_eq!(c.label, "Carrier match");
}

#[test]
fn medicaid_info_without_state_falls_back_to_patient_state() {
    let r = VerificationResult {
        medicaid_info: Some(MedicaidInfo::default()),
        ..Default::default()
    };
    let c = resolve_payer_contact(&patient("TXMCD", ""), Some(&r));
    assert_eq!(c.label, "Medicaid (TX)");
}
