//! Routing for pre-authorization requests.
//!
//! [`resolve`] always returns a filled [`PayerContact`]; unknown values are
//! empty strings rather than absent.

use serde::{Deserialize, Serialize};

use crate::domain::{Patient, VerificationResult};
use crate::medicaid;

/// Where to send a pre-authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerContact {
    pub name: String,
    pub email: String,
    pub fax: String,
    /// How the contact was chosen, for display.
    pub label: String,
}

struct Entry {
    key: &'static str,
    name: &'static str,
    email: &'static str,
    fax: &'static str,
}

const MEDICAID_STATE_CONTACTS: &[Entry] = &[
    Entry { key: "CA", name: "Medi-Cal Dental Prior Authorization", email: "tar@medi-cal-dental.example", fax: "(916) 555-0140" },
    Entry { key: "TX", name: "Texas Medicaid Dental Prior Authorization", email: "dental-pa@tmhp.example", fax: "(512) 555-0171" },
    Entry { key: "NY", name: "New York Medicaid Dental Prior Approval", email: "dental-pa@emedny.example", fax: "(518) 555-0102" },
    Entry { key: "FL", name: "Florida Medicaid Dental Services", email: "dental-pa@flmedicaid.example", fax: "(850) 555-0188" },
    Entry { key: "IL", name: "Illinois HFS Dental Program", email: "dental-pa@hfs-il.example", fax: "(217) 555-0133" },
    Entry { key: "AZ", name: "AHCCCS Dental Prior Authorization", email: "dental-pa@ahcccs.example", fax: "(602) 555-0125" },
    Entry { key: "WA", name: "Apple Health Dental Authorization", email: "dental-pa@hca-wa.example", fax: "(360) 555-0119" },
    Entry { key: "MA", name: "MassHealth Dental Program", email: "dental-pa@masshealth.example", fax: "(617) 555-0164" },
];

const GENERIC_MEDICAID: Entry = Entry {
    key: "",
    name: "State Medicaid Dental Program",
    email: "",
    fax: "",
};

const COMMERCIAL_CONTACTS: &[Entry] = &[
    Entry { key: "DELTA_PPO", name: "Delta Dental Pre-Treatment Review", email: "pretreatment@deltadental.example", fax: "(800) 555-0110" },
    Entry { key: "CIGNA", name: "Cigna Dental Pre-Determination", email: "predetermination@cigna.example", fax: "(800) 555-0121" },
    Entry { key: "AETNA_DMO", name: "Aetna Dental Pre-Authorization", email: "dental-preauth@aetna.example", fax: "(800) 555-0132" },
    Entry { key: "GUARDIAN", name: "Guardian Dental Pre-Treatment", email: "pretreatment@guardian.example", fax: "(800) 555-0143" },
    Entry { key: "METLIFE", name: "MetLife Dental Pre-Treatment", email: "pretreatment@metlife.example", fax: "(800) 555-0154" },
    Entry { key: "BCBS", name: "Blue Cross Blue Shield Dental Review", email: "dental-review@bcbs.example", fax: "(800) 555-0165" },
    Entry { key: "UHC", name: "UnitedHealthcare Dental Pre-Determination", email: "dental-predet@uhc.example", fax: "(800) 555-0176" },
    Entry { key: "HUMANA", name: "Humana Dental Pre-Authorization", email: "dental-preauth@humana.example", fax: "(800) 555-0187" },
    Entry { key: "TRICARE", name: "TRICARE Dental Program Review", email: "tdp-review@tricare.example", fax: "(800) 555-0198" },
];

/// Carrier name fragments, most specific first.
const CARRIER_FRAGMENTS: &[Entry] = &[
    Entry { key: "united concordia", name: "United Concordia Dental Review", email: "dental-review@unitedconcordia.example", fax: "(800) 555-0209" },
    Entry { key: "delta", name: "Delta Dental Pre-Treatment Review", email: "pretreatment@deltadental.example", fax: "(800) 555-0110" },
    Entry { key: "cigna", name: "Cigna Dental Pre-Determination", email: "predetermination@cigna.example", fax: "(800) 555-0121" },
    Entry { key: "aetna", name: "Aetna Dental Pre-Authorization", email: "dental-preauth@aetna.example", fax: "(800) 555-0132" },
    Entry { key: "guardian", name: "Guardian Dental Pre-Treatment", email: "pretreatment@guardian.example", fax: "(800) 555-0143" },
    Entry { key: "metlife", name: "MetLife Dental Pre-Treatment", email: "pretreatment@metlife.example", fax: "(800) 555-0154" },
    Entry { key: "blue cross", name: "Blue Cross Blue Shield Dental Review", email: "dental-review@bcbs.example", fax: "(800) 555-0165" },
    Entry { key: "united", name: "UnitedHealthcare Dental Pre-Determination", email: "dental-predet@uhc.example", fax: "(800) 555-0176" },
    Entry { key: "humana", name: "Humana Dental Pre-Authorization", email: "dental-preauth@humana.example", fax: "(800) 555-0187" },
    Entry { key: "principal", name: "Principal Dental Pre-Treatment", email: "pretreatment@principal.example", fax: "(800) 555-0220" },
];

fn contact(entry: &Entry, label: impl Into<String>) -> PayerContact {
    PayerContact {
        name: entry.name.to_string(),
        email: entry.email.to_string(),
        fax: entry.fax.to_string(),
        label: label.into(),
    }
}

/// Resolve the pre-auth destination for a patient.
///
/// Priority: Medicaid state contact (or the generic Medicaid placeholder),
/// exact commercial payer id, carrier name fragment, then the payer's own
/// display name with no email or fax.
pub fn resolve(patient: &Patient, result: Option<&VerificationResult>) -> PayerContact {
    let medicaid_info_state = result
        .and_then(|r| r.medicaid_info.as_ref())
        .map(|m| m.state.as_deref());
    if medicaid::is_medicaid(patient) || medicaid_info_state.is_some() {
        let state = medicaid_info_state
            .flatten()
            .or_else(|| medicaid::detect_state(patient));
        if let Some(state) = state {
            if let Some(entry) = MEDICAID_STATE_CONTACTS
                .iter()
                .find(|e| e.key.eq_ignore_ascii_case(state))
            {
                return contact(entry, format!("Medicaid ({})", entry.key));
            }
        }
        return contact(&GENERIC_MEDICAID, "Medicaid");
    }

    let payer_id = result
        .and_then(|r| r.payer_id.as_deref())
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(patient.payer_id.as_str())
        .trim()
        .to_ascii_uppercase();
    if let Some(entry) = COMMERCIAL_CONTACTS.iter().find(|e| e.key == payer_id) {
        return contact(entry, "Payer directory");
    }

    let display = result
        .and_then(|r| r.payer_name.as_deref())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(patient.insurance_name.as_str());
    let lowered = display.to_lowercase();
    if let Some(entry) = CARRIER_FRAGMENTS.iter().find(|e| lowered.contains(e.key)) {
        return contact(entry, "Carrier match");
    }

    PayerContact {
        name: display.trim().to_string(),
        email: String::new(),
        fax: String::new(),
        label: "Payer on file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MedicaidInfo;

    fn patient(payer_id: &str, insurance: &str) -> Patient {
        Patient {
            id: "p1".into(),
            payer_id: payer_id.into(),
            insurance_name: insurance.into(),
            ..Default::default()
        }
    }

    #[test]
    fn medicaid_state_contact() {
        let c = resolve(&patient("MCDCA", "Medi-Cal"), None);
        assert_eq!(c.label, "Medicaid (CA)");
        assert!(!c.fax.is_empty());
    }

    #[test]
    fn medicaid_without_state_gets_placeholder() {
        let c = resolve(&patient("", "Some Medicaid MCO"), None);
        assert_eq!(c.name, "State Medicaid Dental Program");
        assert_eq!(c.email, "");
        assert_eq!(c.label, "Medicaid");
    }

    #[test]
    fn medicaid_info_on_result_routes_to_state() {
        let r = VerificationResult {
            medicaid_info: Some(MedicaidInfo {
                state: Some("tx".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let c = resolve(&patient("", "Community Health Plan"), Some(&r));
        assert_eq!(c.label, "Medicaid (TX)");
    }

    #[test]
    fn exact_payer_id_beats_fragment() {
        let c = resolve(&patient("metlife", "Cigna something"), None);
        assert_eq!(c.name, "MetLife Dental Pre-Treatment");
        assert_eq!(c.label, "Payer directory");
    }

    #[test]
    fn united_concordia_is_not_united_healthcare() {
        let c = resolve(&patient("", "United Concordia Dental"), None);
        assert_eq!(c.name, "United Concordia Dental Review");
        let c = resolve(&patient("", "United Healthcare Dental"), None);
        assert_eq!(c.name, "UnitedHealthcare Dental Pre-Determination");
    }

    #[test]
    fn fallback_echoes_display_name() {
        let c = resolve(&patient("XYZ01", "Acme Dental Benefits "), None);
        assert_eq!(c.name, "Acme Dental Benefits");
        assert_eq!(c.email, "");
        assert_eq!(c.fax, "");
        assert_eq!(c.label, "Payer on file");
    }
}
