//! Medicaid classification.
//!
//! A patient is Medicaid when the payer id is a known state program id, or the
//! insurance name names a state program or Medicaid MCO. State detection walks
//! the same payer-id table first, so an id match can never disagree between
//! [`is_medicaid`] and [`detect_state`].

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{MedicaidFrequency, MedicaidInfo, Patient};

/// Known Medicaid payer ids and the state each belongs to.
const PAYER_ID_STATES: &[(&str, &str)] = &[
    ("MCDCA", "CA"),
    ("DENTICAL", "CA"),
    ("CKCA1", "CA"),
    ("TXMCD", "TX"),
    ("TXHS1", "TX"),
    ("NYMCD", "NY"),
    ("FLMCD", "FL"),
    ("ILMCD", "IL"),
    ("AZMCD", "AZ"),
    ("WAMCD", "WA"),
    ("MAMCD", "MA"),
    ("TNMCD", "TN"),
    ("PAMCD", "PA"),
    ("OHMCD", "OH"),
    ("GAMCD", "GA"),
];

/// Insurance-name fragments that identify a state program. Checked in order.
const KEYWORD_STATES: &[(&str, &str)] = &[
    ("medi-cal", "CA"),
    ("denti-cal", "CA"),
    ("texas health steps", "TX"),
    ("texas medicaid", "TX"),
    ("new york medicaid", "NY"),
    ("florida medicaid", "FL"),
    ("illinois medicaid", "IL"),
    ("ahcccs", "AZ"),
    ("apple health", "WA"),
    ("masshealth", "MA"),
    ("tenncare", "TN"),
    ("pennsylvania medical assistance", "PA"),
    ("ohio medicaid", "OH"),
    ("georgia medicaid", "GA"),
];

static MEDICAID_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(medicaid|medi-cal|denti-cal|texas health steps|ahcccs|apple health|masshealth|tenncare|medical assistance|chip|dentaquest medicaid|mcna|liberty dental plan of)\b",
    )
    .expect("valid Medicaid name pattern")
});

fn normalize_payer_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

fn state_for_payer_id(payer_id: &str) -> Option<&'static str> {
    let id = normalize_payer_id(payer_id);
    if id.is_empty() {
        return None;
    }
    PAYER_ID_STATES
        .iter()
        .find(|(pid, _)| *pid == id)
        .map(|(_, state)| *state)
}

/// Whether the patient's coverage is a Medicaid program.
pub fn is_medicaid(patient: &Patient) -> bool {
    state_for_payer_id(&patient.payer_id).is_some()
        || MEDICAID_NAME_RE.is_match(&patient.insurance_name)
}

/// Two-letter state of the patient's Medicaid program, when it can be told.
pub fn detect_state(patient: &Patient) -> Option<&'static str> {
    if let Some(state) = state_for_payer_id(&patient.payer_id) {
        return Some(state);
    }
    let name = patient.insurance_name.to_lowercase();
    KEYWORD_STATES
        .iter()
        .find(|(kw, _)| name.contains(kw))
        .map(|(_, state)| *state)
}

// ---------------------------------------------------------------------------
// Static state program rules
// ---------------------------------------------------------------------------

/// Prior-authorization and frequency rules for one state program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedicaidStateRules {
    pub state: &'static str,
    pub prior_auth_codes: &'static [&'static str],
    /// (CDT code, maximum per period)
    pub frequency_limits: &'static [(&'static str, u32)],
}

impl MedicaidStateRules {
    pub fn requires_prior_auth(&self, code: &str) -> bool {
        self.prior_auth_codes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
    }

    pub fn frequency_max(&self, code: &str) -> Option<u32> {
        self.frequency_limits
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, max)| *max)
    }

    /// Render as a [`MedicaidInfo`] with zero usage.
    pub fn to_info(&self) -> MedicaidInfo {
        MedicaidInfo {
            state: Some(self.state.to_string()),
            prior_auth_codes: self.prior_auth_codes.iter().map(|c| c.to_string()).collect(),
            frequency_limits: self
                .frequency_limits
                .iter()
                .map(|(c, max)| {
                    let limit = MedicaidFrequency {
                        max: Some(*max),
                        used: 0,
                    };
                    (c.to_string(), limit)
                })
                .collect(),
            copays: Default::default(),
        }
    }
}

const STATE_RULES: &[MedicaidStateRules] = &[
    MedicaidStateRules {
        state: "CA",
        prior_auth_codes: &["D2740", "D2750", "D4341", "D4342", "D5110", "D5120", "D7240"],
        frequency_limits: &[("D1110", 2), ("D0274", 1), ("D0120", 2)],
    },
    MedicaidStateRules {
        state: "TX",
        prior_auth_codes: &["D2740", "D2750", "D3330", "D5110", "D5120", "D8080"],
        frequency_limits: &[("D1110", 2), ("D1120", 2), ("D0274", 1)],
    },
    MedicaidStateRules {
        state: "NY",
        prior_auth_codes: &["D2740", "D2750", "D4341", "D5211", "D5212", "D6010"],
        frequency_limits: &[("D1110", 2), ("D0274", 1)],
    },
    MedicaidStateRules {
        state: "FL",
        prior_auth_codes: &["D2750", "D4341", "D5110", "D5120"],
        frequency_limits: &[("D1110", 2), ("D0120", 2)],
    },
    MedicaidStateRules {
        state: "IL",
        prior_auth_codes: &["D2740", "D4341", "D7240"],
        frequency_limits: &[("D1110", 2)],
    },
    MedicaidStateRules {
        state: "AZ",
        prior_auth_codes: &["D2740", "D2750", "D5110"],
        frequency_limits: &[("D1110", 2)],
    },
    MedicaidStateRules {
        state: "WA",
        prior_auth_codes: &["D2740", "D4341", "D4342"],
        frequency_limits: &[("D1110", 1), ("D0274", 1)],
    },
    MedicaidStateRules {
        state: "MA",
        prior_auth_codes: &["D2740", "D2750", "D5110", "D5120"],
        frequency_limits: &[("D1110", 2)],
    },
];

/// Static program rules for a state, if the state is covered.
pub fn state_rules(state: &str) -> Option<&'static MedicaidStateRules> {
    STATE_RULES
        .iter()
        .find(|r| r.state.eq_ignore_ascii_case(state.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(payer_id: &str, insurance: &str) -> Patient {
        Patient {
            payer_id: payer_id.into(),
            insurance_name: insurance.into(),
            ..Default::default()
        }
    }

    #[test]
    fn payer_id_match_is_case_insensitive() {
        let p = patient(" mcdca ", "Some Plan");
        assert!(is_medicaid(&p));
        assert_eq!(detect_state(&p), Some("CA"));
    }

    #[test]
    fn payer_id_wins_over_name() {
        let p = patient("TXMCD", "Medi-Cal Dental");
        assert_eq!(detect_state(&p), Some("TX"));
    }

    #[test]
    fn name_keywords() {
        assert!(is_medicaid(&patient("", "Texas Medicaid via DentaQuest")));
        assert_eq!(
            detect_state(&patient("", "TennCare Dental")),
            Some("TN")
        );
        assert!(is_medicaid(&patient("", "Generic Medicaid MCO")));
        assert_eq!(detect_state(&patient("", "Generic Medicaid MCO")), None);
    }

    #[test]
    fn commercial_plans_are_not_medicaid() {
        let p = patient("CIGNA", "Cigna Dental PPO");
        assert!(!is_medicaid(&p));
        assert_eq!(detect_state(&p), None);
        assert!(!is_medicaid(&patient("", "Archipelago Dental")));
    }

    #[test]
    fn every_state_keyword_is_also_a_medicaid_keyword() {
        for (kw, state) in KEYWORD_STATES {
            let p = patient("", kw);
            assert!(is_medicaid(&p), "{kw} ({state}) not recognised as Medicaid");
        }
    }

    #[test]
    fn state_rules_lookup() {
        let ca = state_rules("ca").unwrap();
        assert!(ca.requires_prior_auth("d2740"));
        assert_eq!(ca.frequency_max("D1110"), Some(2));
        assert_eq!(ca.frequency_max("D9999"), None);
        assert!(state_rules("ZZ").is_none());

        let info = ca.to_info();
        assert_eq!(info.state.as_deref(), Some("CA"));
        assert_eq!(info.frequency_limits["D1110"].used, 0);
    }
}
