//! Patient context supplied to verification and triage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled patient as seen by the verification pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub dob: Option<NaiveDate>,
    /// Free text: CDT codes, tooth numbers, surfaces ("D2740 crown #14").
    pub procedure: String,
    pub insurance_name: String,
    pub payer_id: String,
    pub member_id: String,
    pub appointment_at: Option<DateTime<Utc>>,
    pub fee_cents: Option<i64>,
    /// Completed procedures from the practice management system, used to
    /// date extractions for missing tooth clause checks.
    pub tooth_history: Vec<ToothRecord>,
}

/// One completed procedure on the patient's chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToothRecord {
    #[serde(default)]
    pub tooth: Option<String>,
    pub procedure: String,
    pub date: NaiveDate,
}

impl Patient {
    pub fn new(id: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            procedure: procedure.into(),
            ..Default::default()
        }
    }

    /// Whole hours from `now` until the appointment, rounded down, so any
    /// appointment already passed is negative.
    pub fn hours_until_appointment(&self, now: DateTime<Utc>) -> Option<i64> {
        self.appointment_at
            .map(|at| at.signed_duration_since(now).num_seconds().div_euclid(3600))
    }

    /// The subset of patient data a source needs to look up benefits.
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            patient_id: self.id.clone(),
            name: self.name.clone(),
            dob: self.dob,
            payer_id: self.payer_id.clone(),
            insurance_name: self.insurance_name.clone(),
            member_id: self.member_id.clone(),
        }
    }
}

/// Identity sent to an eligibility or fallback source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentity {
    pub patient_id: String,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub payer_id: String,
    pub insurance_name: String,
    pub member_id: String,
}
