//! Benefit completeness grading.
//!
//! Scores how much of the benefit picture a result carries against a fixed
//! field registry. Informational only: it never changes a triage level.

use serde::{Deserialize, Serialize};

use crate::domain::VerificationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Critical,
    Important,
    NiceToHave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            Grade::A
        } else if score >= 0.85 {
            Grade::B
        } else if score >= 0.70 {
            Grade::C
        } else if score >= 0.50 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

struct FieldSpec {
    path: &'static str,
    description: &'static str,
    criticality: Criticality,
    /// Keywords matched against the procedure text; `*` matches everything.
    procedures: &'static [&'static str],
    present: fn(&VerificationResult) -> bool,
}

fn has_frequency(r: &VerificationResult, code: &str) -> bool {
    r.frequency_limits
        .as_ref()
        .map(|m| m.contains_key(code))
        .unwrap_or(false)
}

const REGISTRY: &[FieldSpec] = &[
    FieldSpec {
        path: "annual_remaining_cents",
        description: "Annual Maximum Remaining",
        criticality: Criticality::Critical,
        procedures: &["*"],
        present: |r| r.annual_remaining_cents.is_some(),
    },
    FieldSpec {
        path: "individual_deductible_cents",
        description: "Individual Deductible (Total)",
        criticality: Criticality::Critical,
        procedures: &["*"],
        present: |r| r.individual_deductible_cents.is_some(),
    },
    FieldSpec {
        path: "individual_deductible_met_cents",
        description: "Deductible Met Year-to-Date",
        criticality: Criticality::Critical,
        procedures: &["*"],
        present: |r| r.individual_deductible_met_cents.is_some(),
    },
    FieldSpec {
        path: "frequency_limits.D2740",
        description: "Crown Frequency Limit (D2740)",
        criticality: Criticality::Critical,
        procedures: &["crown", "D2740", "D2750", "D2751", "D2752"],
        present: |r| has_frequency(r, "D2740"),
    },
    FieldSpec {
        path: "frequency_limits.D4341",
        description: "Perio SRP Frequency Limit (D4341)",
        criticality: Criticality::Critical,
        procedures: &["perio", "SRP", "D4341", "D4342"],
        present: |r| has_frequency(r, "D4341"),
    },
    FieldSpec {
        path: "missing_tooth_clause",
        description: "Missing Tooth Clause",
        criticality: Criticality::Critical,
        procedures: &["implant", "bridge", "partial", "D6010", "D6240", "D5211"],
        present: |r| r.missing_tooth_clause.is_some(),
    },
    FieldSpec {
        path: "frequency_limits.D1110",
        description: "Adult Prophy Frequency (D1110)",
        criticality: Criticality::Important,
        procedures: &["prophy", "cleaning", "D1110", "D1120"],
        present: |r| has_frequency(r, "D1110") || r.cleaning_frequency().is_some(),
    },
    FieldSpec {
        path: "frequency_limits.D0274",
        description: "Bitewing X-Ray Frequency (D0274)",
        criticality: Criticality::Important,
        procedures: &["bitewing", "BWX", "D0274", "D0272"],
        present: |r| {
            has_frequency(r, "D0274")
                || r.preventive
                    .as_ref()
                    .map(|p| p.bitewing_frequency.is_some())
                    .unwrap_or(false)
        },
    },
    FieldSpec {
        path: "major.waiting_period_months",
        description: "Waiting Period, Major Services",
        criticality: Criticality::Important,
        procedures: &["crown", "bridge", "D2740", "D2750", "D6240"],
        present: |r| {
            r.major
                .as_ref()
                .map(|m| m.waiting_period_months.is_some())
                .unwrap_or(false)
        },
    },
    FieldSpec {
        path: "restorative.composite_posterior_downgrade",
        description: "Posterior Composite Downgrade to Amalgam Rate",
        criticality: Criticality::Important,
        procedures: &["composite", "D2330", "D2391", "D2392"],
        present: |r| r.restorative.is_some(),
    },
    FieldSpec {
        path: "frequency_limits.D4910",
        description: "Perio Maintenance Frequency (D4910)",
        criticality: Criticality::Important,
        procedures: &["perio maintenance", "D4910"],
        present: |r| has_frequency(r, "D4910"),
    },
    FieldSpec {
        path: "basic.coverage_pct",
        description: "Basic / Restorative Coverage Percentage",
        criticality: Criticality::Important,
        procedures: &["*"],
        present: |r| r.basic.as_ref().map(|b| b.coverage_pct.is_some()).unwrap_or(false),
    },
    FieldSpec {
        path: "major.coverage_pct",
        description: "Major Services Coverage Percentage",
        criticality: Criticality::Important,
        procedures: &["crown", "bridge", "D2740", "D6240"],
        present: |r| r.major.as_ref().map(|m| m.coverage_pct.is_some()).unwrap_or(false),
    },
    FieldSpec {
        path: "frequency_limits.D1351",
        description: "Sealant Frequency / Age Limit (D1351)",
        criticality: Criticality::NiceToHave,
        procedures: &["sealant", "D1351"],
        present: |r| has_frequency(r, "D1351"),
    },
    FieldSpec {
        path: "ortho.lifetime_maximum_cents",
        description: "Orthodontic Lifetime Maximum",
        criticality: Criticality::NiceToHave,
        procedures: &["ortho", "D8080", "D8090"],
        present: |r| {
            r.ortho
                .as_ref()
                .map(|o| o.lifetime_maximum_cents.is_some())
                .unwrap_or(false)
        },
    },
    FieldSpec {
        path: "preventive.coverage_pct",
        description: "Fluoride / Preventive Coverage",
        criticality: Criticality::NiceToHave,
        procedures: &["fluoride", "D1206", "D1208"],
        present: |r| {
            r.preventive
                .as_ref()
                .map(|p| p.coverage_pct.is_some())
                .unwrap_or(false)
        },
    },
];

fn is_relevant(procedure: &str, keywords: &[&str]) -> bool {
    let lowered = procedure.to_lowercase();
    keywords
        .iter()
        .any(|k| *k == "*" || lowered.contains(&k.to_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingField {
    pub field: String,
    pub description: String,
    pub criticality: Criticality,
    pub relevant_to_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub completeness_score: f64,
    pub grade: Grade,
    pub fields_present: usize,
    pub fields_total: usize,
    /// Missing fields, critical first, registry order within a tier.
    pub missing: Vec<MissingField>,
    /// A critical field relevant to today's procedure is missing.
    pub block_appointment: bool,
}

impl IntegrityReport {
    pub fn missing_with(&self, criticality: Criticality) -> impl Iterator<Item = &MissingField> {
        self.missing
            .iter()
            .filter(move |m| m.criticality == criticality)
    }
}

/// Grade a result for the given procedure text.
pub fn assess(result: &VerificationResult, procedure: &str) -> IntegrityReport {
    let mut missing = Vec::new();
    let mut present = 0usize;

    for spec in REGISTRY {
        if (spec.present)(result) {
            present += 1;
            continue;
        }
        missing.push(MissingField {
            field: spec.path.to_string(),
            description: spec.description.to_string(),
            criticality: spec.criticality,
            relevant_to_today: is_relevant(procedure, spec.procedures),
        });
    }
    missing.sort_by_key(|m| m.criticality);

    let score = present as f64 / REGISTRY.len() as f64;
    let block_appointment = missing
        .iter()
        .any(|m| m.criticality == Criticality::Critical && m.relevant_to_today);

    IntegrityReport {
        completeness_score: score,
        grade: Grade::from_score(score),
        fields_present: present,
        fields_total: REGISTRY.len(),
        missing,
        block_appointment,
    }
}
