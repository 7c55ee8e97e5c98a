//! Missing tooth clause risk for a planned prosthetic.
//!
//! Decides, per patient and treatment plan, whether a plan's missing tooth
//! clause puts the planned implant, bridge or denture work at risk of denial:
//!
//! 1. No MTC-sensitive code planned: nothing to flag.
//! 2. Clause status not reported: WARNING, and the portal scraper must look
//!    the clause up.
//! 3. Plan has no clause: nothing to flag.
//! 4. Clause applies: compare the earliest known extraction with the
//!    coverage start. Extracted before coverage, or no extraction date on
//!    file, is CRITICAL. Extracted during coverage is a WARNING.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::cdt;
use crate::domain::{Patient, VerificationResult};
use crate::triage::TriageLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MtcCategory {
    Implant,
    Bridge,
    Denture,
}

impl MtcCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MtcCategory::Implant => "implant",
            MtcCategory::Bridge => "bridge",
            MtcCategory::Denture => "denture",
        }
    }
}

const MTC_SENSITIVE: &[(&str, MtcCategory)] = &[
    ("D6010", MtcCategory::Implant),
    ("D6011", MtcCategory::Implant),
    ("D6012", MtcCategory::Implant),
    ("D6013", MtcCategory::Implant),
    ("D6040", MtcCategory::Implant),
    ("D6041", MtcCategory::Implant),
    ("D6055", MtcCategory::Implant),
    ("D6056", MtcCategory::Implant),
    ("D6057", MtcCategory::Implant),
    ("D6058", MtcCategory::Implant),
    ("D6059", MtcCategory::Implant),
    ("D6065", MtcCategory::Implant),
    ("D6066", MtcCategory::Implant),
    ("D6067", MtcCategory::Implant),
    ("D6068", MtcCategory::Implant),
    ("D6069", MtcCategory::Implant),
    ("D6070", MtcCategory::Implant),
    ("D6071", MtcCategory::Implant),
    ("D6210", MtcCategory::Bridge),
    ("D6211", MtcCategory::Bridge),
    ("D6212", MtcCategory::Bridge),
    ("D6214", MtcCategory::Bridge),
    ("D6240", MtcCategory::Bridge),
    ("D6241", MtcCategory::Bridge),
    ("D6242", MtcCategory::Bridge),
    ("D6243", MtcCategory::Bridge),
    ("D6245", MtcCategory::Bridge),
    ("D6250", MtcCategory::Bridge),
    ("D6251", MtcCategory::Bridge),
    ("D6252", MtcCategory::Bridge),
    ("D6710", MtcCategory::Bridge),
    ("D6720", MtcCategory::Bridge),
    ("D6721", MtcCategory::Bridge),
    ("D6722", MtcCategory::Bridge),
    ("D6740", MtcCategory::Bridge),
    ("D6750", MtcCategory::Bridge),
    ("D6751", MtcCategory::Bridge),
    ("D6752", MtcCategory::Bridge),
    ("D6780", MtcCategory::Bridge),
    ("D6781", MtcCategory::Bridge),
    ("D6782", MtcCategory::Bridge),
    ("D6783", MtcCategory::Bridge),
    ("D6790", MtcCategory::Bridge),
    ("D6791", MtcCategory::Bridge),
    ("D6792", MtcCategory::Bridge),
    ("D5110", MtcCategory::Denture),
    ("D5120", MtcCategory::Denture),
    ("D5130", MtcCategory::Denture),
    ("D5140", MtcCategory::Denture),
    ("D5211", MtcCategory::Denture),
    ("D5212", MtcCategory::Denture),
    ("D5213", MtcCategory::Denture),
    ("D5214", MtcCategory::Denture),
    ("D5221", MtcCategory::Denture),
    ("D5222", MtcCategory::Denture),
    ("D5223", MtcCategory::Denture),
    ("D5224", MtcCategory::Denture),
    ("D5225", MtcCategory::Denture),
    ("D5226", MtcCategory::Denture),
];

/// Simple, surgical and impacted extractions plus residual root removal.
const EXTRACTION_CODES: &[&str] = &[
    "D7140", "D7210", "D7220", "D7230", "D7240", "D7250", "D7251",
];

/// Category of a code that replaces a missing tooth, if it is one.
pub fn category(code: &str) -> Option<MtcCategory> {
    let code = code.trim();
    MTC_SENSITIVE
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, cat)| *cat)
}

pub fn is_sensitive(code: &str) -> bool {
    category(code).is_some()
}

fn is_extraction(code: &str) -> bool {
    let code = code.trim();
    EXTRACTION_CODES.iter().any(|c| c.eq_ignore_ascii_case(code))
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MtcFlag {
    /// Clause status unknown; the portal scraper must check the plan.
    StatusUnknown,
    /// Tooth was missing before coverage began.
    PreExisting,
    /// Tooth was extracted while covered.
    ExtractedDuringCoverage,
    /// Clause applies and no extraction date is on file.
    ExtractionDateUnknown,
}

impl MtcFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MtcFlag::StatusUnknown => "mtc_status_unknown",
            MtcFlag::PreExisting => "mtc_pre_existing",
            MtcFlag::ExtractedDuringCoverage => "mtc_extracted_during_coverage",
            MtcFlag::ExtractionDateUnknown => "mtc_extraction_date_unknown",
        }
    }

    pub fn severity(&self) -> TriageLevel {
        match self {
            MtcFlag::StatusUnknown | MtcFlag::ExtractedDuringCoverage => TriageLevel::Warning,
            MtcFlag::PreExisting | MtcFlag::ExtractionDateUnknown => TriageLevel::Critical,
        }
    }
}

/// A planned code exposed to the clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedCode {
    pub code: String,
    pub category: MtcCategory,
    pub description: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MtcRisk {
    pub flag: Option<MtcFlag>,
    pub severity: Option<TriageLevel>,
    pub description: String,
    pub affected: Vec<AffectedCode>,
    pub extraction_date: Option<NaiveDate>,
    pub coverage_start: Option<NaiveDate>,
    /// `None` when either date is unknown.
    pub pre_existing: Option<bool>,
    pub requires_scraper: bool,
}

impl MtcRisk {
    fn clear(description: &str, affected: Vec<AffectedCode>) -> Self {
        Self {
            flag: None,
            severity: None,
            description: description.to_string(),
            affected,
            extraction_date: None,
            coverage_start: None,
            pre_existing: None,
            requires_scraper: false,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.flag.is_some()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate clause risk for the codes in the patient's procedure text.
pub fn evaluate(patient: &Patient, result: &VerificationResult) -> MtcRisk {
    let affected: Vec<AffectedCode> = cdt::extract_codes(&patient.procedure)
        .into_iter()
        .filter_map(|code| {
            let category = category(&code)?;
            let description = cdt::lookup(&code).map(|e| e.description);
            Some(AffectedCode {
                code,
                category,
                description,
            })
        })
        .collect();
    if affected.is_empty() {
        return MtcRisk::clear("No MTC-sensitive procedures planned.", affected);
    }
    let codes = affected
        .iter()
        .map(|a| a.code.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let Some(clause) = result.missing_tooth_clause.as_ref() else {
        let flag = MtcFlag::StatusUnknown;
        return MtcRisk {
            flag: Some(flag),
            severity: Some(flag.severity()),
            description: format!(
                "MTC status unknown; cannot confirm coverage for {codes}. \
                 Portal check queued. Estimate full patient responsibility until resolved."
            ),
            requires_scraper: true,
            ..MtcRisk::clear("", affected)
        };
    };
    if !clause.applies {
        return MtcRisk::clear("Plan has no missing tooth clause.", affected);
    }

    let coverage_start = clause.coverage_begin.or(result.plan_begin_date);
    let extraction_date = patient
        .tooth_history
        .iter()
        .filter(|r| is_extraction(&r.procedure))
        .map(|r| r.date)
        .chain(clause.extraction_date)
        .min();
    let pre_existing = match (extraction_date, coverage_start) {
        (Some(extracted), Some(start)) => Some(extracted < start),
        _ => None,
    };

    let (flag, description) = match (pre_existing, extraction_date, coverage_start) {
        (Some(true), Some(extracted), Some(start)) => (
            MtcFlag::PreExisting,
            format!(
                "Potential denial: tooth extracted {extracted} before coverage began {start}. \
                 {codes} may not be covered. Collect patient responsibility or seek pre-authorization."
            ),
        ),
        (Some(false), Some(extracted), Some(start)) => (
            MtcFlag::ExtractedDuringCoverage,
            format!(
                "Plan has a missing tooth clause but the tooth was extracted {extracted}, \
                 after coverage began {start}. Document the extraction date for {codes}."
            ),
        ),
        _ => (
            MtcFlag::ExtractionDateUnknown,
            format!(
                "Potential denial: plan has a missing tooth clause and no extraction date is on file \
                 for {codes}. Pull extraction records before treatment."
            ),
        ),
    };

    debug!(patient_id = %patient.id, flag = flag.as_str(), codes = %codes, "mtc risk flagged");
    MtcRisk {
        flag: Some(flag),
        severity: Some(flag.severity()),
        description,
        affected,
        extraction_date,
        coverage_start,
        pre_existing,
        requires_scraper: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_and_extractions() {
        assert_eq!(category("d6010"), Some(MtcCategory::Implant));
        assert_eq!(category("D6240"), Some(MtcCategory::Bridge));
        assert_eq!(category("D5213"), Some(MtcCategory::Denture));
        assert!(!is_sensitive("D1110"));
        assert!(is_extraction("d7140"));
        assert!(!is_extraction("D6010"));
    }

    #[test]
    fn flag_severities() {
        assert_eq!(MtcFlag::StatusUnknown.severity(), TriageLevel::Warning);
        assert_eq!(MtcFlag::PreExisting.severity(), TriageLevel::Critical);
        assert_eq!(MtcFlag::ExtractedDuringCoverage.severity(), TriageLevel::Warning);
        assert_eq!(MtcFlag::ExtractionDateUnknown.severity(), TriageLevel::Critical);
    }
}
