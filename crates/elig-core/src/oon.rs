//! Out-of-network financial estimate.
//!
//! A four-step waterfall sources the allowable amount for a payer and CDT
//! code, then computes the insurance payment and what the patient owes:
//!
//! 1. Network Check: an in-network payer pays on the contracted rate and the
//!    remaining steps are skipped.
//! 2. Historical Scrubbing: average allowable from past ERAs.
//! 3. RPA Scrape: the payer's MAC schedule, else a 65% UCR estimate.
//! 4. Calculation: the payment formula in [`calculate`].
//!
//! The step list travels with the numbers as an audit trail and must be
//! shown to staff exactly as produced.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::domain::{format_dollars, EligError, Money, Result};

/// Payers the practice is credentialed with when the caller supplies none.
pub const DEFAULT_CREDENTIALING: &[&str] = &[
    "DELTA_PPO",
    "CIGNA",
    "AETNA_DMO",
    "GUARDIAN",
    "METLIFE",
    "BCBS",
    "UHC",
];

/// In-network contracted rate as a share of the office fee.
const CONTRACTED_RATE_PCT: f64 = 85.0;
/// UCR estimate used when no MAC is on file.
const UCR_FALLBACK_PCT: f64 = 65.0;
const DEFAULT_COVERAGE_PCT: f64 = 50.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    InNetwork,
    OutOfNetwork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Contracted,
    HistoricalClaims,
    RpaScrape,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Contracted => "In-Network Contracted Rate",
            DataSource::HistoricalClaims => "Sourced via Historical Claims Data",
            DataSource::RpaScrape => "Sourced via RPA Portal Scrape",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Complete,
    Skipped,
    Failed,
}

/// One audited step of the waterfall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub step: u8,
    pub name: String,
    pub status: StepStatus,
    pub result: String,
}

impl WaterfallStep {
    fn new(step: u8, name: &str, status: StepStatus, result: impl Into<String>) -> Self {
        Self {
            step,
            name: name.to_string(),
            status,
            result: result.into(),
        }
    }
}

const STEP_NETWORK: &str = "Network Check";
const STEP_HISTORY: &str = "Historical Scrubbing";
const STEP_RPA: &str = "RPA Scrape";
const STEP_CALC: &str = "Calculation";

/// Estimate attached to a verification result and consumed by reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OonEstimate {
    pub network_status: NetworkStatus,
    pub procedure_code: String,
    pub office_fee_cents: i64,
    pub allowable_cents: Option<i64>,
    pub contracted_rate_cents: Option<i64>,
    pub data_source: DataSource,
    pub data_source_label: String,
    pub coverage_pct: f64,
    pub remaining_deductible_cents: i64,
    pub estimated_insurance_payment_cents: i64,
    pub patient_responsibility_cents: i64,
    pub waterfall_steps: Vec<WaterfallStep>,
}

/// Normalized waterfall input. All money is cents.
#[derive(Debug, Clone, PartialEq)]
pub struct OonRequest {
    pub patient_id: String,
    pub procedure_code: String,
    pub payer_id: String,
    pub office_fee_cents: i64,
    pub remaining_deductible_cents: i64,
    pub coverage_pct: f64,
    pub credentialing: Vec<String>,
}

/// Wire shape of a waterfall request. Money may arrive as `_cents` integers
/// or decimal dollars; [`OonInput::normalize`] settles it once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OonInput {
    pub patient_id: String,
    pub procedure_code: String,
    pub payer_id: String,
    pub office_fee_cents: Option<i64>,
    pub office_fee: Option<f64>,
    pub remaining_deductible_cents: Option<i64>,
    pub remaining_deductible: Option<f64>,
    pub oon_coverage_pct: Option<f64>,
    pub provider_credentialing: Option<Vec<String>>,
}

impl OonInput {
    pub fn normalize(self) -> Result<OonRequest> {
        let fee = Money::from_pair(self.office_fee_cents, self.office_fee)
            .ok_or_else(|| EligError::InvalidInput("office fee is required".into()))?
            .to_cents();
        if fee < 0 {
            return Err(EligError::InvalidInput("office fee must not be negative".into()));
        }
        let deductible = Money::from_pair(self.remaining_deductible_cents, self.remaining_deductible)
            .map(Money::to_cents)
            .unwrap_or(0)
            .max(0);
        let pct = self.oon_coverage_pct.unwrap_or(DEFAULT_COVERAGE_PCT);
        if !(0.0..=100.0).contains(&pct) {
            return Err(EligError::InvalidInput(format!(
                "coverage percent out of range: {pct}"
            )));
        }
        let procedure_code = self.procedure_code.trim().to_ascii_uppercase();
        if procedure_code.is_empty() {
            return Err(EligError::InvalidInput("procedure code is required".into()));
        }
        Ok(OonRequest {
            patient_id: self.patient_id,
            procedure_code,
            payer_id: self.payer_id.trim().to_ascii_uppercase(),
            office_fee_cents: fee,
            remaining_deductible_cents: deductible,
            coverage_pct: pct,
            credentialing: self.provider_credentialing.unwrap_or_else(|| {
                DEFAULT_CREDENTIALING.iter().map(|s| s.to_string()).collect()
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Fee tables
// ---------------------------------------------------------------------------

/// Historical ERA allowables and portal MAC schedules, keyed by (payer, code).
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    era_history: BTreeMap<(String, String), Vec<i64>>,
    mac: BTreeMap<(String, String), i64>,
}

static BUILTIN: LazyLock<FeeSchedule> = LazyLock::new(|| {
    let mut s = FeeSchedule::default();
    s.add_history("HUMANA", "D2750", &[99200, 97500, 98800, 100500, 96200, 98000, 97800]);
    s.add_history("HUMANA", "D2391", &[32000, 31500, 32800]);
    s.add_history("HUMANA", "D1110", &[8500, 9000, 8800]);
    s.add_history("HUMANA", "D4341", &[19800, 20500, 20200]);
    s.add_history("TRICARE", "D2750", &[85000, 86000, 85500]);
    s.add_history("TRICARE", "D2391", &[29000, 29500]);
    s.add_history("MEDICAID", "D1110", &[5500, 5800, 5700]);

    s.add_mac("HUMANA", "D2750", 94000);
    s.add_mac("HUMANA", "D2391", 30500);
    s.add_mac("HUMANA", "D1110", 8200);
    s.add_mac("HUMANA", "D4341", 19500);
    s.add_mac("TRICARE", "D2750", 84000);
    s.add_mac("MEDICAID", "D1110", 5400);
    s
});

impl FeeSchedule {
    /// The tables shipped with the engine.
    pub fn builtin() -> &'static FeeSchedule {
        &BUILTIN
    }

    pub fn add_history(&mut self, payer: &str, code: &str, allowables_cents: &[i64]) {
        self.era_history
            .entry((payer.to_string(), code.to_string()))
            .or_default()
            .extend_from_slice(allowables_cents);
    }

    pub fn add_mac(&mut self, payer: &str, code: &str, cents: i64) {
        self.mac.insert((payer.to_string(), code.to_string()), cents);
    }

    fn history(&self, payer: &str, code: &str) -> Option<&[i64]> {
        self.era_history
            .get(&(payer.to_string(), code.to_string()))
            .map(Vec::as_slice)
            .filter(|h| !h.is_empty())
    }

    fn mac(&self, payer: &str, code: &str) -> Option<i64> {
        self.mac
            .get(&(payer.to_string(), code.to_string()))
            .copied()
            .filter(|c| *c > 0)
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OonCalculation {
    pub estimated_insurance_payment_cents: i64,
    pub patient_responsibility_cents: i64,
}

fn pct_of(cents: i64, pct: f64) -> i64 {
    (cents as f64 * pct / 100.0).round() as i64
}

/// `insurance = round(max(0, allowable - deductible) * pct / 100)`,
/// `patient = max(0, fee - insurance)`.
pub fn calculate(
    office_fee_cents: i64,
    allowable_cents: i64,
    remaining_deductible_cents: i64,
    coverage_pct: f64,
) -> OonCalculation {
    let billable = (allowable_cents - remaining_deductible_cents).max(0);
    let insurance = pct_of(billable, coverage_pct);
    OonCalculation {
        estimated_insurance_payment_cents: insurance,
        patient_responsibility_cents: (office_fee_cents - insurance).max(0),
    }
}

/// Run the full waterfall against a fee schedule.
pub fn run_waterfall(req: &OonRequest, fees: &FeeSchedule) -> OonEstimate {
    let mut steps = Vec::with_capacity(4);
    let payer = req.payer_id.as_str();
    let code = req.procedure_code.as_str();
    let in_network = req
        .credentialing
        .iter()
        .any(|c| c.eq_ignore_ascii_case(payer));

    if in_network {
        steps.push(WaterfallStep::new(
            1,
            STEP_NETWORK,
            StepStatus::Complete,
            format!("In-Network: {payer} found in provider credentialing list"),
        ));
        steps.push(WaterfallStep::new(
            2,
            STEP_HISTORY,
            StepStatus::Skipped,
            "Not needed; plan is in-network",
        ));
        steps.push(WaterfallStep::new(
            3,
            STEP_RPA,
            StepStatus::Skipped,
            "Not needed; plan is in-network",
        ));
        steps.push(WaterfallStep::new(
            4,
            STEP_CALC,
            StepStatus::Skipped,
            "Contracted rate used directly",
        ));

        let contracted = pct_of(req.office_fee_cents, CONTRACTED_RATE_PCT);
        let insurance = pct_of(contracted, req.coverage_pct);
        return OonEstimate {
            network_status: NetworkStatus::InNetwork,
            procedure_code: req.procedure_code.clone(),
            office_fee_cents: req.office_fee_cents,
            allowable_cents: None,
            contracted_rate_cents: Some(contracted),
            data_source: DataSource::Contracted,
            data_source_label: DataSource::Contracted.label().to_string(),
            coverage_pct: req.coverage_pct,
            remaining_deductible_cents: req.remaining_deductible_cents,
            estimated_insurance_payment_cents: insurance,
            patient_responsibility_cents: (req.office_fee_cents - insurance).max(0),
            waterfall_steps: steps,
        };
    }

    steps.push(WaterfallStep::new(
        1,
        STEP_NETWORK,
        StepStatus::Complete,
        format!("Out-of-Network: {payer} not in provider credentialing list"),
    ));

    let (allowable, source) = match fees.history(payer, code) {
        Some(history) => {
            let total: i64 = history.iter().sum();
            let avg = (total as f64 / history.len() as f64).round() as i64;
            steps.push(WaterfallStep::new(
                2,
                STEP_HISTORY,
                StepStatus::Complete,
                format!(
                    "Found {} historical ERAs for {code} / {payer}; avg allowed: {}",
                    history.len(),
                    format_dollars(avg)
                ),
            ));
            steps.push(WaterfallStep::new(
                3,
                STEP_RPA,
                StepStatus::Skipped,
                "Not needed; history data sufficient",
            ));
            (avg, DataSource::HistoricalClaims)
        }
        None => {
            steps.push(WaterfallStep::new(
                2,
                STEP_HISTORY,
                StepStatus::Complete,
                format!("No ERA history found for {code} / {payer}; escalating to RPA"),
            ));
            let allowable = match fees.mac(payer, code) {
                Some(mac) => {
                    steps.push(WaterfallStep::new(
                        3,
                        STEP_RPA,
                        StepStatus::Complete,
                        format!("Scraped MAC from {payer} portal: {}", format_dollars(mac)),
                    ));
                    mac
                }
                None => {
                    steps.push(WaterfallStep::new(
                        3,
                        STEP_RPA,
                        StepStatus::Complete,
                        "No MAC on file; using 65% UCR estimate",
                    ));
                    pct_of(req.office_fee_cents, UCR_FALLBACK_PCT)
                }
            };
            (allowable, DataSource::RpaScrape)
        }
    };

    let calc = calculate(
        req.office_fee_cents,
        allowable,
        req.remaining_deductible_cents,
        req.coverage_pct,
    );
    steps.push(WaterfallStep::new(
        4,
        STEP_CALC,
        StepStatus::Complete,
        format!(
            "({} allowable - {} deductible) x {:.0}% = {} est. insurance pmt",
            format_dollars(allowable),
            format_dollars(req.remaining_deductible_cents),
            req.coverage_pct,
            format_dollars(calc.estimated_insurance_payment_cents)
        ),
    ));

    OonEstimate {
        network_status: NetworkStatus::OutOfNetwork,
        procedure_code: req.procedure_code.clone(),
        office_fee_cents: req.office_fee_cents,
        allowable_cents: Some(allowable),
        contracted_rate_cents: None,
        data_source: source,
        data_source_label: source.label().to_string(),
        coverage_pct: req.coverage_pct,
        remaining_deductible_cents: req.remaining_deductible_cents,
        estimated_insurance_payment_cents: calc.estimated_insurance_payment_cents,
        patient_responsibility_cents: calc.patient_responsibility_cents,
        waterfall_steps: steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_formula() {
        let c = calculate(145_000, 98_000, 10_000, 50.0);
        assert_eq!(c.estimated_insurance_payment_cents, 44_000);
        assert_eq!(c.patient_responsibility_cents, 101_000);
    }

    #[test]
    fn deductible_larger_than_allowable_pays_nothing() {
        let c = calculate(20_000, 5_000, 10_000, 80.0);
        assert_eq!(c.estimated_insurance_payment_cents, 0);
        assert_eq!(c.patient_responsibility_cents, 20_000);
    }

    #[test]
    fn patient_responsibility_never_negative() {
        let c = calculate(1_000, 50_000, 0, 100.0);
        assert_eq!(c.patient_responsibility_cents, 0);
    }

    #[test]
    fn rounds_half_cents() {
        // 333 * 50% = 166.5
        let c = calculate(1_000, 333, 0, 50.0);
        assert_eq!(c.estimated_insurance_payment_cents, 167);
    }

    #[test]
    fn input_prefers_cents_and_requires_fee() {
        let req = OonInput {
            procedure_code: "d2750".into(),
            payer_id: "humana".into(),
            office_fee_cents: Some(145_000),
            office_fee: Some(1.0),
            remaining_deductible: Some(100.0),
            ..Default::default()
        }
        .normalize()
        .unwrap();
        assert_eq!(req.office_fee_cents, 145_000);
        assert_eq!(req.remaining_deductible_cents, 10_000);
        assert_eq!(req.procedure_code, "D2750");
        assert_eq!(req.payer_id, "HUMANA");
        assert_eq!(req.coverage_pct, 50.0);
        assert_eq!(req.credentialing.len(), DEFAULT_CREDENTIALING.len());

        let missing = OonInput {
            procedure_code: "D2750".into(),
            ..Default::default()
        };
        assert!(missing.normalize().is_err());
    }

    #[test]
    fn out_of_range_coverage_is_rejected() {
        let bad = OonInput {
            procedure_code: "D2750".into(),
            office_fee_cents: Some(100),
            oon_coverage_pct: Some(150.0),
            ..Default::default()
        };
        assert!(bad.normalize().is_err());
    }
}
