//! Staff instructions for HIPAA claim adjustment reason codes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAction {
    pub code: u32,
    pub label: String,
    pub severity: Severity,
    pub action: String,
}

const ACTIONS: &[(u32, &str, Severity, &str)] = &[
    (1, "Deductible Amount", Severity::Info,
     "Confirm the patient's remaining deductible before collecting. Cross-check with the EOB if available."),
    (2, "Coinsurance Amount", Severity::Info,
     "Review the coinsurance percentage in the benefit breakdown and give the patient an out-of-pocket estimate."),
    (3, "Co-payment Amount", Severity::Info,
     "Collect the copay at time of service. Verify the copay tier for this procedure type."),
    (4, "Procedure not covered", Severity::Warning,
     "Confirm the CDT code matches the treatment being rendered. Consider an alternative covered code or submit a narrative."),
    (5, "Service Not Authorized", Severity::Critical,
     "Pre-authorization required. Do not render service until an auth number is obtained from the carrier."),
    (16, "Claim/service lacks info", Severity::Critical,
     "Missing pre-op X-ray or required clinical narrative. Attach documentation and resubmit before proceeding."),
    (18, "Duplicate claim/service", Severity::Warning,
     "Check for a duplicate entry in the PMS. Verify the claim number against the original submission."),
    (22, "This care may be covered by another payer", Severity::Warning,
     "Coordinate benefits: confirm primary vs. secondary payer order and request COB information from the patient."),
    (27, "Expenses incurred after policy terminated", Severity::Critical,
     "Insurance was not active on the date of service. Collect the full fee and advise the patient to contact the carrier."),
    (29, "Claim received after filing limit", Severity::Critical,
     "Filing deadline has passed. Review the timely filing policy and consider an appeal with proof of timely submission."),
    (45, "Charge exceeds fee schedule", Severity::Info,
     "Carrier has a contracted maximum. Adjust the write-off per the PPO agreement; do not balance-bill the patient."),
    (96, "Non-covered charge", Severity::Warning,
     "Service is excluded under this plan. Obtain a signed financial waiver from the patient before proceeding."),
    (97, "Payment included in allowance for another service", Severity::Info,
     "Bundled into a primary procedure. Check the carrier's CDT bundling rules."),
    (109, "Claim not covered by payer", Severity::Critical,
     "Wrong payer or plan. Verify the insurance card and resubmit to the correct carrier."),
    (119, "Benefit maximum for this period has been reached", Severity::Warning,
     "Annual maximum exhausted. Collect the full fee or postpone non-urgent treatment to the next benefit year."),
    (131, "Claim specific negotiated discount", Severity::Info,
     "Contracted discount applied. Confirm the write-off amount matches the fee schedule."),
    (197, "Pre-cert/prior auth not received", Severity::Critical,
     "Authorization missing. Pause treatment, obtain an auth number, then resubmit with the auth reference."),
    (252, "An attachment is required", Severity::Warning,
     "Attach supporting documentation (X-ray, periodontal charting, narrative) and resubmit."),
];

pub fn lookup(code: u32) -> CodeAction {
    match ACTIONS.iter().find(|(c, ..)| *c == code) {
        Some((c, label, severity, action)) => CodeAction {
            code: *c,
            label: label.to_string(),
            severity: *severity,
            action: action.to_string(),
        },
        None => CodeAction {
            code,
            label: format!("Adjustment Code {code}"),
            severity: Severity::Info,
            action: format!("Review carrier documentation for code {code}."),
        },
    }
}

/// Resolve codes in first-seen order, skipping zeros and repeats.
pub fn resolve(codes: &[u32]) -> Vec<CodeAction> {
    let mut seen = Vec::new();
    codes
        .iter()
        .copied()
        .filter(|c| {
            if *c == 0 || seen.contains(c) {
                false
            } else {
                seen.push(*c);
                true
            }
        })
        .map(lookup)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_codes() {
        let out = resolve(&[197, 0, 45, 197, 999]);
        let codes: Vec<u32> = out.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![197, 45, 999]);
        assert_eq!(out[0].severity, Severity::Critical);
        assert_eq!(out[2].label, "Adjustment Code 999");
        assert_eq!(out[2].severity, Severity::Info);
    }
}
