//! What caused a verification to run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "24h_auto")]
    Auto24h,
    #[serde(rename = "7d_auto")]
    Auto7d,
    #[serde(rename = "medicaid_auto")]
    MedicaidAuto,
    /// Internal: the fallback request issued after thin api data.
    #[serde(rename = "rpa_fallback")]
    RpaFallback,
    #[serde(rename = "batch")]
    Batch,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Auto24h => "24h_auto",
            Trigger::Auto7d => "7d_auto",
            Trigger::MedicaidAuto => "medicaid_auto",
            Trigger::RpaFallback => "rpa_fallback",
            Trigger::Batch => "batch",
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(
            self,
            Trigger::Auto24h | Trigger::Auto7d | Trigger::MedicaidAuto
        )
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Trigger {
    type Err = super::EligError;

    fn from_str(s: &str) -> super::Result<Self> {
        match s {
            "manual" => Ok(Trigger::Manual),
            "24h_auto" => Ok(Trigger::Auto24h),
            "7d_auto" => Ok(Trigger::Auto7d),
            "medicaid_auto" => Ok(Trigger::MedicaidAuto),
            "rpa_fallback" => Ok(Trigger::RpaFallback),
            "batch" => Ok(Trigger::Batch),
            other => Err(super::EligError::InvalidInput(format!(
                "unknown trigger: {other}"
            ))),
        }
    }
}
