//! Boundary normalisation of money inputs.
//!
//! Upstream payloads carry either integer cents or decimal dollars. They are
//! converted to cents once, here, and nothing downstream sees dollars.

use serde::{Deserialize, Serialize};

/// A money amount as supplied at the input boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Money {
    Cents(i64),
    Dollars(f64),
}

impl Money {
    /// Integer cents, rounding dollars half away from zero.
    pub fn to_cents(self) -> i64 {
        match self {
            Money::Cents(c) => c,
            Money::Dollars(d) => (d * 100.0).round() as i64,
        }
    }

    /// Pick the cents field when present, otherwise the dollar fallback.
    pub fn from_pair(cents: Option<i64>, dollars: Option<f64>) -> Option<Self> {
        match (cents, dollars) {
            (Some(c), _) => Some(Money::Cents(c)),
            (None, Some(d)) => Some(Money::Dollars(d)),
            (None, None) => None,
        }
    }
}

/// Render cents as `$1,234.56`.
pub fn format_dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", abs % 100)
}
