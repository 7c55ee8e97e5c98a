//! Error taxonomy for eligibility verification.
//!
//! Every source failure is classified exactly once, at the source boundary,
//! into an [`ErrorCategory`]. The category then drives staff guidance text,
//! the stale-credential alert signal, and whether a retry is worthwhile.

use serde::{Deserialize, Serialize};

/// Classification of a failed eligibility request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    SourceUnavailable,
    AuthRejected,
    DataNotFound,
    Unsupported,
    /// DOB mismatch, missing member id and similar input problems.
    Malformed,
    Configuration,
    RateLimited,
    Unknown,
}

impl ErrorCategory {
    /// Staff-facing guidance for this failure class.
    pub fn guidance(&self) -> &'static str {
        match self {
            ErrorCategory::SourceUnavailable => {
                "The eligibility service did not respond. Retry in a few minutes or call the payer."
            }
            ErrorCategory::AuthRejected => {
                "The clearinghouse rejected our credentials. Ask an administrator to re-enter them."
            }
            ErrorCategory::DataNotFound => {
                "The payer found no matching member. Confirm the member ID and subscriber on the card."
            }
            ErrorCategory::Unsupported => {
                "This payer does not support electronic eligibility. Verify by phone or portal."
            }
            ErrorCategory::Malformed => {
                "Patient details were rejected (date of birth or member ID). Correct the record and retry."
            }
            ErrorCategory::Configuration => {
                "Eligibility is not configured for this practice. Check the integration settings."
            }
            ErrorCategory::RateLimited => {
                "Too many requests were sent to the payer. The check will be retried shortly."
            }
            ErrorCategory::Unknown => {
                "Verification failed for an unknown reason. Retry, then verify manually if it persists."
            }
        }
    }

    /// Whether the failure suggests stored credentials have gone stale.
    pub fn credential_likely_stale(&self) -> bool {
        matches!(self, ErrorCategory::AuthRejected)
    }

    /// Configuration and malformed-input failures need out-of-band correction.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::Configuration | ErrorCategory::Malformed)
    }

    /// Stable wire name, used in `_failCategory`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::SourceUnavailable => "SourceUnavailable",
            ErrorCategory::AuthRejected => "AuthRejected",
            ErrorCategory::DataNotFound => "DataNotFound",
            ErrorCategory::Unsupported => "Unsupported",
            ErrorCategory::Malformed => "Malformed",
            ErrorCategory::Configuration => "Configuration",
            ErrorCategory::RateLimited => "RateLimited",
            ErrorCategory::Unknown => "Unknown",
        }
    }

    /// Classify an HTTP status returned by a source.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorCategory::AuthRejected,
            404 => ErrorCategory::DataNotFound,
            400 | 422 => ErrorCategory::Malformed,
            429 => ErrorCategory::RateLimited,
            501 => ErrorCategory::Unsupported,
            500..=599 => ErrorCategory::SourceUnavailable,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Best-effort classification of a free-text failure message.
    pub fn from_message(message: &str) -> Self {
        let m = message.to_lowercase();
        if m.contains("unauthorized") || m.contains("credential") || m.contains("forbidden") {
            ErrorCategory::AuthRejected
        } else if m.contains("rate limit") || m.contains("too many requests") {
            ErrorCategory::RateLimited
        } else if m.contains("date of birth") || m.contains("dob") || m.contains("member id") {
            ErrorCategory::Malformed
        } else if m.contains("not found") || m.contains("no match") {
            ErrorCategory::DataNotFound
        } else if m.contains("not supported") || m.contains("unsupported") {
            ErrorCategory::Unsupported
        } else if m.contains("timeout") || m.contains("timed out") || m.contains("unavailable") {
            ErrorCategory::SourceUnavailable
        } else if m.contains("not configured") || m.contains("missing api key") {
            ErrorCategory::Configuration
        } else {
            ErrorCategory::Unknown
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = EligError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SourceUnavailable" => Ok(ErrorCategory::SourceUnavailable),
            "AuthRejected" => Ok(ErrorCategory::AuthRejected),
            "DataNotFound" => Ok(ErrorCategory::DataNotFound),
            "Unsupported" => Ok(ErrorCategory::Unsupported),
            "Malformed" => Ok(ErrorCategory::Malformed),
            "Configuration" => Ok(ErrorCategory::Configuration),
            "RateLimited" => Ok(ErrorCategory::RateLimited),
            "Unknown" => Ok(ErrorCategory::Unknown),
            other => Err(EligError::InvalidInput(format!(
                "unknown error category: {other}"
            ))),
        }
    }
}

/// A categorized failure reported by an eligibility or fallback source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct SourceError {
    pub category: ErrorCategory,
    pub message: String,
}

impl SourceError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Classify a message with [`ErrorCategory::from_message`].
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            category: ErrorCategory::from_message(&message),
            message,
        }
    }
}

/// Eligibility domain errors.
#[derive(Debug, thiserror::Error)]
pub enum EligError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for eligibility domain operations.
pub type Result<T> = std::result::Result<T, EligError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_and_malformed_are_terminal() {
        let all = [
            ErrorCategory::SourceUnavailable,
            ErrorCategory::AuthRejected,
            ErrorCategory::DataNotFound,
            ErrorCategory::Unsupported,
            ErrorCategory::Malformed,
            ErrorCategory::Configuration,
            ErrorCategory::RateLimited,
            ErrorCategory::Unknown,
        ];
        let terminal: Vec<_> = all.iter().filter(|c| !c.is_retryable()).collect();
        assert_eq!(
            terminal,
            vec![&ErrorCategory::Malformed, &ErrorCategory::Configuration]
        );
    }

    #[test]
    fn auth_rejection_signals_stale_credentials() {
        assert!(ErrorCategory::AuthRejected.credential_likely_stale());
        assert!(!ErrorCategory::SourceUnavailable.credential_likely_stale());
    }

    #[test]
    fn http_status_classification() {
        assert_eq!(ErrorCategory::from_http_status(401), ErrorCategory::AuthRejected);
        assert_eq!(ErrorCategory::from_http_status(429), ErrorCategory::RateLimited);
        assert_eq!(ErrorCategory::from_http_status(503), ErrorCategory::SourceUnavailable);
        assert_eq!(ErrorCategory::from_http_status(422), ErrorCategory::Malformed);
        assert_eq!(ErrorCategory::from_http_status(418), ErrorCategory::Unknown);
    }

    #[test]
    fn message_classification() {
        assert_eq!(
            ErrorCategory::from_message("Date of birth does not match"),
            ErrorCategory::Malformed
        );
        assert_eq!(
            ErrorCategory::from_message("request timed out"),
            ErrorCategory::SourceUnavailable
        );
        assert_eq!(ErrorCategory::from_message("boom"), ErrorCategory::Unknown);
    }

    #[test]
    fn category_name_round_trips() {
        let parsed: ErrorCategory = "RateLimited".parse().unwrap();
        assert_eq!(parsed, ErrorCategory::RateLimited);
        assert!("Nope".parse::<ErrorCategory>().is_err());
    }

    #[test]
    fn source_error_display() {
        let err = SourceError::new(ErrorCategory::DataNotFound, "no member");
        assert_eq!(err.to_string(), "DataNotFound: no member");
    }
}
