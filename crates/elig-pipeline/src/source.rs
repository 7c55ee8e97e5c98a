//! Verification sources.
//!
//! A source answers one eligibility request for one patient. The primary
//! source is the clearinghouse api; the fallback is a portal scraper. Both
//! sit behind [`VerificationSource`] so the controller never cares which
//! transport produced a result.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use elig_core::{
    normalize_benefits, ErrorCategory, PatientIdentity, ResultSource, SourceError, Trigger,
    VerificationResult,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

/// One eligibility channel.
///
/// Implementations classify their own failures into an [`ErrorCategory`];
/// the controller adds timeout and panic containment around every call.
#[async_trait]
pub trait VerificationSource: Send + Sync {
    /// Short name for logs ("api", "rpa", "fixture").
    fn name(&self) -> &str;

    async fn request(
        &self,
        identity: &PatientIdentity,
        trigger: Trigger,
    ) -> std::result::Result<VerificationResult, SourceError>;
}

// ---------------------------------------------------------------------------
// FixtureSource
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FixtureFailure {
    /// Classified from the message when absent.
    #[serde(default)]
    category: Option<ErrorCategory>,
    message: String,
}

impl FixtureFailure {
    fn into_error(self) -> SourceError {
        match self.category {
            Some(category) => SourceError::new(category, self.message),
            None => SourceError::classify(self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Failure { error: FixtureFailure },
    Answer(VerificationResult),
}

/// Canned answers keyed by patient id. Used for demos, offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    name: String,
    answers: HashMap<String, std::result::Result<VerificationResult, SourceError>>,
}

impl FixtureSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answers: HashMap::new(),
        }
    }

    pub fn with_result(mut self, patient_id: impl Into<String>, result: VerificationResult) -> Self {
        self.answers.insert(patient_id.into(), Ok(result));
        self
    }

    pub fn with_error(mut self, patient_id: impl Into<String>, error: SourceError) -> Self {
        self.answers.insert(patient_id.into(), Err(error));
        self
    }

    /// Load `<patient_id>.json` files from `dir`. A file holding
    /// `{"error": {"category": .., "message": ..}}` becomes a canned failure
    /// (category optional); anything else is read as a result.
    pub fn from_dir(name: impl Into<String>, dir: &Path) -> Result<Self> {
        let mut source = Self::new(name);
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(patient_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path)?;
            let answer = match serde_json::from_str::<FixtureFile>(&raw)? {
                FixtureFile::Failure { error } => Err(error.into_error()),
                FixtureFile::Answer(result) => Ok(result),
            };
            debug!(patient_id = %patient_id, path = %path.display(), "loaded fixture");
            source.answers.insert(patient_id.to_string(), answer);
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[async_trait]
impl VerificationSource for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request(
        &self,
        identity: &PatientIdentity,
        _trigger: Trigger,
    ) -> std::result::Result<VerificationResult, SourceError> {
        match self.answers.get(&identity.patient_id) {
            Some(Ok(result)) => {
                let mut result = normalize_benefits(result.clone());
                if result.source.is_none() {
                    result.source = Some(ResultSource::Fixture);
                }
                Ok(result)
            }
            Some(Err(err)) => Err(err.clone()),
            None => Err(SourceError::new(
                ErrorCategory::DataNotFound,
                format!("no fixture for patient {}", identity.patient_id),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elig_core::{Patient, VerificationStatus};

    fn identity(id: &str) -> PatientIdentity {
        Patient::new(id, "").identity()
    }

    #[tokio::test]
    async fn fixture_tags_source_and_reports_missing_patients() {
        let source = FixtureSource::new("fixture").with_result(
            "p1",
            VerificationResult {
                verification_status: VerificationStatus::Verified,
                ..Default::default()
            },
        );
        let r = source.request(&identity("p1"), Trigger::Manual).await.unwrap();
        assert_eq!(r.source, Some(ResultSource::Fixture));

        let err = source
            .request(&identity("p2"), Trigger::Manual)
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::DataNotFound);
    }

    #[tokio::test]
    async fn fixture_dir_loads_results_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("p1.json"),
            r#"{"verification_status": "verified", "plan_status": "active"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("p2.json"),
            r#"{"error": {"category": "AuthRejected", "message": "401 from clearinghouse"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = FixtureSource::from_dir("fixture", dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let r = source.request(&identity("p1"), Trigger::Manual).await.unwrap();
        assert_eq!(r.verification_status, VerificationStatus::Verified);

        let err = source
            .request(&identity("p2"), Trigger::Manual)
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::AuthRejected);
        assert!(err.category.credential_likely_stale());
    }

    #[tokio::test]
    async fn fixture_answers_carry_derived_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("p1.json"),
            r#"{"verification_status": "verified", "plan_status": "active",
                "annual_remaining_cents": 0,
                "missing_tooth_clause": {"applies": true, "excluded_services": ["D6010"]}}"#,
        )
        .unwrap();
        let source = FixtureSource::from_dir("fixture", dir.path()).unwrap();

        let r = source.request(&identity("p1"), Trigger::Manual).await.unwrap();
        assert_eq!(r.verification_status, VerificationStatus::ActionRequired);
        assert_eq!(
            r.action_flags.iter().collect::<Vec<_>>(),
            vec!["missing_tooth_clause", "pre_auth_required", "annual_max_exhausted"]
        );
    }

    #[tokio::test]
    async fn fixture_failure_without_category_is_classified_from_message() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("p3.json"),
            r#"{"error": {"message": "Subscriber date of birth does not match"}}"#,
        )
        .unwrap();
        let source = FixtureSource::from_dir("fixture", dir.path()).unwrap();

        let err = source
            .request(&identity("p3"), Trigger::Manual)
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::Malformed);
        assert!(err.message.contains("date of birth"));
    }
}
