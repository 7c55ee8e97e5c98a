//! HTTP verification source for a clearinghouse or portal-scraper service.

use std::time::Duration;

use async_trait::async_trait;
use elig_core::{
    normalize_benefits, ErrorCategory, PatientIdentity, ResultSource, SourceError, Trigger,
    VerificationResult,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::VerificationSource;

/// Connection settings for an [`HttpSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    pub name: String,
    /// Base URL; requests go to `{base_url}/v1/eligibility`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Tag applied to results that arrive without `_source`.
    pub tag: ResultSource,
}

impl HttpSourceConfig {
    pub fn new(name: &str, base_url: &str, tag: ResultSource) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout_secs: 30,
            tag,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Read `{prefix}_URL`, `{prefix}_API_KEY` and `{prefix}_TIMEOUT_SECS`.
    ///
    /// A missing URL is a configuration failure, not a default.
    pub fn from_env(
        prefix: &str,
        name: &str,
        tag: ResultSource,
    ) -> std::result::Result<Self, SourceError> {
        let url = std::env::var(format!("{prefix}_URL")).map_err(|_| {
            SourceError::new(
                ErrorCategory::Configuration,
                format!("{prefix}_URL is not configured"),
            )
        })?;
        let mut config = Self::new(name, &url, tag);
        config.api_key = std::env::var(format!("{prefix}_API_KEY")).ok();
        if let Some(secs) = std::env::var(format!("{prefix}_TIMEOUT_SECS"))
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.timeout_secs = secs;
        }
        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct EligibilityRequest<'a> {
    patient: &'a PatientIdentity,
    trigger: Trigger,
}

/// Calls a remote eligibility service with a JSON POST.
pub struct HttpSource {
    config: HttpSourceConfig,
    http_client: reqwest::Client,
}

impl HttpSource {
    pub fn new(config: HttpSourceConfig) -> std::result::Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("elig-pipeline/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::new(ErrorCategory::Configuration, e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/eligibility", self.config.base_url)
    }
}

fn transport_error(err: reqwest::Error) -> SourceError {
    let category = if err.is_timeout() || err.is_connect() {
        ErrorCategory::SourceUnavailable
    } else if let Some(status) = err.status() {
        ErrorCategory::from_http_status(status.as_u16())
    } else {
        ErrorCategory::from_message(&err.to_string())
    };
    SourceError::new(category, err.to_string())
}

#[async_trait]
impl VerificationSource for HttpSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn request(
        &self,
        identity: &PatientIdentity,
        trigger: Trigger,
    ) -> std::result::Result<VerificationResult, SourceError> {
        let mut req = self.http_client.post(self.endpoint()).json(&EligibilityRequest {
            patient: identity,
            trigger,
        });
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(source = %self.config.name, status = status.as_u16(), "eligibility response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                format!("{} returned {}", self.config.name, status)
            } else {
                format!("{} returned {}: {}", self.config.name, status, body)
            };
            return Err(SourceError::new(
                ErrorCategory::from_http_status(status.as_u16()),
                message,
            ));
        }

        let result: VerificationResult = response.json().await.map_err(|e| {
            SourceError::new(
                ErrorCategory::Unknown,
                format!("{} sent an unreadable body: {e}", self.config.name),
            )
        })?;
        let mut result = normalize_benefits(result);
        if result.source.is_none() {
            result.source = Some(self.config.tag);
        }
        Ok(result)
    }
}
