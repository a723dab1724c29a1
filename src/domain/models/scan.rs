//! Scan request domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobId;
use crate::domain::errors::{DomainError, DomainResult};

/// How thoroughly evidence is collected for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl ScanDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quick" => Some(Self::Quick),
            "standard" => Some(Self::Standard),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScanDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller's request to run due diligence on one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub id: Uuid,
    pub company: String,
    pub domain: String,
    /// Thesis identifier; unknown ids score against the default thesis
    pub thesis: String,
    #[serde(default)]
    pub depth: ScanDepth,
    /// Higher values are processed first
    #[serde(default)]
    pub priority: Option<i32>,
    /// Defer evidence collection until this time
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl ScanRequest {
    pub fn new(company: impl Into<String>, domain: impl Into<String>, thesis: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company: company.into(),
            domain: domain.into(),
            thesis: thesis.into(),
            depth: ScanDepth::default(),
            priority: None,
            scheduled_at: None,
        }
    }

    pub fn with_depth(mut self, depth: ScanDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.company.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "company name cannot be empty".to_string(),
            ));
        }
        if self.domain.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "company domain cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Milliseconds until `scheduled_at`, or zero when unscheduled or already past.
    pub fn delay_ms(&self, now: DateTime<Utc>) -> u64 {
        self.scheduled_at
            .map(|at| (at - now).num_milliseconds())
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(0)
    }
}

/// Identifiers handed back after a scan request was queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSubmission {
    pub scan_request_id: Uuid,
    pub evidence_job_id: JobId,
    pub report_job_id: JobId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert!(ScanRequest::new("Acme", "acme.io", "buy-and-build").validate().is_ok());
        assert!(matches!(
            ScanRequest::new("  ", "acme.io", "buy-and-build").validate(),
            Err(DomainError::ValidationFailed(_))
        ));
        assert!(ScanRequest::new("Acme", "", "buy-and-build").validate().is_err());
    }

    #[test]
    fn test_delay_ms() {
        let now = Utc::now();
        let request = ScanRequest::new("Acme", "acme.io", "t");
        assert_eq!(request.delay_ms(now), 0);

        let later = request.clone().scheduled_at(now + Duration::seconds(30));
        assert_eq!(later.delay_ms(now), 30_000);

        let past = request.scheduled_at(now - Duration::seconds(30));
        assert_eq!(past.delay_ms(now), 0);
    }

    #[test]
    fn test_depth_defaults_to_standard() {
        let request: ScanRequest = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "company": "Acme",
            "domain": "acme.io",
            "thesis": "turnaround"
        }))
        .unwrap();
        assert_eq!(request.depth, ScanDepth::Standard);
        assert_eq!(request.priority, None);
    }
}
