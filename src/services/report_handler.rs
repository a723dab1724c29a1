//! Handlers for the two pipeline queues.
//!
//! [`ReportJobHandler`] scores whatever evidence exists for a scan request.
//! It never refuses to run because the evidence job failed or has not
//! finished; it logs a partial-data warning and scores what is there.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job_worker::{JobHandler, ProgressReporter};
use super::scoring::ScoringEngine;
use crate::domain::errors::JobError;
use crate::domain::models::{ComprehensiveScoreResult, JobPayload, JobRecord, JobState};
use crate::domain::ports::{EvidenceSource, QueueBroker};

/// Result of a report job, stored as the job's return value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_request_id: Uuid,
    pub company: String,
    pub domain: String,
    /// Thesis as requested; the score names the thesis actually applied
    pub requested_thesis: String,
    pub evidence_count: usize,
    /// State of the evidence job when the report ran; `None` once purged
    pub evidence_job_state: Option<JobState>,
    pub score: ComprehensiveScoreResult,
    pub generated_at: DateTime<Utc>,
}

impl ScanReport {
    /// Whether the evidence job had not completed when the report ran.
    pub fn is_partial(&self) -> bool {
        self.evidence_job_state != Some(JobState::Completed)
    }
}

/// Scores collected evidence for report-generation jobs.
pub struct ReportJobHandler {
    broker: Arc<dyn QueueBroker>,
    evidence: Arc<dyn EvidenceSource>,
    engine: Arc<ScoringEngine>,
    evidence_queue: String,
}

impl ReportJobHandler {
    pub fn new(
        broker: Arc<dyn QueueBroker>,
        evidence: Arc<dyn EvidenceSource>,
        engine: Arc<ScoringEngine>,
        evidence_queue: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            evidence,
            engine,
            evidence_queue: evidence_queue.into(),
        }
    }
}

#[async_trait]
impl JobHandler for ReportJobHandler {
    async fn handle(
        &self,
        job: &JobRecord,
        progress: &ProgressReporter,
    ) -> Result<serde_json::Value, JobError> {
        let JobPayload::ReportGeneration(payload) = &job.payload else {
            return Err(JobError::Unrecoverable(format!(
                "expected a report_generation payload, got {}",
                job.payload.kind()
            )));
        };

        let evidence_job_state = self
            .broker
            .get(&self.evidence_queue, payload.evidence_job_id)
            .await?
            .map(|evidence_job| evidence_job.state);

        match evidence_job_state {
            Some(JobState::Completed) => {}
            Some(JobState::Failed) => tracing::warn!(
                evidence_job_id = %payload.evidence_job_id,
                "evidence collection failed, scoring partial data"
            ),
            Some(state) => tracing::warn!(
                evidence_job_id = %payload.evidence_job_id,
                %state,
                "evidence collection unfinished, scoring partial data"
            ),
            None => tracing::debug!(
                evidence_job_id = %payload.evidence_job_id,
                "evidence job no longer retained"
            ),
        }
        progress.report(10.0).await?;

        let evidence = self.evidence.evidence_for(payload.scan_request_id).await?;
        progress.report(50.0).await?;

        let score = self.engine.score_as_of(&evidence, &payload.thesis, Utc::now());
        tracing::info!(
            company = %payload.company,
            thesis = %score.thesis_id,
            evidence = evidence.len(),
            weighted_score = score.weighted_score,
            grade = %score.final_grade,
            "report generated"
        );

        let report = ScanReport {
            scan_request_id: payload.scan_request_id,
            company: payload.company.clone(),
            domain: payload.domain.clone(),
            requested_thesis: payload.thesis.clone(),
            evidence_count: evidence.len(),
            evidence_job_state,
            score,
            generated_at: Utc::now(),
        };
        progress.report(100.0).await?;

        serde_json::to_value(&report).map_err(|e| JobError::Unrecoverable(e.to_string()))
    }
}

/// Evidence-collection handler that reads from an [`EvidenceSource`].
///
/// Used where collection happens elsewhere and the queue only tracks it:
/// the job completes with the number of items available for the scan.
pub struct EvidenceCollectionHandler {
    evidence: Arc<dyn EvidenceSource>,
}

impl EvidenceCollectionHandler {
    pub fn new(evidence: Arc<dyn EvidenceSource>) -> Self {
        Self { evidence }
    }
}

#[async_trait]
impl JobHandler for EvidenceCollectionHandler {
    async fn handle(
        &self,
        job: &JobRecord,
        progress: &ProgressReporter,
    ) -> Result<serde_json::Value, JobError> {
        let JobPayload::EvidenceCollection(payload) = &job.payload else {
            return Err(JobError::Unrecoverable(format!(
                "expected an evidence_collection payload, got {}",
                job.payload.kind()
            )));
        };

        let items = self.evidence.evidence_for(payload.scan_request_id).await?;
        progress.report(100.0).await?;
        tracing::info!(
            company = %payload.company,
            depth = %payload.depth,
            items = items.len(),
            "evidence collected"
        );

        Ok(serde_json::json!({
            "scan_request_id": payload.scan_request_id,
            "evidence_count": items.len(),
        }))
    }
}
