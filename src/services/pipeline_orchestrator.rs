//! Two-stage scan pipeline orchestrator.
//!
//! Every scan request becomes an evidence-collection job followed by a
//! report-generation job. The report job is held back by a fixed delay and,
//! when enabled, by a dependency on the evidence job. A failed evidence job
//! never cancels its report job.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    EvidencePayload, JobId, JobOptions, JobPayload, JobRecord, JobStatus, PipelineSubmission,
    QueueConfig, QueueMetrics, QueuesConfig, ReportPayload, ScanRequest,
};
use crate::domain::ports::QueueBroker;
use crate::services::event_channel::{JobEventChannel, JobListeners, Subscription};

/// Entry point for submitting scans and observing their jobs.
pub struct PipelineOrchestrator {
    broker: Arc<dyn QueueBroker>,
    events: Arc<JobEventChannel>,
    queues: QueuesConfig,
}

impl PipelineOrchestrator {
    pub fn new(broker: Arc<dyn QueueBroker>, events: Arc<JobEventChannel>, queues: QueuesConfig) -> Self {
        Self {
            broker,
            events,
            queues,
        }
    }

    pub fn queues(&self) -> &QueuesConfig {
        &self.queues
    }

    pub fn events(&self) -> &Arc<JobEventChannel> {
        &self.events
    }

    /// Enqueue the evidence and report jobs for a scan request.
    #[instrument(skip(self, request), fields(scan_request_id = %request.id, company = %request.company), err)]
    pub async fn submit_pipeline(&self, request: &ScanRequest) -> DomainResult<PipelineSubmission> {
        request.validate()?;
        let now = Utc::now();
        let priority = request.priority.unwrap_or(0);
        let evidence_delay_ms = request.delay_ms(now);

        let evidence_job = JobRecord::new(
            self.queues.evidence.name.clone(),
            JobPayload::EvidenceCollection(EvidencePayload {
                scan_request_id: request.id,
                company: request.company.clone(),
                domain: request.domain.clone(),
                thesis: request.thesis.clone(),
                depth: request.depth,
            }),
            job_options(&self.queues.evidence, priority, evidence_delay_ms),
            now,
        )?;

        let mut report_options = job_options(
            &self.queues.report,
            priority,
            evidence_delay_ms.saturating_add(self.queues.report_min_delay_ms),
        );
        if self.queues.enforce_dependency {
            report_options.depends_on = Some(evidence_job.job_ref());
        }

        // A rejected delay must leave neither job enqueued.
        let report_job = JobRecord::new(
            self.queues.report.name.clone(),
            JobPayload::ReportGeneration(ReportPayload {
                scan_request_id: request.id,
                company: request.company.clone(),
                domain: request.domain.clone(),
                thesis: request.thesis.clone(),
                evidence_job_id: evidence_job.id,
            }),
            report_options,
            now,
        )?;

        let evidence_job = self.broker.add(evidence_job).await?;
        let report_job = self.broker.add(report_job).await?;

        tracing::info!(
            evidence_job_id = %evidence_job.id,
            report_job_id = %report_job.id,
            evidence_delay_ms,
            "scan pipeline submitted"
        );

        Ok(PipelineSubmission {
            scan_request_id: request.id,
            evidence_job_id: evidence_job.id,
            report_job_id: report_job.id,
        })
    }

    /// Status of a job; `queue` may be an alias (`evidence`, `report`).
    pub async fn get_job_status(&self, job_id: JobId, queue: &str) -> DomainResult<Option<JobStatus>> {
        let queue = self.queues.resolve_name(queue);
        Ok(self
            .broker
            .get(&queue, job_id)
            .await?
            .as_ref()
            .map(JobStatus::from))
    }

    /// Job counts per state for both pipeline queues, keyed by queue name.
    pub async fn get_queue_metrics(&self) -> DomainResult<BTreeMap<String, QueueMetrics>> {
        let (evidence, report) = futures::try_join!(
            self.broker.counts(&self.queues.evidence.name),
            self.broker.counts(&self.queues.report.name),
        )?;

        let mut metrics = BTreeMap::new();
        metrics.insert(self.queues.evidence.name.clone(), evidence);
        metrics.insert(self.queues.report.name.clone(), report);
        Ok(metrics)
    }

    /// Watch progress, completion and failure of one job.
    pub fn subscribe(&self, job_id: JobId, queue: &str, listeners: JobListeners) -> Subscription {
        let queue = self.queues.resolve_name(queue);
        self.events.subscribe(job_id, &queue, listeners)
    }
}

fn job_options(queue: &QueueConfig, priority: i32, delay_ms: u64) -> JobOptions {
    JobOptions {
        priority,
        delay_ms,
        attempts: queue.attempts,
        backoff: queue.backoff,
        remove_on_complete: queue.remove_on_complete,
        remove_on_fail: queue.remove_on_fail,
        depends_on: None,
    }
}
