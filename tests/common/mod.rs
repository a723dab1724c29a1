//! Common test utilities for integration tests
//!
//! Shared fixtures for building evidence and wiring pipelines.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use diligence::adapters::memory::{InMemoryEvidenceSource, InMemoryQueueBroker};
use diligence::adapters::sqlite::{create_migrated_test_pool, SqliteQueueBroker};
use diligence::domain::models::{Dimension, EvidenceItem, QueuesConfig};
use diligence::domain::ports::QueueBroker;
use diligence::services::{
    EvidenceCollectionHandler, JobEventChannel, JobWorker, PipelineOrchestrator, ReportJobHandler,
    ScoringEngine,
};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Fixed reference time so scoring results are reproducible
pub fn reference_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Evidence item with a fixed timestamp and the given self-reported confidence
pub fn evidence(id: &str, category: Dimension, content: &str, confidence: f64) -> EvidenceItem {
    EvidenceItem::new(id, category, content, reference_time()).with_confidence(confidence)
}

/// Same as [`evidence`], dated `days` before the reference time
pub fn aged_evidence(id: &str, category: Dimension, content: &str, days: i64) -> EvidenceItem {
    EvidenceItem::new(id, category, content, reference_time() - Duration::days(days))
        .with_confidence(0.8)
}

/// Orchestrator and workers sharing one broker and event channel
pub struct Pipeline {
    pub broker: Arc<dyn QueueBroker>,
    pub events: Arc<JobEventChannel>,
    pub evidence: Arc<InMemoryEvidenceSource>,
    pub orchestrator: PipelineOrchestrator,
    pub evidence_worker: JobWorker,
    pub report_worker: JobWorker,
}

impl Pipeline {
    pub fn new(broker: Arc<dyn QueueBroker>, queues: QueuesConfig) -> Self {
        let events = Arc::new(JobEventChannel::default());
        let evidence = Arc::new(InMemoryEvidenceSource::new());

        let evidence_worker = JobWorker::new(
            broker.clone(),
            events.clone(),
            queues.evidence.name.clone(),
            Arc::new(EvidenceCollectionHandler::new(evidence.clone())),
        );
        let report_worker = JobWorker::new(
            broker.clone(),
            events.clone(),
            queues.report.name.clone(),
            Arc::new(ReportJobHandler::new(
                broker.clone(),
                evidence.clone(),
                Arc::new(ScoringEngine::default()),
                queues.evidence.name.clone(),
            )),
        );

        Self {
            orchestrator: PipelineOrchestrator::new(broker.clone(), events.clone(), queues),
            broker,
            events,
            evidence,
            evidence_worker,
            report_worker,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryQueueBroker::new()), QueuesConfig::default())
    }

    pub async fn sqlite() -> Self {
        let pool = create_migrated_test_pool()
            .await
            .expect("Failed to create test database");
        Self::new(Arc::new(SqliteQueueBroker::new(pool)), QueuesConfig::default())
    }
}
