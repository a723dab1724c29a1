//! Durability of the SQLite broker across connections.

mod common;

use std::sync::Arc;

use chrono::Utc;
use diligence::adapters::sqlite::{initialize_database, SqliteQueueBroker};
use diligence::domain::models::{JobState, QueuesConfig, ScanRequest};
use diligence::domain::ports::QueueBroker;
use diligence::services::{JobEventChannel, PipelineOrchestrator};

async fn open(url: &str) -> Arc<SqliteQueueBroker> {
    let pool = initialize_database(url, None).await.unwrap();
    Arc::new(SqliteQueueBroker::new(pool))
}

#[tokio::test]
async fn test_jobs_survive_reopening_database() {
    let dir = common::temp_dir();
    let url = format!("sqlite:{}", dir.path().join("queue.db").display());

    let submission = {
        let broker = open(&url).await;
        let orchestrator = PipelineOrchestrator::new(
            broker,
            Arc::new(JobEventChannel::default()),
            QueuesConfig::default(),
        );
        orchestrator
            .submit_pipeline(&ScanRequest::new("Acme", "acme.io", "buy-and-build").with_priority(2))
            .await
            .unwrap()
    };

    let broker = open(&url).await;
    let evidence = broker
        .get("evidence-collection", submission.evidence_job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(evidence.state, JobState::Waiting);
    assert_eq!(evidence.options.priority, 2);

    let report = broker
        .get("report-generation", submission.report_job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        report.options.depends_on.map(|parent| parent.id),
        Some(submission.evidence_job_id)
    );

    let claimed = broker
        .claim_next("evidence-collection", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.id, submission.evidence_job_id);
    assert_eq!(claimed.state, JobState::Active);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let dir = common::temp_dir();
    let url = format!("sqlite:{}", dir.path().join("queue.db").display());
    open(&url).await;
    let broker = open(&url).await;
    let metrics = broker.counts("evidence-collection").await.unwrap();
    assert_eq!(metrics.total, 0);
}
