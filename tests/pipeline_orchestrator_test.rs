//! End-to-end pipeline tests over both queue brokers.

mod common;

use std::time::Duration;

use chrono::Utc;
use common::{evidence, Pipeline};
use diligence::domain::models::{Dimension, JobState, ScanRequest};
use diligence::services::{JobListeners, ScanReport};
use tokio::sync::mpsc;

#[derive(Debug, PartialEq)]
enum Seen {
    Progress(f64),
    Completed,
    Failed(String),
}

fn recording_listeners() -> (JobListeners, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (tx_c, tx_f) = (tx.clone(), tx.clone());
    let listeners = JobListeners::new()
        .on_progress(move |p| {
            let _ = tx.send(Seen::Progress(p));
        })
        .on_completed(move |_| {
            let _ = tx_c.send(Seen::Completed);
        })
        .on_failed(move |reason| {
            let _ = tx_f.send(Seen::Failed(reason));
        });
    (listeners, rx)
}

async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Option<Seen> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

async fn check_metrics_after_submissions(pipeline: Pipeline) {
    const N: u64 = 4;
    for i in 0..N {
        pipeline
            .orchestrator
            .submit_pipeline(&ScanRequest::new(format!("Company {i}"), format!("c{i}.io"), "turnaround"))
            .await
            .unwrap();
    }

    let metrics = pipeline.orchestrator.get_queue_metrics().await.unwrap();
    let evidence = metrics["evidence-collection"];
    let report = metrics["report-generation"];

    assert_eq!(evidence.waiting, N);
    assert_eq!(report.delayed, N);
    for m in [evidence, report] {
        assert_eq!(m.active, 0);
        assert_eq!(m.completed, 0);
        assert_eq!(m.failed, 0);
        assert_eq!(m.total, N);
    }
}

#[tokio::test]
async fn test_metrics_after_submissions_in_memory() {
    check_metrics_after_submissions(Pipeline::in_memory()).await;
}

#[tokio::test]
async fn test_metrics_after_submissions_sqlite() {
    check_metrics_after_submissions(Pipeline::sqlite().await).await;
}

async fn check_full_pipeline(pipeline: Pipeline) {
    let request = ScanRequest::new("Acme", "acme.io", "digital-transformation");
    pipeline
        .evidence
        .record(
            request.id,
            vec![
                evidence("t1", Dimension::Technical, "Robust scalable platform with public API", 0.9),
                evidence("f1", Dimension::Financial, "Profitable since Series A funding", 0.7),
            ],
        )
        .await;

    let submission = pipeline.orchestrator.submit_pipeline(&request).await.unwrap();
    let (listeners, mut seen) = recording_listeners();
    let subscription = pipeline
        .orchestrator
        .subscribe(submission.report_job_id, "report", listeners);

    // Evidence is unfinished: the report job stays held even past its delay.
    let later = Utc::now() + chrono::Duration::seconds(30);
    assert!(pipeline.report_worker.process_next_at(later).await.unwrap().is_none());

    pipeline.evidence_worker.process_next_at(later).await.unwrap().unwrap();
    let outcome = pipeline.report_worker.process_next_at(later).await.unwrap().unwrap();
    assert_eq!(outcome.job().id, submission.report_job_id);
    assert_eq!(outcome.job().state, JobState::Completed);

    let report: ScanReport = serde_json::from_value(outcome.job().return_value.clone().unwrap()).unwrap();
    assert_eq!(report.evidence_count, 2);
    assert_eq!(report.evidence_job_state, Some(JobState::Completed));
    assert_eq!(report.score.thesis_id, "digital-transformation");

    assert_eq!(next_seen(&mut seen).await, Some(Seen::Progress(10.0)));
    assert_eq!(next_seen(&mut seen).await, Some(Seen::Progress(50.0)));
    assert_eq!(next_seen(&mut seen).await, Some(Seen::Progress(100.0)));
    assert_eq!(next_seen(&mut seen).await, Some(Seen::Completed));
    subscription.unsubscribe();

    let status = pipeline
        .orchestrator
        .get_job_status(submission.report_job_id, "report")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.progress, 100.0);
    assert_eq!(status.attempts_made, 0);
}

#[tokio::test]
async fn test_full_pipeline_in_memory() {
    check_full_pipeline(Pipeline::in_memory()).await;
}

#[tokio::test]
async fn test_full_pipeline_sqlite() {
    check_full_pipeline(Pipeline::sqlite().await).await;
}

async fn check_failed_evidence_still_reports(pipeline: Pipeline) {
    let request = ScanRequest::new("Globex", "globex.com", "margin-expansion");
    let submission = pipeline.orchestrator.submit_pipeline(&request).await.unwrap();

    let (listeners, mut seen) = recording_listeners();
    let _subscription = pipeline
        .orchestrator
        .subscribe(submission.evidence_job_id, "evidence", listeners);

    let queue = pipeline.orchestrator.queues().evidence.name.clone();
    let attempts = pipeline.orchestrator.queues().evidence.attempts;
    let mut at = Utc::now();
    for attempt in 1..=attempts {
        let job = pipeline.broker.claim_next(&queue, at).await.unwrap().unwrap();
        let (failed, _) = pipeline
            .broker
            .fail(&queue, job.id, "crawler timeout", true)
            .await
            .unwrap();
        assert_eq!(failed.attempts_made, attempt);
        at = failed.ready_at;
    }

    let status = pipeline
        .orchestrator
        .get_job_status(submission.evidence_job_id, "evidence")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.failed_reason.as_deref(), Some("crawler timeout"));

    // Failures recorded directly through the broker publish nothing.
    assert!(tokio::time::timeout(Duration::from_millis(50), seen.recv()).await.is_err());

    let later = Utc::now() + chrono::Duration::seconds(30);
    let outcome = pipeline.report_worker.process_next_at(later).await.unwrap().unwrap();
    let report: ScanReport = serde_json::from_value(outcome.job().return_value.clone().unwrap()).unwrap();
    assert!(report.is_partial());
    assert_eq!(report.evidence_job_state, Some(JobState::Failed));
}

#[tokio::test]
async fn test_failed_evidence_still_reports_in_memory() {
    check_failed_evidence_still_reports(Pipeline::in_memory()).await;
}

#[tokio::test]
async fn test_failed_evidence_still_reports_sqlite() {
    check_failed_evidence_still_reports(Pipeline::sqlite().await).await;
}

#[tokio::test]
async fn test_subscription_sees_only_its_job() {
    let pipeline = Pipeline::in_memory();
    let first = pipeline
        .orchestrator
        .submit_pipeline(&ScanRequest::new("A", "a.io", "turnaround"))
        .await
        .unwrap();
    let second = pipeline
        .orchestrator
        .submit_pipeline(&ScanRequest::new("B", "b.io", "turnaround"))
        .await
        .unwrap();

    let (listeners, mut seen) = recording_listeners();
    let subscription = pipeline
        .orchestrator
        .subscribe(second.evidence_job_id, "evidence", listeners);

    let first_outcome = pipeline.evidence_worker.process_next().await.unwrap().unwrap();
    assert_eq!(first_outcome.job().id, first.evidence_job_id);
    let second_outcome = pipeline.evidence_worker.process_next().await.unwrap().unwrap();
    assert_eq!(second_outcome.job().id, second.evidence_job_id);

    assert_eq!(next_seen(&mut seen).await, Some(Seen::Progress(100.0)));
    assert_eq!(next_seen(&mut seen).await, Some(Seen::Completed));
    assert!(next_seen(&mut seen).await.is_none());
    assert_eq!(subscription.job_id(), second.evidence_job_id);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let pipeline = Pipeline::in_memory();
    let submission = pipeline
        .orchestrator
        .submit_pipeline(&ScanRequest::new("A", "a.io", "turnaround"))
        .await
        .unwrap();

    let (listeners, mut seen) = recording_listeners();
    let subscription = pipeline
        .orchestrator
        .subscribe(submission.evidence_job_id, "evidence", listeners);
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(!subscription.is_active());

    pipeline.evidence_worker.process_next().await.unwrap().unwrap();
    assert!(next_seen(&mut seen).await.is_none());
}

#[tokio::test]
async fn test_priority_orders_evidence_jobs() {
    let pipeline = Pipeline::in_memory();
    let low = pipeline
        .orchestrator
        .submit_pipeline(&ScanRequest::new("Low", "low.io", "turnaround"))
        .await
        .unwrap();
    let high = pipeline
        .orchestrator
        .submit_pipeline(&ScanRequest::new("High", "high.io", "turnaround").with_priority(10))
        .await
        .unwrap();

    let outcomes = pipeline.evidence_worker.drain_at(Utc::now()).await.unwrap();
    let order: Vec<_> = outcomes.iter().map(|o| o.job().id).collect();
    assert_eq!(order, vec![high.evidence_job_id, low.evidence_job_id]);
}
