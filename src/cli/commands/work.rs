//! `diligence work` command.
//!
//! Runs one evidence worker and one report worker against the queue
//! database. Evidence is read from a local JSON file, which stands in for
//! the evidence store for every scan request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::{open_broker, read_evidence_file};
use crate::adapters::memory::InMemoryEvidenceSource;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{Config, JobId, JobState};
use crate::domain::ports::{EvidenceSource, QueueBroker};
use crate::services::event_channel::JobEventChannel;
use crate::services::job_worker::{JobWorker, ProcessOutcome, WorkerConfig};
use crate::services::report_handler::{EvidenceCollectionHandler, ReportJobHandler};
use crate::services::scoring::ScoringEngine;
use crate::services::thesis_registry::ThesisRegistry;

#[derive(Args, Debug)]
pub struct WorkArgs {
    /// JSON file holding an array of evidence items
    #[arg(long, short)]
    pub evidence: Option<PathBuf>,

    /// Process the jobs runnable now, then exit
    #[arg(long)]
    pub drain: bool,

    /// Milliseconds between polls of an empty queue
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ProcessedJob {
    pub queue: String,
    pub job_id: JobId,
    pub state: JobState,
}

#[derive(Debug, Serialize)]
pub struct WorkOutput {
    pub processed: Vec<ProcessedJob>,
}

impl CommandOutput for WorkOutput {
    fn to_human(&self) -> String {
        if self.processed.is_empty() {
            return "No runnable jobs.".to_string();
        }
        let mut table = list_table(&["queue", "job", "state"]);
        for job in &self.processed {
            table.add_row(vec![
                Cell::new(&job.queue),
                Cell::new(job.job_id),
                Cell::new(job.state),
            ]);
        }
        table.to_string()
    }
}

impl From<&ProcessOutcome> for ProcessedJob {
    fn from(outcome: &ProcessOutcome) -> Self {
        let job = outcome.job();
        Self {
            queue: job.queue.clone(),
            job_id: job.id,
            state: job.state,
        }
    }
}

pub async fn execute(args: WorkArgs, config: &Config, json_mode: bool) -> Result<()> {
    let broker: Arc<dyn QueueBroker> = open_broker(config).await?;
    let events = Arc::new(JobEventChannel::new(&config.events));

    let source = Arc::new(InMemoryEvidenceSource::new());
    if let Some(path) = &args.evidence {
        let items = read_evidence_file(path).await?;
        tracing::info!(items = items.len(), path = %path.display(), "loaded evidence");
        source.record_default(items).await;
    }
    let source: Arc<dyn EvidenceSource> = source;

    let registry =
        ThesisRegistry::with_definitions(&config.theses).context("Invalid thesis configuration")?;
    let engine = Arc::new(ScoringEngine::with_config(registry, &config.scoring));
    let worker_config = WorkerConfig {
        poll_interval: Duration::from_millis(args.poll_ms.max(1)),
    };

    let evidence_worker = Arc::new(
        JobWorker::new(
            broker.clone(),
            events.clone(),
            config.queues.evidence.name.clone(),
            Arc::new(EvidenceCollectionHandler::new(source.clone())),
        )
        .with_config(worker_config.clone()),
    );
    let report_worker = Arc::new(
        JobWorker::new(
            broker.clone(),
            events,
            config.queues.report.name.clone(),
            Arc::new(ReportJobHandler::new(
                broker,
                source,
                engine,
                config.queues.evidence.name.clone(),
            )),
        )
        .with_config(worker_config),
    );

    if args.drain {
        let now = Utc::now();
        let mut outcomes = evidence_worker.drain_at(now).await?;
        outcomes.extend(report_worker.drain_at(now).await?);
        let processed = outcomes.iter().map(ProcessedJob::from).collect();
        output(&WorkOutput { processed }, json_mode);
        return Ok(());
    }

    let handles = [evidence_worker.handle(), report_worker.handle()];
    let runners = [evidence_worker, report_worker].map(|worker| tokio::spawn(async move { worker.run().await }));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    for handle in &handles {
        handle.stop();
    }
    for runner in runners {
        runner.await.context("Worker task panicked")?;
    }
    Ok(())
}
