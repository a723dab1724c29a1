//! `submit`, `status` and `metrics` commands.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::open_broker;
use crate::cli::output::{format_ratio, list_table, number_cell, output, CommandOutput};
use crate::domain::models::{
    Config, JobId, JobStatus, PipelineSubmission, QueueMetrics, ScanDepth, ScanRequest,
};
use crate::services::event_channel::JobEventChannel;
use crate::services::pipeline_orchestrator::PipelineOrchestrator;
use crate::services::thesis_registry::DEFAULT_THESIS_ID;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Company name
    #[arg(long)]
    pub company: String,

    /// Company web domain
    #[arg(long)]
    pub domain: String,

    /// Investment thesis id
    #[arg(long, default_value = DEFAULT_THESIS_ID)]
    pub thesis: String,

    /// Scan depth: quick, standard or deep
    #[arg(long, default_value = "standard", value_parser = parse_depth)]
    pub depth: ScanDepth,

    /// Higher values are processed first
    #[arg(long, allow_negative_numbers = true)]
    pub priority: Option<i32>,

    /// Defer evidence collection by this many milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

fn parse_depth(s: &str) -> Result<ScanDepth, String> {
    ScanDepth::from_str(s).ok_or_else(|| format!("unknown scan depth '{s}' (quick, standard, deep)"))
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job id returned by `submit`
    pub job_id: JobId,

    /// Queue alias (`evidence`, `report`) or full queue name
    #[arg(long, short)]
    pub queue: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitOutput {
    #[serde(flatten)]
    pub submission: PipelineSubmission,
    pub company: String,
    pub thesis: String,
}

impl CommandOutput for SubmitOutput {
    fn to_human(&self) -> String {
        format!(
            "Submitted scan for {} (thesis: {})\n  scan request: {}\n  evidence job: {}\n  report job:   {}",
            self.company,
            self.thesis,
            self.submission.scan_request_id,
            self.submission.evidence_job_id,
            self.submission.report_job_id,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub found: bool,
    pub job_id: JobId,
    pub queue: String,
    pub status: Option<JobStatus>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let Some(status) = &self.status else {
            return format!("Job {} not found in queue {}", self.job_id, self.queue);
        };

        let mut lines = vec![
            format!("Job {}", status.id),
            format!("  queue:     {}", status.queue),
            format!("  state:     {}", status.state),
            format!("  progress:  {}", format_ratio(status.progress / 100.0)),
            format!("  attempts:  {}/{}", status.attempts_made, status.max_attempts),
            format!("  created:   {}", status.created_at.to_rfc3339()),
        ];
        if let Some(finished) = status.finished_at {
            lines.push(format!("  finished:  {}", finished.to_rfc3339()));
        }
        if let Some(reason) = &status.failed_reason {
            lines.push(format!("  failure:   {reason}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsOutput {
    pub queues: BTreeMap<String, QueueMetrics>,
}

impl CommandOutput for MetricsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["queue", "waiting", "active", "delayed", "completed", "failed", "total"]);
        for (name, m) in &self.queues {
            table.add_row(vec![
                Cell::new(name),
                number_cell(m.waiting),
                number_cell(m.active),
                number_cell(m.delayed),
                number_cell(m.completed),
                number_cell(m.failed),
                number_cell(m.total),
            ]);
        }
        table.to_string()
    }
}

async fn orchestrator(config: &Config) -> Result<PipelineOrchestrator> {
    let broker = open_broker(config).await?;
    Ok(PipelineOrchestrator::new(
        broker,
        Arc::new(JobEventChannel::new(&config.events)),
        config.queues.clone(),
    ))
}

pub async fn submit(args: SubmitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut request = ScanRequest::new(args.company, args.domain, args.thesis).with_depth(args.depth);
    if let Some(priority) = args.priority {
        request = request.with_priority(priority);
    }
    if let Some(delay_ms) = args.delay_ms.filter(|ms| *ms > 0) {
        let at = i64::try_from(delay_ms)
            .ok()
            .and_then(|ms| Utc::now().checked_add_signed(Duration::milliseconds(ms)))
            .with_context(|| format!("Delay of {delay_ms} ms is out of range"))?;
        request = request.scheduled_at(at);
    }

    let orchestrator = orchestrator(config).await?;
    let submission = orchestrator
        .submit_pipeline(&request)
        .await
        .context("Failed to submit scan")?;

    output(
        &SubmitOutput {
            submission,
            company: request.company,
            thesis: request.thesis,
        },
        json_mode,
    );
    Ok(())
}

pub async fn status(args: StatusArgs, config: &Config, json_mode: bool) -> Result<()> {
    let orchestrator = orchestrator(config).await?;
    let queue = config.queues.resolve_name(&args.queue);
    let status = orchestrator
        .get_job_status(args.job_id, &queue)
        .await
        .context("Failed to load job status")?;

    output(
        &StatusOutput {
            found: status.is_some(),
            job_id: args.job_id,
            queue,
            status,
        },
        json_mode,
    );
    Ok(())
}

pub async fn metrics(config: &Config, json_mode: bool) -> Result<()> {
    let orchestrator = orchestrator(config).await?;
    let queues = orchestrator
        .get_queue_metrics()
        .await
        .context("Failed to load queue metrics")?;
    output(&MetricsOutput { queues }, json_mode);
    Ok(())
}
