//! Job worker runtime.
//!
//! A worker claims jobs from one queue, runs a [`JobHandler`] on each and
//! records the outcome in the broker. Progress, completion and terminal
//! failure are also published on the [`JobEventChannel`]; a failed attempt
//! that will be retried publishes nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::Instrument;

use crate::domain::errors::{DomainError, DomainResult, JobError};
use crate::domain::models::{FailureOutcome, JobId, JobRecord};
use crate::domain::ports::QueueBroker;
use crate::services::event_channel::{JobEventChannel, JobEventKind};

/// Work performed for each job of a queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run the job and return the value stored as its result.
    async fn handle(
        &self,
        job: &JobRecord,
        progress: &ProgressReporter,
    ) -> Result<serde_json::Value, JobError>;
}

/// Lets a handler report progress of the job it is running.
pub struct ProgressReporter {
    broker: Arc<dyn QueueBroker>,
    events: Arc<JobEventChannel>,
    queue: String,
    job_id: JobId,
}

impl ProgressReporter {
    /// Record progress in percent; values outside 0-100 are clamped.
    pub async fn report(&self, progress: f64) -> DomainResult<()> {
        let job = self
            .broker
            .update_progress(&self.queue, self.job_id, progress)
            .await?;
        self.events
            .publish(self.job_id, &self.queue, JobEventKind::Progress(job.progress));
        Ok(())
    }
}

/// Outcome of processing one job.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed(JobRecord),
    Retrying(JobRecord),
    Failed(JobRecord),
}

impl ProcessOutcome {
    pub fn job(&self) -> &JobRecord {
        match self {
            Self::Completed(job) | Self::Retrying(job) | Self::Failed(job) => job,
        }
    }
}

/// Worker loop configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to wait before polling an empty queue again
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Handle to stop a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    stop_flag: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Ask the worker to stop after its current job.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }
}

/// Processes jobs of one queue with one handler.
pub struct JobWorker {
    broker: Arc<dyn QueueBroker>,
    events: Arc<JobEventChannel>,
    queue: String,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    stop_flag: Arc<AtomicBool>,
}

impl JobWorker {
    pub fn new(
        broker: Arc<dyn QueueBroker>,
        events: Arc<JobEventChannel>,
        queue: impl Into<String>,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        Self {
            broker,
            events,
            queue: queue.into(),
            handler,
            config: WorkerConfig::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            stop_flag: self.stop_flag.clone(),
        }
    }

    /// Claim and process one job that is runnable now.
    pub async fn process_next(&self) -> DomainResult<Option<ProcessOutcome>> {
        self.process_next_at(Utc::now()).await
    }

    /// Claim and process one job that is runnable at `now`.
    ///
    /// Returns `Ok(None)` when nothing is runnable. Handler errors are
    /// recorded on the job, not returned; only broker errors are.
    pub async fn process_next_at(&self, now: DateTime<Utc>) -> DomainResult<Option<ProcessOutcome>> {
        let Some(job) = self.broker.claim_next(&self.queue, now).await? else {
            return Ok(None);
        };

        let span = tracing::info_span!(
            "job",
            queue = %self.queue,
            job_id = %job.id,
            kind = job.payload.kind(),
            attempt = job.attempts_made + 1,
        );
        self.run_job(job).instrument(span).await.map(Some)
    }

    /// Process jobs until none is runnable at `now`.
    pub async fn drain_at(&self, now: DateTime<Utc>) -> DomainResult<Vec<ProcessOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.process_next_at(now).await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Poll the queue until stopped through a [`WorkerHandle`].
    pub async fn run(&self) {
        tracing::info!(queue = %self.queue, "worker started");
        let mut ticker = interval(self.config.poll_interval);

        while !self.stop_flag.load(Ordering::Acquire) {
            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => tracing::warn!(queue = %self.queue, error = %e, "failed to process job"),
            }
            ticker.tick().await;
        }

        tracing::info!(queue = %self.queue, "worker stopped");
    }

    async fn run_job(&self, job: JobRecord) -> DomainResult<ProcessOutcome> {
        let reporter = ProgressReporter {
            broker: self.broker.clone(),
            events: self.events.clone(),
            queue: self.queue.clone(),
            job_id: job.id,
        };

        match self.handler.handle(&job, &reporter).await {
            Ok(value) => {
                let done = match self.broker.complete(&self.queue, job.id, value.clone()).await {
                    Ok(done) => done,
                    Err(err) => {
                        self.release_unrecorded(job.id, &err).await;
                        return Err(err);
                    }
                };
                self.events
                    .publish(job.id, &self.queue, JobEventKind::Completed(value));
                tracing::info!("job completed");
                Ok(ProcessOutcome::Completed(done))
            }
            Err(err) => {
                let (failed, outcome) = self
                    .broker
                    .fail(&self.queue, job.id, err.reason(), err.is_retryable())
                    .await
                    .inspect_err(|e| {
                        tracing::error!(
                            job_id = %job.id,
                            error = %e,
                            handler_error = %err,
                            "could not record job failure, job left active"
                        );
                    })?;
                match outcome {
                    FailureOutcome::Retrying { attempt, delay } => {
                        tracing::warn!(
                            error = %err,
                            next_attempt = attempt,
                            delay_ms = delay.num_milliseconds(),
                            "job attempt failed, retrying"
                        );
                        Ok(ProcessOutcome::Retrying(failed))
                    }
                    FailureOutcome::Failed { attempts_made } => {
                        self.events.publish(
                            job.id,
                            &self.queue,
                            JobEventKind::Failed(err.reason().to_string()),
                        );
                        tracing::error!(error = %err, attempts_made, "job failed");
                        Ok(ProcessOutcome::Failed(failed))
                    }
                }
            }
        }
    }

    /// The handler finished but its result could not be stored: count the
    /// attempt as a transient failure so the job leaves the `active` state.
    async fn release_unrecorded(&self, job_id: JobId, cause: &DomainError) {
        let reason = format!("failed to record completion: {cause}");
        match self.broker.fail(&self.queue, job_id, &reason, true).await {
            Ok((job, outcome)) => {
                if matches!(outcome, FailureOutcome::Failed { .. }) {
                    self.events.publish(job_id, &self.queue, JobEventKind::Failed(reason));
                }
                tracing::warn!(
                    %job_id,
                    state = %job.state,
                    error = %cause,
                    "job completion not recorded, attempt counted as failed"
                );
            }
            Err(e) => tracing::error!(
                %job_id,
                error = %cause,
                release_error = %e,
                "job completion not recorded, job left active"
            ),
        }
    }
}
