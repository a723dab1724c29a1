use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{FailureOutcome, JobId, JobRecord, QueueMetrics};

/// Port for durable named job queues
///
/// A broker stores [`JobRecord`]s per queue and applies the lifecycle
/// transitions defined on the record itself. Implementations decide only how
/// jobs are stored and how claims are made atomic.
///
/// # Examples
///
/// ```no_run
/// use diligence::domain::ports::QueueBroker;
/// use diligence::domain::DomainResult;
/// use chrono::Utc;
///
/// async fn drain_one(broker: &dyn QueueBroker) -> DomainResult<()> {
///     if let Some(job) = broker.claim_next("evidence-collection", Utc::now()).await? {
///         broker.update_progress(&job.queue, job.id, 50.0).await?;
///         broker.complete(&job.queue, job.id, serde_json::json!({"ok": true})).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait QueueBroker: Send + Sync {
    /// Store a new job
    ///
    /// Returns the stored record with its broker-assigned sequence number.
    async fn add(&self, job: JobRecord) -> DomainResult<JobRecord>;

    /// Get a job by queue and id
    ///
    /// Returns `Ok(None)` when the job never existed or was purged by retention.
    async fn get(&self, queue: &str, id: JobId) -> DomainResult<Option<JobRecord>>;

    /// Count jobs per state in a queue
    async fn counts(&self, queue: &str) -> DomainResult<QueueMetrics>;

    /// Claim the next runnable job
    ///
    /// Delayed jobs due at `now` are promoted first. The highest-priority
    /// waiting job whose dependency has finished is marked active and
    /// returned; ties go to the oldest job.
    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> DomainResult<Option<JobRecord>>;

    /// Record progress of an active job
    async fn update_progress(&self, queue: &str, id: JobId, progress: f64) -> DomainResult<JobRecord>;

    /// Mark an active job completed and apply its completion retention
    async fn complete(
        &self,
        queue: &str,
        id: JobId,
        return_value: serde_json::Value,
    ) -> DomainResult<JobRecord>;

    /// Record a failed attempt
    ///
    /// The job is re-delayed under its backoff policy while attempts remain
    /// and `retryable` is set; otherwise it fails for good and the failure
    /// retention applies.
    async fn fail(
        &self,
        queue: &str,
        id: JobId,
        reason: &str,
        retryable: bool,
    ) -> DomainResult<(JobRecord, FailureOutcome)>;
}
