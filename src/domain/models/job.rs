//! Job domain model.
//!
//! Jobs are units of asynchronous work held in named queues. The lifecycle
//! state machine lives here so every broker implementation applies the same
//! transitions, retry backoff and retention rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scan::ScanDepth;
use crate::domain::errors::{DomainError, DomainResult};

/// Longest delay a job can be scheduled with, retry backoff included (30 days).
pub const MAX_DELAY_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Ready to be claimed by a worker
    Waiting,
    /// Claimed by a worker and running
    Active,
    /// Finished successfully
    Completed,
    /// Attempts exhausted or failed unrecoverably
    Failed,
    /// Waiting for its delay (initial or retry backoff) to elapse
    Delayed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "waiting" => Some(Self::Waiting),
            "active" => Some(Self::Active),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "delayed" => Some(Self::Delayed),
            _ => None,
        }
    }

    /// Completed and failed jobs never change state again.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry backoff strategy, serialized as `{"type": "exponential", "delay": 2000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// `delay × 2^(attempts_made − 1)` milliseconds
    Exponential { delay: u64 },
    /// Constant `delay` milliseconds
    Fixed { delay: u64 },
}

impl BackoffPolicy {
    /// Delay before the next attempt after `attempts_made` failed attempts,
    /// capped at [`MAX_DELAY_MS`].
    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        let millis = match *self {
            Self::Exponential { delay } => {
                let exponent = attempts_made.saturating_sub(1).min(32);
                delay.saturating_mul(1_u64 << exponent)
            }
            Self::Fixed { delay } => delay,
        };
        millis_to_duration(millis.min(MAX_DELAY_MS))
    }

    pub fn base_delay_ms(&self) -> u64 {
        match *self {
            Self::Exponential { delay } | Self::Fixed { delay } => delay,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential { delay: 1000 }
    }
}

/// Count and age caps for finished jobs kept in a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep at most this many finished jobs (newest first)
    #[serde(default)]
    pub count: Option<usize>,
    /// Drop finished jobs older than this many seconds
    #[serde(default)]
    pub age: Option<u64>,
}

impl RetentionPolicy {
    pub const fn keep_count(count: usize) -> Self {
        Self {
            count: Some(count),
            age: None,
        }
    }

    pub const fn keep(count: usize, age_secs: u64) -> Self {
        Self {
            count: Some(count),
            age: Some(age_secs),
        }
    }

    /// Select the finished jobs this policy evicts.
    ///
    /// `finished` holds `(id, finished_at)` pairs, most recently inserted
    /// first; jobs finishing at the same instant keep that order.
    pub fn expired(&self, finished: &[(JobId, DateTime<Utc>)], now: DateTime<Utc>) -> Vec<JobId> {
        let mut newest_first = finished.to_vec();
        newest_first.sort_by(|a, b| b.1.cmp(&a.1));

        let max_age = self
            .age
            .map(|secs| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));

        newest_first
            .into_iter()
            .enumerate()
            .filter(|(rank, (_, finished_at))| {
                let over_count = self.count.is_some_and(|count| *rank >= count);
                let too_old = max_age.is_some_and(|age| now - *finished_at > age);
                over_count || too_old
            })
            .map(|(_, (id, _))| id)
            .collect()
    }
}

/// Reference to a job in a specific queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRef {
    pub queue: String,
    pub id: JobId,
}

/// Options attached to a job at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Higher values are claimed first
    #[serde(default)]
    pub priority: i32,
    /// Initial delay before the job becomes claimable
    #[serde(default)]
    pub delay_ms: u64,
    /// Total attempts including the first run
    pub attempts: u32,
    pub backoff: BackoffPolicy,
    #[serde(default)]
    pub remove_on_complete: RetentionPolicy,
    #[serde(default)]
    pub remove_on_fail: RetentionPolicy,
    /// Job that must finish before this one can be claimed
    #[serde(default)]
    pub depends_on: Option<JobRef>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            delay_ms: 0,
            attempts: 1,
            backoff: BackoffPolicy::default(),
            remove_on_complete: RetentionPolicy::default(),
            remove_on_fail: RetentionPolicy::default(),
            depends_on: None,
        }
    }
}

/// Data carried by an evidence-collection job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePayload {
    pub scan_request_id: Uuid,
    pub company: String,
    pub domain: String,
    pub thesis: String,
    pub depth: ScanDepth,
}

/// Data carried by a report-generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub scan_request_id: Uuid,
    pub company: String,
    pub domain: String,
    pub thesis: String,
    pub evidence_job_id: JobId,
}

/// Job payload, tagged by the kind of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    EvidenceCollection(EvidencePayload),
    ReportGeneration(ReportPayload),
}

impl JobPayload {
    pub fn scan_request_id(&self) -> Uuid {
        match self {
            Self::EvidenceCollection(p) => p.scan_request_id,
            Self::ReportGeneration(p) => p.scan_request_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::EvidenceCollection(_) => "evidence_collection",
            Self::ReportGeneration(_) => "report_generation",
        }
    }
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Re-delayed for another attempt
    Retrying { attempt: u32, delay: Duration },
    /// No attempts left, or the failure was unrecoverable
    Failed { attempts_made: u32 },
}

/// A job as stored by a queue broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub queue: String,
    /// Insertion order within the broker, used for FIFO tie-breaking
    pub sequence: u64,
    pub state: JobState,
    pub payload: JobPayload,
    pub options: JobOptions,
    pub attempts_made: u32,
    /// Progress in percent (0-100)
    pub progress: f64,
    pub failed_reason: Option<String>,
    pub return_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Earliest time the job can be claimed
    pub ready_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a job; it starts `delayed` when the options carry a delay.
    ///
    /// Fails with `ValidationFailed` when the delay exceeds [`MAX_DELAY_MS`].
    pub fn new(
        queue: impl Into<String>,
        payload: JobPayload,
        options: JobOptions,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if options.delay_ms > MAX_DELAY_MS {
            return Err(DomainError::ValidationFailed(format!(
                "job delay of {} ms exceeds the maximum of {MAX_DELAY_MS} ms",
                options.delay_ms
            )));
        }
        let ready_at = now
            .checked_add_signed(millis_to_duration(options.delay_ms))
            .ok_or_else(|| DomainError::ValidationFailed("job delay is out of range".to_string()))?;
        let state = if options.delay_ms > 0 {
            JobState::Delayed
        } else {
            JobState::Waiting
        };

        Ok(Self {
            id: JobId::new(),
            queue: queue.into(),
            sequence: 0,
            state,
            payload,
            options,
            attempts_made: 0,
            progress: 0.0,
            failed_reason: None,
            return_value: None,
            created_at: now,
            ready_at,
            processed_at: None,
            finished_at: None,
        })
    }

    pub fn job_ref(&self) -> JobRef {
        JobRef {
            queue: self.queue.clone(),
            id: self.id,
        }
    }

    /// Move a delayed job to waiting once its delay elapsed.
    ///
    /// Returns `true` when the job was promoted.
    pub fn promote_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == JobState::Delayed && self.ready_at <= now {
            self.state = JobState::Waiting;
            true
        } else {
            false
        }
    }

    /// Claim the job for a worker.
    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_state(JobState::Waiting, JobState::Active, "only waiting jobs can be claimed")?;
        self.state = JobState::Active;
        self.processed_at = Some(now);
        Ok(())
    }

    /// Record worker progress, clamped to 0-100.
    pub fn set_progress(&mut self, progress: f64) -> DomainResult<()> {
        self.ensure_state(JobState::Active, JobState::Active, "progress is reported by the running worker")?;
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 100.0)
        } else {
            self.progress
        };
        Ok(())
    }

    pub fn complete(&mut self, return_value: serde_json::Value, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_state(JobState::Active, JobState::Completed, "only active jobs can complete")?;
        self.state = JobState::Completed;
        self.progress = 100.0;
        self.return_value = Some(return_value);
        self.finished_at = Some(now);
        Ok(())
    }

    /// Record a failed attempt and decide between retrying and failing for good.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        retryable: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<FailureOutcome> {
        self.ensure_state(JobState::Active, JobState::Failed, "only active jobs can fail")?;
        self.attempts_made += 1;
        self.failed_reason = Some(reason.into());

        if retryable && self.attempts_made < self.options.attempts {
            let delay = self.options.backoff.delay_for(self.attempts_made);
            self.state = JobState::Delayed;
            self.ready_at = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
            return Ok(FailureOutcome::Retrying {
                attempt: self.attempts_made + 1,
                delay,
            });
        }

        self.state = JobState::Failed;
        self.finished_at = Some(now);
        Ok(FailureOutcome::Failed {
            attempts_made: self.attempts_made,
        })
    }

    /// Retention policy that applies to this job once finished.
    pub fn retention(&self) -> Option<RetentionPolicy> {
        match self.state {
            JobState::Completed => Some(self.options.remove_on_complete),
            JobState::Failed => Some(self.options.remove_on_fail),
            _ => None,
        }
    }

    fn ensure_state(&self, expected: JobState, to: JobState, reason: &str) -> DomainResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
                reason: reason.to_string(),
            })
        }
    }
}

fn millis_to_duration(millis: u64) -> Duration {
    Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// Whether a job's dependency allows it to be claimed.
///
/// A dependency that finished (either way) or was already purged no longer blocks.
pub fn dependency_satisfied(parent_state: Option<JobState>) -> bool {
    parent_state.is_none_or(|state| state.is_finished())
}

/// Status view of a job returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: JobId,
    pub queue: String,
    pub state: JobState,
    pub progress: f64,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub failed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&JobRecord> for JobStatus {
    fn from(job: &JobRecord) -> Self {
        Self {
            id: job.id,
            queue: job.queue.clone(),
            state: job.state,
            progress: job.progress,
            attempts_made: job.attempts_made,
            max_attempts: job.options.attempts,
            failed_reason: job.failed_reason.clone(),
            created_at: job.created_at,
            processed_at: job.processed_at,
            finished_at: job.finished_at,
        }
    }
}

/// Job counts per state for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueMetrics {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub total: u64,
}

impl QueueMetrics {
    pub fn record(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Waiting => self.waiting += count,
            JobState::Active => self.active += count,
            JobState::Completed => self.completed += count,
            JobState::Failed => self.failed += count,
            JobState::Delayed => self.delayed += count,
        }
        self.total += count;
    }

    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = JobState>,
    {
        let mut metrics = Self::default();
        for state in states {
            metrics.record(state, 1);
        }
        metrics
    }
}
