//! SQLite implementation of the QueueBroker.
//!
//! Each mutation runs in a transaction that loads the job, applies the
//! lifecycle transition from the domain model and writes the result back, so
//! several workers can share one database file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{format_datetime, parse_datetime, parse_optional_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    FailureOutcome, JobId, JobOptions, JobPayload, JobRecord, JobState, QueueMetrics,
};
use crate::domain::ports::QueueBroker;

/// Highest priority first, oldest first within a priority. A job whose
/// dependency row still exists and is unfinished is skipped.
const CLAIM_CANDIDATE_SQL: &str = r"
    SELECT j.* FROM jobs j
    WHERE j.queue = ? AND j.state = 'waiting'
      AND (j.depends_on_id IS NULL OR NOT EXISTS (
          SELECT 1 FROM jobs p
          WHERE p.id = j.depends_on_id AND p.state NOT IN ('completed', 'failed')
      ))
    ORDER BY j.priority DESC, j.seq ASC
    LIMIT 1";

#[derive(Clone)]
pub struct SqliteQueueBroker {
    pool: SqlitePool,
}

impl SqliteQueueBroker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(conn: &mut SqliteConnection, queue: &str, id: JobId) -> DomainResult<JobRecord> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE queue = ? AND id = ?")
            .bind(queue)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DomainError::JobNotFound {
            queue: queue.to_string(),
            id,
        })?
        .try_into()
    }

    async fn write_state(conn: &mut SqliteConnection, job: &JobRecord) -> DomainResult<()> {
        let return_value = job.return_value.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r"UPDATE jobs SET state = ?, attempts_made = ?, progress = ?, failed_reason = ?,
               return_value = ?, ready_at = ?, processed_at = ?, finished_at = ?
               WHERE id = ?",
        )
        .bind(job.state.as_str())
        .bind(i64::from(job.attempts_made))
        .bind(job.progress)
        .bind(&job.failed_reason)
        .bind(return_value)
        .bind(format_datetime(job.ready_at))
        .bind(job.processed_at.map(format_datetime))
        .bind(job.finished_at.map(format_datetime))
        .bind(job.id.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Purge finished jobs in the same state as `job` beyond its retention policy.
    async fn apply_retention(
        conn: &mut SqliteConnection,
        job: &JobRecord,
        now: DateTime<Utc>,
    ) -> DomainResult<usize> {
        let Some(policy) = job.retention() else {
            return Ok(0);
        };
        if policy.count.is_none() && policy.age.is_none() {
            return Ok(0);
        }

        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT id, finished_at FROM jobs WHERE queue = ? AND state = ? ORDER BY seq DESC")
                .bind(&job.queue)
                .bind(job.state.as_str())
                .fetch_all(&mut *conn)
                .await?;

        let mut finished = Vec::with_capacity(rows.len());
        for (id, finished_at) in rows {
            let id = id
                .parse::<JobId>()
                .map_err(|e| DomainError::SerializationError(e.to_string()))?;
            let finished_at = parse_optional_datetime(finished_at)?.unwrap_or(now);
            finished.push((id, finished_at));
        }

        let expired = policy.expired(&finished, now);
        for id in &expired {
            sqlx::query("DELETE FROM jobs WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut *conn)
                .await?;
        }

        if !expired.is_empty() {
            tracing::debug!(queue = %job.queue, state = %job.state, purged = expired.len(), "purged finished jobs");
        }
        Ok(expired.len())
    }
}

#[async_trait]
impl QueueBroker for SqliteQueueBroker {
    async fn add(&self, mut job: JobRecord) -> DomainResult<JobRecord> {
        let payload_json = serde_json::to_string(&job.payload)?;
        let options_json = serde_json::to_string(&job.options)?;
        let (depends_on_queue, depends_on_id) = job
            .options
            .depends_on
            .as_ref()
            .map(|dep| (dep.queue.clone(), dep.id.to_string()))
            .unzip();

        let result = sqlx::query(
            r"INSERT INTO jobs (id, queue, state, priority, payload, options, depends_on_queue,
               depends_on_id, attempts_made, progress, failed_reason, return_value, created_at,
               ready_at, processed_at, finished_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?, NULL, NULL)",
        )
        .bind(job.id.to_string())
        .bind(&job.queue)
        .bind(job.state.as_str())
        .bind(job.options.priority)
        .bind(&payload_json)
        .bind(&options_json)
        .bind(depends_on_queue)
        .bind(depends_on_id)
        .bind(i64::from(job.attempts_made))
        .bind(job.progress)
        .bind(format_datetime(job.created_at))
        .bind(format_datetime(job.ready_at))
        .execute(&self.pool)
        .await?;

        job.sequence = result.last_insert_rowid() as u64;
        Ok(job)
    }

    async fn get(&self, queue: &str, id: JobId) -> DomainResult<Option<JobRecord>> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE queue = ? AND id = ?")
            .bind(queue)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn counts(&self, queue: &str) -> DomainResult<QueueMetrics> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM jobs WHERE queue = ? GROUP BY state")
                .bind(queue)
                .fetch_all(&self.pool)
                .await?;

        let mut metrics = QueueMetrics::default();
        for (state, count) in rows {
            let state = JobState::from_str(&state)
                .ok_or_else(|| DomainError::SerializationError(format!("Invalid job state: {state}")))?;
            metrics.record(state, count as u64);
        }
        Ok(metrics)
    }

    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> DomainResult<Option<JobRecord>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE jobs SET state = 'waiting' WHERE queue = ? AND state = 'delayed' AND ready_at <= ?")
            .bind(queue)
            .bind(format_datetime(now))
            .execute(&mut *tx)
            .await?;

        let row: Option<JobRow> = sqlx::query_as(CLAIM_CANDIDATE_SQL)
            .bind(queue)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut job = JobRecord::try_from(row)?;
        job.activate(now)?;
        Self::write_state(&mut tx, &job).await?;
        tx.commit().await?;

        tracing::debug!(queue, job_id = %job.id, priority = job.options.priority, "claimed job");
        Ok(Some(job))
    }

    async fn update_progress(&self, queue: &str, id: JobId, progress: f64) -> DomainResult<JobRecord> {
        let mut tx = self.pool.begin().await?;
        let mut job = Self::fetch(&mut tx, queue, id).await?;
        job.set_progress(progress)?;
        Self::write_state(&mut tx, &job).await?;
        tx.commit().await?;
        Ok(job)
    }

    async fn complete(
        &self,
        queue: &str,
        id: JobId,
        return_value: serde_json::Value,
    ) -> DomainResult<JobRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut job = Self::fetch(&mut tx, queue, id).await?;
        job.complete(return_value, now)?;
        Self::write_state(&mut tx, &job).await?;
        Self::apply_retention(&mut tx, &job, now).await?;
        tx.commit().await?;
        Ok(job)
    }

    async fn fail(
        &self,
        queue: &str,
        id: JobId,
        reason: &str,
        retryable: bool,
    ) -> DomainResult<(JobRecord, FailureOutcome)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut job = Self::fetch(&mut tx, queue, id).await?;
        let outcome = job.fail(reason, retryable, now)?;
        Self::write_state(&mut tx, &job).await?;
        if job.state == JobState::Failed {
            Self::apply_retention(&mut tx, &job, now).await?;
        }
        tx.commit().await?;
        Ok((job, outcome))
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    seq: i64,
    id: String,
    queue: String,
    state: String,
    payload: String,
    options: String,
    attempts_made: i64,
    progress: f64,
    failed_reason: Option<String>,
    return_value: Option<String>,
    created_at: String,
    ready_at: String,
    processed_at: Option<String>,
    finished_at: Option<String>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse::<JobId>()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let state = JobState::from_str(&row.state)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid job state: {}", row.state)))?;

        let payload: JobPayload = serde_json::from_str(&row.payload)?;
        let options: JobOptions = serde_json::from_str(&row.options)?;
        let return_value = row
            .return_value
            .map(|s| serde_json::from_str(&s))
            .transpose()?;

        Ok(Self {
            id,
            queue: row.queue,
            sequence: row.seq as u64,
            state,
            payload,
            options,
            attempts_made: row.attempts_made as u32,
            progress: row.progress,
            failed_reason: row.failed_reason,
            return_value,
            created_at: parse_datetime(&row.created_at)?,
            ready_at: parse_datetime(&row.ready_at)?,
            processed_at: parse_optional_datetime(row.processed_at)?,
            finished_at: parse_optional_datetime(row.finished_at)?,
        })
    }
}
