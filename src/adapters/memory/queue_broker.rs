//! In-memory implementation of the QueueBroker.
//!
//! Used by tests and single-process runs. All queues share one lock so
//! dependency checks see a consistent view of every queue.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    dependency_satisfied, FailureOutcome, JobId, JobRecord, JobState, QueueMetrics,
};
use crate::domain::ports::QueueBroker;

#[derive(Default)]
struct BrokerState {
    jobs: HashMap<JobId, JobRecord>,
    next_sequence: u64,
}

impl BrokerState {
    fn job_mut(&mut self, queue: &str, id: JobId) -> DomainResult<&mut JobRecord> {
        self.jobs
            .get_mut(&id)
            .filter(|job| job.queue == queue)
            .ok_or_else(|| DomainError::JobNotFound {
                queue: queue.to_string(),
                id,
            })
    }

    fn apply_retention(&mut self, queue: &str, id: JobId, now: DateTime<Utc>) {
        let Some((state, policy)) = self
            .jobs
            .get(&id)
            .and_then(|job| job.retention().map(|policy| (job.state, policy)))
        else {
            return;
        };

        let mut same_state: Vec<_> = self
            .jobs
            .values()
            .filter(|job| job.queue == queue && job.state == state)
            .collect();
        same_state.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        let finished: Vec<_> = same_state
            .into_iter()
            .map(|job| (job.id, job.finished_at.unwrap_or(now)))
            .collect();

        let expired = policy.expired(&finished, now);
        for id in &expired {
            self.jobs.remove(id);
        }
        if !expired.is_empty() {
            tracing::debug!(queue, %state, purged = expired.len(), "purged finished jobs");
        }
    }
}

/// Queue broker holding all jobs in process memory.
#[derive(Default)]
pub struct InMemoryQueueBroker {
    state: RwLock<BrokerState>,
}

impl InMemoryQueueBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueBroker for InMemoryQueueBroker {
    async fn add(&self, mut job: JobRecord) -> DomainResult<JobRecord> {
        let mut state = self.state.write().await;
        if state.jobs.contains_key(&job.id) {
            return Err(DomainError::ValidationFailed(format!(
                "job {} already exists",
                job.id
            )));
        }
        state.next_sequence += 1;
        job.sequence = state.next_sequence;
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, queue: &str, id: JobId) -> DomainResult<Option<JobRecord>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .get(&id)
            .filter(|job| job.queue == queue)
            .cloned())
    }

    async fn counts(&self, queue: &str) -> DomainResult<QueueMetrics> {
        let state = self.state.read().await;
        Ok(QueueMetrics::from_states(
            state
                .jobs
                .values()
                .filter(|job| job.queue == queue)
                .map(|job| job.state),
        ))
    }

    async fn claim_next(&self, queue: &str, now: DateTime<Utc>) -> DomainResult<Option<JobRecord>> {
        let mut state = self.state.write().await;

        for job in state.jobs.values_mut().filter(|job| job.queue == queue) {
            job.promote_if_due(now);
        }

        let next = state
            .jobs
            .values()
            .filter(|job| job.queue == queue && job.state == JobState::Waiting)
            .filter(|job| {
                let parent_state = job
                    .options
                    .depends_on
                    .as_ref()
                    .and_then(|dep| state.jobs.get(&dep.id))
                    .map(|parent| parent.state);
                dependency_satisfied(parent_state)
            })
            .max_by(|a, b| {
                a.options
                    .priority
                    .cmp(&b.options.priority)
                    .then_with(|| b.sequence.cmp(&a.sequence))
            })
            .map(|job| job.id);

        let Some(id) = next else {
            return Ok(None);
        };

        let job = state.job_mut(queue, id)?;
        job.activate(now)?;
        tracing::debug!(queue, job_id = %id, priority = job.options.priority, "claimed job");
        Ok(Some(job.clone()))
    }

    async fn update_progress(&self, queue: &str, id: JobId, progress: f64) -> DomainResult<JobRecord> {
        let mut state = self.state.write().await;
        let job = state.job_mut(queue, id)?;
        job.set_progress(progress)?;
        Ok(job.clone())
    }

    async fn complete(
        &self,
        queue: &str,
        id: JobId,
        return_value: serde_json::Value,
    ) -> DomainResult<JobRecord> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let job = state.job_mut(queue, id)?;
        job.complete(return_value, now)?;
        let job = job.clone();
        state.apply_retention(queue, id, now);
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
        let mut state = self.state.write().await;
        let job = state.job_mut(queue, id)?;
        let outcome = job.fail(reason, retryable, now)?;
        let job = job.clone();
        if job.state == JobState::Failed {
            state.apply_retention(queue, id, now);
        }
        Ok((job, outcome))
    }
}
