//! Per-job progress and outcome notifications.
//!
//! Workers publish [`JobEvent`]s onto one broadcast channel. Callers either
//! read the raw stream, where slow readers skip old events, or register
//! [`JobListeners`] for a single job. Listeners get their own unbounded
//! route, drained by a task owned by the returned [`Subscription`], so a
//! busy channel never costs them the job's terminal event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::domain::models::{EventsConfig, JobId};

/// What happened to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobEventKind {
    /// Progress percentage reported by the running worker
    Progress(f64),
    /// Job finished with this return value
    Completed(serde_json::Value),
    /// Job failed for good with this reason
    Failed(String),
}

impl JobEventKind {
    /// No further events follow a terminal one for the same job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Notification about one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub sequence: u64,
    pub job_id: JobId,
    pub queue: String,
    pub kind: JobEventKind,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn concerns(&self, job_id: JobId, queue: &str) -> bool {
        self.job_id == job_id && self.queue == queue
    }
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            JobEventKind::Progress(p) => write!(f, "[{}] {} progress {p:.0}%", self.queue, self.job_id),
            JobEventKind::Completed(_) => write!(f, "[{}] {} completed", self.queue, self.job_id),
            JobEventKind::Failed(reason) => write!(f, "[{}] {} failed: {reason}", self.queue, self.job_id),
        }
    }
}

type Listener<T> = Box<dyn Fn(T) + Send + Sync>;

/// Optional callbacks for one job's events.
#[derive(Default)]
pub struct JobListeners {
    on_progress: Option<Listener<f64>>,
    on_completed: Option<Listener<serde_json::Value>>,
    on_failed: Option<Listener<String>>,
}

impl JobListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn on_completed(mut self, f: impl Fn(serde_json::Value) + Send + Sync + 'static) -> Self {
        self.on_completed = Some(Box::new(f));
        self
    }

    pub fn on_failed(mut self, f: impl Fn(String) + Send + Sync + 'static) -> Self {
        self.on_failed = Some(Box::new(f));
        self
    }

    fn dispatch(&self, kind: JobEventKind) {
        match kind {
            JobEventKind::Progress(p) => {
                if let Some(f) = &self.on_progress {
                    f(p);
                }
            }
            JobEventKind::Completed(value) => {
                if let Some(f) = &self.on_completed {
                    f(value);
                }
            }
            JobEventKind::Failed(reason) => {
                if let Some(f) = &self.on_failed {
                    f(reason);
                }
            }
        }
    }
}

type RouteKey = (JobId, String);
type RouteTable = HashMap<RouteKey, Vec<(u64, mpsc::UnboundedSender<JobEventKind>)>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for a registered set of job listeners.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listeners"]
pub struct Subscription {
    job_id: JobId,
    key: RouteKey,
    route_id: u64,
    routes: Weak<Mutex<RouteTable>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Remove all listeners. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if let Some(routes) = self.routes.upgrade() {
            let mut routes = lock(&routes);
            if let Some(senders) = routes.get_mut(&self.key) {
                senders.retain(|(id, _)| *id != self.route_id);
                if senders.is_empty() {
                    routes.remove(&self.key);
                }
            }
        }

        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::trace!(job_id = %self.job_id, "unsubscribed job listeners");
        }
    }

    /// Whether listeners may still be invoked.
    ///
    /// Turns false after unsubscribing or once the job's terminal event was delivered.
    pub fn is_active(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Broadcast channel carrying every job's events, plus per-job listener routes.
pub struct JobEventChannel {
    sender: broadcast::Sender<JobEvent>,
    sequence: AtomicU64,
    routes: Arc<Mutex<RouteTable>>,
    next_route: AtomicU64,
}

impl Default for JobEventChannel {
    fn default() -> Self {
        Self::new(&EventsConfig::default())
    }
}

impl JobEventChannel {
    pub fn new(config: &EventsConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
            routes: Arc::default(),
            next_route: AtomicU64::new(0),
        }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, job_id: JobId, queue: &str, kind: JobEventKind) -> JobEvent {
        let event = JobEvent {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            job_id,
            queue: queue.to_string(),
            kind,
            timestamp: Utc::now(),
        };
        tracing::trace!(%event, "publishing job event");
        let _ = self.sender.send(event.clone());
        self.route(&event);
        event
    }

    /// Hand the event to every listener of its job. A terminal event closes the job's routes.
    fn route(&self, event: &JobEvent) {
        let key = (event.job_id, event.queue.clone());
        let mut routes = lock(&self.routes);
        let Some(senders) = routes.get_mut(&key) else {
            return;
        };
        senders.retain(|(_, tx)| tx.send(event.kind.clone()).is_ok());
        if event.kind.is_terminal() || senders.is_empty() {
            routes.remove(&key);
        }
    }

    /// Subscribe to the unfiltered event stream.
    pub fn subscribe_all(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Invoke `listeners` for events of one job until unsubscribed or the job finishes.
    ///
    /// Must be called within a tokio runtime. Every event of the job published
    /// after this returns is delivered, in publish order, however far the
    /// broadcast stream runs ahead.
    pub fn subscribe(&self, job_id: JobId, queue: &str, listeners: JobListeners) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let key: RouteKey = (job_id, queue.to_string());
        let route_id = self.next_route.fetch_add(1, Ordering::Relaxed);
        lock(&self.routes)
            .entry(key.clone())
            .or_default()
            .push((route_id, tx));

        let handle = tokio::spawn(async move {
            while let Some(kind) = rx.recv().await {
                let terminal = kind.is_terminal();
                listeners.dispatch(kind);
                if terminal {
                    break;
                }
            }
        });

        Subscription {
            job_id,
            key,
            route_id,
            routes: Arc::downgrade(&self.routes),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Current sequence number (number of events published so far).
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Number of registered job listener sets.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.routes).values().map(Vec::len).sum()
    }
}
