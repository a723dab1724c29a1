//! Diligence - due-diligence scan pipeline with thesis-aligned scoring
//!
//! A scan request becomes two queued jobs: evidence collection, then report
//! generation. The report job scores the collected evidence against an
//! investment thesis and records a grade, a recommendation and how far the
//! result can be trusted.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Adapters** (`adapters`): in-memory and `SQLite` queue brokers, evidence sources
//! - **Service Layer** (`services`): orchestrator, event channel, workers, scoring
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use diligence::adapters::memory::InMemoryQueueBroker;
//! use diligence::domain::models::{QueuesConfig, ScanRequest};
//! use diligence::services::{JobEventChannel, PipelineOrchestrator};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let orchestrator = PipelineOrchestrator::new(
//!     Arc::new(InMemoryQueueBroker::new()),
//!     Arc::new(JobEventChannel::default()),
//!     QueuesConfig::default(),
//! );
//! let submission = orchestrator
//!     .submit_pipeline(&ScanRequest::new("Acme", "acme.io", "buy-and-build"))
//!     .await?;
//! println!("report job {}", submission.report_job_id);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::models::{
    ComprehensiveScoreResult, Config, Dimension, EvidenceItem, JobId, JobState, JobStatus,
    PipelineSubmission, QueueMetrics, ScanRequest,
};
pub use domain::ports::{EvidenceSource, QueueBroker};
pub use domain::{DomainError, DomainResult, JobError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{JobEventChannel, PipelineOrchestrator, ScoringEngine, ThesisRegistry};
