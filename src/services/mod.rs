//! Pipeline services: orchestration, events, workers and scoring.

pub mod event_channel;
pub mod job_worker;
pub mod pipeline_orchestrator;
pub mod report_handler;
pub mod scoring;
pub mod thesis_registry;

pub use event_channel::{JobEvent, JobEventChannel, JobEventKind, JobListeners, Subscription};
pub use job_worker::{JobHandler, JobWorker, ProcessOutcome, ProgressReporter, WorkerConfig, WorkerHandle};
pub use pipeline_orchestrator::PipelineOrchestrator;
pub use report_handler::{EvidenceCollectionHandler, ReportJobHandler, ScanReport};
pub use scoring::ScoringEngine;
pub use thesis_registry::{ThesisRegistry, DEFAULT_THESIS_ID};
