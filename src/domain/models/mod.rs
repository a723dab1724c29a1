pub mod config;
pub mod evidence;
pub mod job;
pub mod scan;
pub mod score;
pub mod thesis;

pub use config::{
    BrokerConfig, Config, EventsConfig, LogFormat, LoggingConfig, QueueConfig, QueuesConfig,
    RotationPolicy, ScoringConfig,
};
pub use evidence::{Dimension, EvidenceItem, SourceMetadata, DEFAULT_ITEM_CONFIDENCE};
pub use job::{
    dependency_satisfied, BackoffPolicy, EvidencePayload, FailureOutcome, JobId, JobOptions,
    JobPayload, JobRecord, JobRef, JobState, JobStatus, QueueMetrics, ReportPayload,
    RetentionPolicy, MAX_DELAY_MS,
};
pub use scan::{PipelineSubmission, ScanDepth, ScanRequest};
pub use score::{
    ComprehensiveScoreResult, ConfidenceBreakdown, DimensionScore, DimensionScores, Grade,
    Recommendation,
};
pub use thesis::{ThesisDefinition, ThesisError, ThesisProfile, ThesisWeights};
