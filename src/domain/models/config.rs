use serde::{Deserialize, Serialize};

use super::job::{BackoffPolicy, RetentionPolicy};
use super::thesis::ThesisDefinition;

/// Main configuration structure for the diligence pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Queue broker storage
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Queue names and job policies
    #[serde(default)]
    pub queues: QueuesConfig,

    /// Event channel configuration
    #[serde(default)]
    pub events: EventsConfig,

    /// Scoring engine tuning
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Custom thesis profiles, added to (or overriding) the built-in ones
    #[serde(default)]
    pub theses: Vec<ThesisDefinition>,
}

/// Queue broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BrokerConfig {
    /// `SQLite` connection URL for the durable broker
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite:.diligence/queue.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Policy for one named queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    pub name: String,

    /// Total attempts per job, including the first
    pub attempts: u32,

    pub backoff: BackoffPolicy,

    #[serde(default)]
    pub remove_on_complete: RetentionPolicy,

    #[serde(default)]
    pub remove_on_fail: RetentionPolicy,
}

impl QueueConfig {
    pub fn evidence_default() -> Self {
        Self {
            name: "evidence-collection".to_string(),
            attempts: 3,
            backoff: BackoffPolicy::Exponential { delay: 2000 },
            remove_on_complete: RetentionPolicy::keep(100, 3600),
            remove_on_fail: RetentionPolicy::keep_count(1000),
        }
    }

    pub fn report_default() -> Self {
        Self {
            name: "report-generation".to_string(),
            attempts: 2,
            backoff: BackoffPolicy::Exponential { delay: 10000 },
            remove_on_complete: RetentionPolicy::keep(100, 3600),
            remove_on_fail: RetentionPolicy::keep_count(1000),
        }
    }
}

/// Configuration of the two pipeline queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueuesConfig {
    #[serde(default = "QueueConfig::evidence_default")]
    pub evidence: QueueConfig,

    #[serde(default = "QueueConfig::report_default")]
    pub report: QueueConfig,

    /// Minimum delay between evidence and report job readiness
    #[serde(default = "default_report_min_delay_ms")]
    pub report_min_delay_ms: u64,

    /// Hold report jobs until their evidence job has finished
    #[serde(default = "default_enforce_dependency")]
    pub enforce_dependency: bool,
}

const fn default_report_min_delay_ms() -> u64 {
    5000
}

const fn default_enforce_dependency() -> bool {
    true
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            evidence: QueueConfig::evidence_default(),
            report: QueueConfig::report_default(),
            report_min_delay_ms: default_report_min_delay_ms(),
            enforce_dependency: default_enforce_dependency(),
        }
    }
}

impl QueuesConfig {
    /// Resolve a queue alias (`evidence`, `report`) or full name.
    pub fn resolve_name(&self, queue: &str) -> String {
        match queue {
            "evidence" => self.evidence.name.clone(),
            "report" => self.report.name.clone(),
            other => other.to_string(),
        }
    }
}

/// Event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventsConfig {
    /// Buffer of the raw event stream; slow stream readers skip older events
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_channel_capacity() -> usize {
    1024
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Scoring engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringConfig {
    /// Evidence older than this contributes nothing to recency
    #[serde(default = "default_recency_window_days")]
    pub recency_window_days: u32,
}

const fn default_recency_window_days() -> u32 {
    365
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency_window_days: default_recency_window_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for JSON log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log file rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}
