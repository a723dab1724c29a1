//! CLI command implementations.

pub mod init;
pub mod pipeline;
pub mod score;
pub mod thesis;
pub mod work;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteQueueBroker};
use crate::domain::models::{Config, EvidenceItem};
use crate::infrastructure::config::ConfigLoader;

/// Project configuration, or the given file when `--config` is set.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Open (and migrate) the durable queue broker.
pub async fn open_broker(config: &Config) -> Result<Arc<SqliteQueueBroker>> {
    let pool = initialize_database(
        &config.broker.database_url,
        Some(PoolConfig::from(&config.broker)),
    )
    .await
    .with_context(|| format!("Failed to open queue database {}", config.broker.database_url))?;
    Ok(Arc::new(SqliteQueueBroker::new(pool)))
}

/// Read a JSON array of evidence items.
pub async fn read_evidence_file(path: &Path) -> Result<Vec<EvidenceItem>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read evidence file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse evidence file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Dimension;

    #[tokio::test]
    async fn test_read_evidence_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.json");
        std::fs::write(
            &path,
            r#"[{"id": "t1", "category": "technical", "content": "Robust API",
                 "confidence": 0.9, "timestamp": "2024-05-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let items = read_evidence_file(&path).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category, Dimension::Technical);
        assert_eq!(items[0].self_reported_confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_read_evidence_file_reports_path() {
        let err = read_evidence_file(Path::new("/nonexistent/evidence.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/evidence.json"));
    }
}
