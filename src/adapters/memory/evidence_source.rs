use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::EvidenceItem;
use crate::domain::ports::EvidenceSource;

/// Evidence store keyed by scan request, held in memory.
#[derive(Default)]
pub struct InMemoryEvidenceSource {
    evidence: RwLock<HashMap<Uuid, Vec<EvidenceItem>>>,
}

impl InMemoryEvidenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append items collected for a scan request.
    pub async fn record(&self, scan_request_id: Uuid, items: impl IntoIterator<Item = EvidenceItem>) {
        self.evidence
            .write()
            .await
            .entry(scan_request_id)
            .or_default()
            .extend(items);
    }

    /// Evidence for requests with no recorded entry of their own.
    ///
    /// Lets a single evidence file stand in for every scan in local runs.
    pub async fn record_default(&self, items: impl IntoIterator<Item = EvidenceItem>) {
        self.record(Uuid::nil(), items).await;
    }
}

#[async_trait]
impl EvidenceSource for InMemoryEvidenceSource {
    async fn evidence_for(&self, scan_request_id: Uuid) -> DomainResult<Vec<EvidenceItem>> {
        let evidence = self.evidence.read().await;
        Ok(evidence
            .get(&scan_request_id)
            .or_else(|| evidence.get(&Uuid::nil()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Dimension;
    use chrono::Utc;

    #[tokio::test]
    async fn test_unknown_request_has_no_evidence() {
        let source = InMemoryEvidenceSource::new();
        assert!(source.evidence_for(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_appends() {
        let source = InMemoryEvidenceSource::new();
        let scan = Uuid::new_v4();
        source
            .record(scan, [EvidenceItem::new("a", Dimension::Team, "hiring", Utc::now())])
            .await;
        source
            .record(scan, [EvidenceItem::new("b", Dimension::Team, "leadership", Utc::now())])
            .await;

        let items = source.evidence_for(scan).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_default_evidence_used_as_fallback() {
        let source = InMemoryEvidenceSource::new();
        source
            .record_default([EvidenceItem::new("a", Dimension::Market, "growth", Utc::now())])
            .await;

        assert_eq!(source.evidence_for(Uuid::new_v4()).await.unwrap().len(), 1);
    }
}
