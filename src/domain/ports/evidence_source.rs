use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::EvidenceItem;

/// Port for reading evidence gathered for a scan request
///
/// Stands in for the evidence store the collection stage writes to. A scan
/// with nothing collected yet yields an empty list, not an error.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// All evidence currently stored for the scan request
    async fn evidence_for(&self, scan_request_id: Uuid) -> DomainResult<Vec<EvidenceItem>>;
}
