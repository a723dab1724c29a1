//! In-process adapters for tests and single-process runs.

pub mod evidence_source;
pub mod queue_broker;

pub use evidence_source::InMemoryEvidenceSource;
pub use queue_broker::InMemoryQueueBroker;
