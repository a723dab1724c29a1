pub mod evidence_source;
pub mod queue_broker;

pub use evidence_source::EvidenceSource;
pub use queue_broker::QueueBroker;
