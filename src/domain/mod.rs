//! Domain layer for the diligence pipeline
//!
//! Core models (jobs, scan requests, evidence, thesis profiles, scores),
//! domain errors and the port traits adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, JobError};
