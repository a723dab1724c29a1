//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - YAML project files under `.diligence/`
//! - `DILIGENCE_*` environment variable overrides
//! - Validation of queue policies, limits and thesis profiles

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR};
