//! Infrastructure layer module
//!
//! Configuration loading and logging setup. Storage adapters implementing the
//! domain ports live in `adapters`.

pub mod config;
pub mod logging;
