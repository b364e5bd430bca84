//! Birdsight Library
//!
//! Client core for a streaming bird identification service: reconciles the
//! NDJSON identification stream into candidate records, caches per-species
//! media with bounded retry, tracks usage credits against a server-side
//! counter, and keeps a local search history.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
