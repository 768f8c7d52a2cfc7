//! Core types and shared functionality for the greenmap offline worker.
//!
//! This crate provides:
//! - Versioned cache store registry with SQLite backend
//! - The `CacheStorage` seam the worker is written against
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStorage, RequestIdentity, StoreSummary, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
