//! SQLite-backed registry of versioned cache stores.
//!
//! A cache store is a named collection of request → response snapshots.
//! The worker owns exactly one current store per version; the registry
//! here keeps all of them in a single SQLite file with async access via
//! tokio-rusqlite. It supports:
//!
//! - Create-if-absent stores and atomic seeding of a whole manifest
//! - Request identity keys hashed with SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-store deletion with cascading entry removal

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod naming;
pub mod storage;
pub mod stores;
pub mod types;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::CacheStorage;
pub use types::{CacheEntry, RequestIdentity, StoreSummary, StoredResponse};
