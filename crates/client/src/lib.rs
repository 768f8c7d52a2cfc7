//! Client side of the greenmap offline worker.
//!
//! This crate provides the network seam with its HTTP implementation, URL
//! resolution, the bootstrap manifest, and the worker itself: lifecycle
//! state machine plus network-first interception with cache fallback.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchConfig, FetchRequest, FetchResponse, HttpNetwork, Network};
pub use worker::{
    ActivationReport, BootstrapManifest, FetchOutcome, InstallReport, OfflineWorker, ResponseSource, WorkerState,
};
