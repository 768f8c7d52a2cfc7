//! The offline cache worker.
//!
//! ### Lifecycle
//! - `install`: fetch every bootstrap manifest entry, then seed the current
//!   store in a single transaction. Any failed or non-success fetch aborts the
//!   install before anything is written; the worker stays uninstalled and
//!   install can be retried.
//! - `resume`: on boot, adopt a store a previous run of this version left
//!   complete, so the cache keeps serving across an offline restart.
//! - `activate`: delete every store whose name is not the current one.
//!   Individual deletion failures are logged and reported, never fatal.
//!
//! ### Interception
//! - Network first. A successful GET is returned immediately and a snapshot
//!   of it is written to the current store on a background task.
//! - When the network is unreachable the current store is consulted; a miss
//!   surfaces the original network error. Any other fetch error (an oversized
//!   body) comes from a reachable server and is returned as is.
//! - Non-GET requests are never written and never served from the store.

pub mod lifecycle;
pub mod manifest;

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use greenmap_core::cache::naming;
use greenmap_core::{AppConfig, CacheStorage, Error, RequestIdentity, StoredResponse};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::fetch::{FetchRequest, FetchResponse, Network};

pub use lifecycle::WorkerState;
pub use manifest::BootstrapManifest;

/// Result of a successful install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    /// Store the manifest was written to.
    pub store: String,
    /// URLs now guaranteed to be in the store.
    pub cached: Vec<String>,
}

/// A stale store that could not be deleted during activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub name: String,
    pub reason: String,
}

/// Result of activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationReport {
    pub current: String,
    pub deleted: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
        }
    }
}

/// Response handed back to the page for one intercepted request.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
}

/// One version of the offline cache worker.
pub struct OfflineWorker {
    store_name: String,
    manifest: BootstrapManifest,
    network: Arc<dyn Network>,
    storage: Arc<dyn CacheStorage>,
    state: RwLock<WorkerState>,
    writes: Mutex<JoinSet<()>>,
}

impl OfflineWorker {
    pub fn new(
        store_name: impl Into<String>, manifest: BootstrapManifest, network: Arc<dyn Network>,
        storage: Arc<dyn CacheStorage>,
    ) -> Self {
        Self {
            store_name: store_name.into(),
            manifest,
            network,
            storage,
            state: RwLock::new(WorkerState::Uninstalled),
            writes: Mutex::new(JoinSet::new()),
        }
    }

    /// Build a worker for the configured version, origin and manifest.
    pub fn from_config(
        config: &AppConfig, network: Arc<dyn Network>, storage: Arc<dyn CacheStorage>,
    ) -> Result<Self, Error> {
        let manifest = BootstrapManifest::from_config(config)?;
        Ok(Self::new(config.store_name(), manifest, network, storage))
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn manifest(&self) -> &BootstrapManifest {
        &self.manifest
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn transition(&self, next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(Error::InvalidTransition { from: state.to_string(), to: next.to_string() });
        }
        let previous = std::mem::replace(&mut *state, next);
        tracing::info!(store = %self.store_name, from = %previous, to = %next, "worker state changed");
        Ok(previous)
    }

    /// Handle the install event.
    ///
    /// Returns only after the manifest has been committed to the store.
    ///
    /// # Errors
    ///
    /// - `Error::ManifestFetch` if any entry could not be fetched or came
    ///   back with a non-success status. No entry of this attempt is written
    ///   and the worker goes back to uninstalled.
    /// - `Error::InvalidTransition` if the worker was already installed.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Installing).await?;

        match self.seed_manifest().await {
            Ok(cached) => {
                self.transition(WorkerState::Installed).await?;
                tracing::info!(store = %self.store_name, entries = cached.len(), "install complete");
                Ok(InstallReport { store: self.store_name.clone(), cached })
            }
            Err(e) => {
                tracing::warn!(store = %self.store_name, error = %e, "install failed");
                self.transition(WorkerState::Uninstalled).await?;
                Err(e)
            }
        }
    }

    async fn seed_manifest(&self) -> Result<Vec<String>, Error> {
        let fetches = self.manifest.requests().map(|request| async move {
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::ManifestFetch { url: request.url.to_string(), reason: e.to_string() })?;

            if !response.status.is_success() {
                return Err(Error::ManifestFetch {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            Ok((request.identity(), response.to_stored()))
        });

        let entries = try_join_all(fetches).await?;
        let cached = entries.iter().map(|(identity, _)| identity.url.clone()).collect();

        self.storage.seed(&self.store_name, entries).await?;

        Ok(cached)
    }

    /// Adopt the current store if an earlier run of this version completed
    /// its install.
    ///
    /// Returns true and moves the worker to installed when the store holds
    /// every manifest entry, so it can be activated without the network.
    /// Returns false and leaves the worker uninstalled otherwise.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidTransition` if the worker is no longer uninstalled.
    /// - Any error reading the store.
    pub async fn resume(&self) -> Result<bool, Error> {
        let state = self.state().await;
        if state != WorkerState::Uninstalled {
            return Err(Error::InvalidTransition { from: state.to_string(), to: WorkerState::Installed.to_string() });
        }

        if !self.storage.list().await?.contains(&self.store_name) {
            tracing::debug!(store = %self.store_name, "no store to resume from");
            return Ok(false);
        }

        let stored: HashSet<RequestIdentity> = self
            .storage
            .entries(&self.store_name)
            .await?
            .into_iter()
            .map(|entry| entry.identity)
            .collect();
        let missing = self
            .manifest
            .requests()
            .filter(|request| !stored.contains(&request.identity()))
            .count();
        if missing > 0 {
            tracing::info!(store = %self.store_name, missing, "store is incomplete, install required");
            return Ok(false);
        }

        self.transition(WorkerState::Installed).await?;
        tracing::info!(store = %self.store_name, entries = stored.len(), "resumed from existing store");
        Ok(true)
    }

    /// Handle the activate event.
    ///
    /// Deletes every store other than the current one and waits for all
    /// deletions to settle before reporting.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidTransition` if the worker is not installed.
    /// - Any error listing the stores; the worker goes back to installed so
    ///   activation can be retried.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(WorkerState::Activating).await?;

        let names = match self.storage.list().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(store = %self.store_name, error = %e, "could not enumerate stores");
                self.transition(WorkerState::Installed).await?;
                return Err(e);
            }
        };

        let stale: Vec<String> = names
            .into_iter()
            .filter(|name| !naming::is_current(name, &self.store_name))
            .collect();

        let results = join_all(stale.into_iter().map(|name| async move {
            let result = self.storage.delete(&name).await;
            (name, result)
        }))
        .await;

        let mut report = ActivationReport { current: self.store_name.clone(), deleted: Vec::new(), failed: Vec::new() };
        for (name, result) in results {
            match result {
                Ok(true) => report.deleted.push(name),
                Ok(false) => tracing::debug!(store = %name, "stale store already gone"),
                Err(e) => {
                    let err = Error::StoreDeletion { name: name.clone(), reason: e.to_string() };
                    tracing::warn!(error = %err, "keeping stale store");
                    report.failed.push(FailedDeletion { name, reason: e.to_string() });
                }
            }
        }

        self.transition(WorkerState::Active).await?;
        tracing::info!(
            store = %self.store_name,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "activation complete"
        );

        Ok(report)
    }

    /// Handle one fetch event.
    ///
    /// # Errors
    ///
    /// - `Error::NotActive` if the worker is not active.
    /// - `Error::ResponseTooLarge` if the server answered with a body over
    ///   the limit. The store is not consulted.
    /// - The network error when the network is unreachable and the store has
    ///   no usable entry for the request.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<FetchOutcome, Error> {
        let state = self.state().await;
        if !state.can_intercept() {
            return Err(Error::NotActive(state.to_string()));
        }

        let network_err = match self.network.fetch(&request).await {
            Ok(response) => {
                if request.is_cacheable() {
                    self.write_through(request.identity(), response.to_stored()).await;
                }
                return Ok(FetchOutcome { response, source: ResponseSource::Network });
            }
            Err(e @ Error::NetworkUnavailable(_)) => e,
            Err(e) => return Err(e),
        };

        if !request.is_cacheable() {
            return Err(network_err);
        }

        let identity = request.identity();
        match self.storage.lookup(&self.store_name, &identity).await {
            Ok(Some(stored)) => match FetchResponse::from_stored(request.url, stored) {
                Ok(response) => {
                    tracing::debug!(request = %identity, "network failed, serving from cache");
                    Ok(FetchOutcome { response, source: ResponseSource::Cache })
                }
                Err(e) => {
                    tracing::warn!(request = %identity, error = %e, "stored response unreadable");
                    Err(network_err)
                }
            },
            Ok(None) => {
                tracing::debug!(request = %identity, error = %network_err, "network failed and cache missed");
                Err(network_err)
            }
            Err(e) => {
                tracing::warn!(request = %identity, error = %e, "cache lookup failed");
                Err(network_err)
            }
        }
    }

    /// Spawn the store write for a GET response without waiting on it.
    async fn write_through(&self, identity: RequestIdentity, snapshot: StoredResponse) {
        let storage = Arc::clone(&self.storage);
        let store = self.store_name.clone();

        let mut writes = self.writes.lock().await;
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            match storage.put(&store, &identity, &snapshot).await {
                Ok(()) => tracing::debug!(request = %identity, store = %store, "cached response"),
                Err(e) => tracing::warn!(request = %identity, store = %store, error = %e, "cache write failed"),
            }
        });
    }

    /// Wait for every background cache write spawned so far.
    pub async fn settle_writes(&self) {
        let mut pending = std::mem::take(&mut *self.writes.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "cache write task aborted");
            }
        }
    }

    /// Look up the current store without touching the network.
    pub async fn cached(&self, identity: &RequestIdentity) -> Result<Option<StoredResponse>, Error> {
        self.storage.lookup(&self.store_name, identity).await
    }

    /// Mark the worker as superseded. Fetches are refused afterwards.
    pub async fn terminate(&self) -> Result<(), Error> {
        self.transition(WorkerState::Terminated).await?;
        Ok(())
    }
}
