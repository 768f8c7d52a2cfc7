//! Store-management seam the worker is written against.
//!
//! `CacheDb` is the production implementation. Tests wrap it to inject
//! failures without touching SQLite.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::types::{CacheEntry, RequestIdentity, StoredResponse};
use crate::Error;

/// Registry of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if needed and write all entries atomically.
    async fn seed(&self, name: &str, entries: Vec<(RequestIdentity, StoredResponse)>) -> Result<(), Error>;

    /// Write a single entry, replacing any previous value for the identity.
    async fn put(&self, name: &str, identity: &RequestIdentity, response: &StoredResponse) -> Result<(), Error>;

    /// Look up a request identity in one store.
    async fn lookup(&self, name: &str, identity: &RequestIdentity) -> Result<Option<StoredResponse>, Error>;

    /// All entries of one store, empty if the store does not exist.
    async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error>;

    /// Every store name.
    async fn list(&self) -> Result<Vec<String>, Error>;

    /// Delete a store. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn seed(&self, name: &str, entries: Vec<(RequestIdentity, StoredResponse)>) -> Result<(), Error> {
        self.seed_store(name, entries).await
    }

    async fn put(&self, name: &str, identity: &RequestIdentity, response: &StoredResponse) -> Result<(), Error> {
        self.put_entry(name, identity, response).await
    }

    async fn lookup(&self, name: &str, identity: &RequestIdentity) -> Result<Option<StoredResponse>, Error> {
        self.match_entry(name, identity).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error> {
        self.store_entries(name).await
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        self.list_stores().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let storage: Arc<dyn CacheStorage> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let identity = RequestIdentity::get("http://localhost:3000/");

        storage
            .put("greenmap-v1", &identity, &StoredResponse::new(200, Vec::new(), "<html/>"))
            .await
            .unwrap();

        assert_eq!(storage.list().await.unwrap(), vec!["greenmap-v1"]);
        assert_eq!(storage.entries("greenmap-v1").await.unwrap().len(), 1);
        assert!(storage.lookup("greenmap-v1", &identity).await.unwrap().is_some());
        assert!(storage.delete("greenmap-v1").await.unwrap());
        assert!(storage.list().await.unwrap().is_empty());
    }
}
