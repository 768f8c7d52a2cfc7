//! Store and entry operations on the SQLite registry.
//!
//! Every store operation is a single call onto the connection thread.
//! Writes that touch several rows run inside one transaction.

use super::connection::CacheDb;
use super::types::{CacheEntry, RequestIdentity, StoreSummary, StoredResponse};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension};

fn ensure_store(conn: &Connection, name: &str, now: &str) -> Result<bool, Error> {
    let created = conn.execute(
        "INSERT INTO cache_stores (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, now],
    )?;
    Ok(created == 1)
}

fn upsert_entry(
    conn: &Connection, store: &str, identity: &RequestIdentity, response: &StoredResponse, now: &str,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT INTO cache_entries (
            store_name, key_hash, method, url, status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(store_name, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            store,
            identity.key(),
            &identity.method,
            &identity.url,
            response.status,
            headers_json,
            &response.body,
            now,
        ],
    )?;
    Ok(())
}

fn decode_headers(json: &str) -> Result<Vec<(String, String)>, Error> {
    Ok(serde_json::from_str(json)?)
}

impl CacheDb {
    /// Open a store, creating it if absent.
    ///
    /// Returns true if the store was created by this call.
    pub async fn open_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> { ensure_store(conn, &name, &now) })
            .await
            .map_err(Error::from)
    }

    /// Create the store if needed and write every entry in one transaction.
    ///
    /// Either all entries are committed or none are; a store created by a
    /// failed call is rolled back with it.
    pub async fn seed_store(&self, name: &str, entries: Vec<(RequestIdentity, StoredResponse)>) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                ensure_store(&tx, &name, &now)?;
                for (identity, response) in &entries {
                    upsert_entry(&tx, &name, identity, response, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write one response under its request identity, creating the store if needed.
    ///
    /// An existing entry for the same identity is replaced.
    pub async fn put_entry(
        &self, name: &str, identity: &RequestIdentity, response: &StoredResponse,
    ) -> Result<(), Error> {
        let name = name.to_string();
        let identity = identity.clone();
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                ensure_store(&tx, &name, &now)?;
                upsert_entry(&tx, &name, &identity, &response, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a response by request identity.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, name: &str, identity: &RequestIdentity) -> Result<Option<StoredResponse>, Error> {
        let name = name.to_string();
        let key = identity.key();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM cache_entries
                         WHERE store_name = ?1 AND key_hash = ?2",
                        params![name, key],
                        |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;

                match row {
                    Some((status, headers_json, body)) => {
                        Ok(Some(StoredResponse { status, headers: decode_headers(&headers_json)?, body }))
                    }
                    None => Ok(None),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of a store, ordered by URL then method.
    pub async fn store_entries(&self, name: &str) -> Result<Vec<CacheEntry>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at FROM cache_entries
                     WHERE store_name = ?1 ORDER BY url, method",
                )?;
                let rows = stmt
                    .query_map(params![name], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                rows.into_iter()
                    .map(|(method, url, status, headers_json, body, stored_at)| -> Result<CacheEntry, Error> {
                        Ok(CacheEntry {
                            identity: RequestIdentity { method, url },
                            response: StoredResponse { status, headers: decode_headers(&headers_json)?, body },
                            stored_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Every store name, in creation order.
    pub async fn list_stores(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every store with its entry count.
    pub async fn summarize_stores(&self) -> Result<Vec<StoreSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.created_at, COUNT(e.key_hash) FROM cache_stores s
                     LEFT JOIN cache_entries e ON e.store_name = s.name
                     GROUP BY s.name, s.created_at
                     ORDER BY s.created_at, s.name",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(StoreSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
