//! Local store adapter.
//!
//! A versioned SQLite database holding named collections of keyed JSON
//! records. Each collection declares the record field that carries its key,
//! and may declare seed rows inserted when the collection is first created.

mod collections;
mod lifecycle;
mod schema;
mod upgrade;

pub use lifecycle::{PendingOpen, StoreOptions, StoreState};
pub use schema::CollectionSpec;
pub use upgrade::UpgradeReport;

use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    #[error("Record in collection {collection} has no string key field `{field}`")]
    MissingKey { collection: String, field: String },

    #[error("Key `{key}` already exists in collection {collection}")]
    KeyExists { collection: String, key: String },

    #[error("Store version must be at least 1")]
    InvalidVersion,

    #[error("Requested store version {requested} is older than existing version {existing}")]
    VersionDowngrade { requested: u32, existing: u32 },

    #[error("Store is not open")]
    Closed,

    #[error("Store open did not complete: {0}")]
    OpenAborted(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to an open local store.
pub struct LocalStore {
    conn: Connection,
    name: String,
    version: u32,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open the store at path, creating and upgrading as needed.
    pub fn open<P: AsRef<Path>>(
        path: P,
        name: &str,
        version: u32,
        collections: &[CollectionSpec],
    ) -> StoreResult<Self> {
        let started_at = Instant::now();
        info!("event=store_open module=store status=start mode=file name={name} version={version}");
        let result = Connection::open(path)
            .map_err(StoreError::from)
            .and_then(|conn| Self::bootstrap(conn, name, version, collections));
        log_open_result(&result, "file", started_at);
        result
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory(
        name: &str,
        version: u32,
        collections: &[CollectionSpec],
    ) -> StoreResult<Self> {
        let started_at = Instant::now();
        info!("event=store_open module=store status=start mode=memory name={name} version={version}");
        let result = Connection::open_in_memory()
            .map_err(StoreError::from)
            .and_then(|conn| Self::bootstrap(conn, name, version, collections));
        log_open_result(&result, "memory", started_at);
        result
    }

    fn bootstrap(
        mut conn: Connection,
        name: &str,
        version: u32,
        collections: &[CollectionSpec],
    ) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let report = upgrade::apply_upgrade(&mut conn, name, version, collections)?;
        if !report.created.is_empty() {
            info!(
                "event=store_upgrade module=store status=ok from_version={} to_version={} created={}",
                report.previous_version,
                version,
                report.created.join(",")
            );
        }
        Ok(Self {
            conn,
            name: name.to_string(),
            version,
        })
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store version the handle was opened with.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Names of all registered collections, in creation order.
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM store_collections ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn log_open_result(result: &StoreResult<LocalStore>, mode: &str, started_at: Instant) {
    match result {
        Ok(_) => info!(
            "event=store_open module=store status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=store_open module=store status=error mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specs() -> Vec<CollectionSpec> {
        vec![
            CollectionSpec::new("patients", "name"),
            CollectionSpec::new("medicines", "name")
                .with_seed_rows(vec![json!({"name": "Aspirin"}), json!({"name": "Ibuprofen"})]),
        ]
    }

    #[test]
    fn test_open_in_memory() {
        let store = LocalStore::open_in_memory("patientDB", 4, &specs());
        assert!(store.is_ok());
    }

    #[test]
    fn test_collections_registered() {
        let store = LocalStore::open_in_memory("patientDB", 4, &specs()).unwrap();
        assert_eq!(store.collection_names().unwrap(), vec!["patients", "medicines"]);
        assert_eq!(store.name(), "patientDB");
        assert_eq!(store.version(), 4);
    }

    #[test]
    fn test_zero_version_rejected() {
        let result = LocalStore::open_in_memory("patientDB", 0, &specs());
        assert!(matches!(result, Err(StoreError::InvalidVersion)));
    }
}
