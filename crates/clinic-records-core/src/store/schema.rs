//! SQLite schema for the local store.

use serde_json::Value;

use super::{StoreError, StoreResult};

/// Registry tables shared by every store.
pub const META_SCHEMA: &str = r#"
-- Registered collections and the record field holding their key
CREATE TABLE IF NOT EXISTS store_collections (
    name TEXT PRIMARY KEY,
    key_field TEXT NOT NULL,
    created_version INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Store-level settings (name, ...)
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Declaration of one collection inside a store.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    /// Collection name (ASCII letters, digits, underscore)
    pub name: String,
    /// Record field holding the key
    pub key_field: String,
    /// Records inserted when the collection is first created
    pub seed_rows: Vec<Value>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_field: key_field.into(),
            seed_rows: Vec::new(),
        }
    }

    pub fn with_seed_rows(mut self, rows: Vec<Value>) -> Self {
        self.seed_rows = rows;
        self
    }
}

/// Table name backing a collection.
pub(super) fn collection_table(name: &str) -> String {
    format!("collection_{name}")
}

/// DDL for a collection table.
///
/// `position` keeps stored order so snapshots load back in the order they
/// were written.
pub(super) fn collection_ddl(name: &str) -> String {
    let table = collection_table(name);
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    record_key TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    body TEXT NOT NULL                           -- JSON document
);

CREATE INDEX IF NOT EXISTS idx_{table}_position ON {table}(position);
"#
    )
}

/// Collection names are interpolated into SQL, so only plain identifiers pass.
pub(super) fn validate_collection_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollectionName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(META_SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);

        let result = conn.execute_batch(&collection_ddl("patients"));
        assert!(result.is_ok(), "Collection DDL should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_collection_name_validation() {
        assert!(validate_collection_name("patients").is_ok());
        assert!(validate_collection_name("_drafts2").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("2fast").is_err());
        assert!(validate_collection_name("drop table; --").is_err());
    }
}
