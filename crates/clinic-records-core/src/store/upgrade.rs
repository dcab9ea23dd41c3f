//! Version-gated store upgrades.
//!
//! The store version lives in `PRAGMA user_version`. Raising it creates any
//! declared collection that does not exist yet and inserts that collection's
//! seed rows. Existing collections are never reseeded.

use rusqlite::{params, Connection, OptionalExtension};

use super::collections::{insert_record, record_key};
use super::schema::{collection_ddl, validate_collection_name, CollectionSpec, META_SCHEMA};
use super::{StoreError, StoreResult};

/// What an open changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    pub previous_version: u32,
    /// Collections created by this open
    pub created: Vec<String>,
}

/// Bring the store up to `version`.
pub(super) fn apply_upgrade(
    conn: &mut Connection,
    name: &str,
    version: u32,
    collections: &[CollectionSpec],
) -> StoreResult<UpgradeReport> {
    if version == 0 {
        return Err(StoreError::InvalidVersion);
    }
    for spec in collections {
        validate_collection_name(&spec.name)?;
    }

    let previous_version = current_user_version(conn)?;
    let mut report = UpgradeReport {
        previous_version,
        created: Vec::new(),
    };

    if version < previous_version {
        return Err(StoreError::VersionDowngrade {
            requested: version,
            existing: previous_version,
        });
    }
    if version == previous_version {
        return Ok(report);
    }

    let tx = conn.transaction()?;
    tx.execute_batch(META_SCHEMA)?;
    tx.execute(
        r#"
        INSERT INTO store_meta (key, value) VALUES ('store_name', ?1)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
        "#,
        [name],
    )?;

    for spec in collections {
        if collection_exists(&tx, &spec.name)? {
            continue;
        }
        tx.execute_batch(&collection_ddl(&spec.name))?;
        tx.execute(
            "INSERT INTO store_collections (name, key_field, created_version) VALUES (?1, ?2, ?3)",
            params![spec.name, spec.key_field, version],
        )?;
        for (position, row) in spec.seed_rows.iter().enumerate() {
            let key = record_key(row, &spec.name, &spec.key_field)?;
            insert_record(&tx, &spec.name, &key, position as i64, row)?;
        }
        report.created.push(spec.name.clone());
    }

    tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    tx.commit()?;

    Ok(report)
}

fn collection_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM store_collections WHERE name = ?",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn current_user_version(conn: &Connection) -> StoreResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn medicines(seed: &[&str]) -> CollectionSpec {
        CollectionSpec::new("medicines", "name")
            .with_seed_rows(seed.iter().map(|n| json!({ "name": n })).collect())
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_first_open_creates_and_seeds() {
        let mut conn = Connection::open_in_memory().unwrap();
        let report = apply_upgrade(&mut conn, "patientDB", 1, &[medicines(&["Aspirin"])]).unwrap();

        assert_eq!(report.previous_version, 0);
        assert_eq!(report.created, vec!["medicines"]);
        assert_eq!(count(&conn, "collection_medicines"), 1);
        assert_eq!(current_user_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_version_bump_adds_missing_collection_without_reseeding() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_upgrade(&mut conn, "patientDB", 1, &[medicines(&["Aspirin"])]).unwrap();
        conn.execute("DELETE FROM collection_medicines", []).unwrap();

        let specs = [
            CollectionSpec::new("patients", "name"),
            medicines(&["Aspirin", "Ibuprofen"]),
        ];
        let report = apply_upgrade(&mut conn, "patientDB", 2, &specs).unwrap();

        assert_eq!(report.created, vec!["patients"]);
        // Existing collection is left alone, even though it is now empty.
        assert_eq!(count(&conn, "collection_medicines"), 0);
        assert_eq!(count(&conn, "collection_patients"), 0);
    }

    #[test]
    fn test_same_version_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_upgrade(&mut conn, "patientDB", 3, &[medicines(&["Aspirin"])]).unwrap();

        let specs = [CollectionSpec::new("patients", "name")];
        let report = apply_upgrade(&mut conn, "patientDB", 3, &specs).unwrap();
        assert!(report.created.is_empty());
        assert!(!collection_exists(&conn, "patients").unwrap());
    }

    #[test]
    fn test_downgrade_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_upgrade(&mut conn, "patientDB", 4, &[]).unwrap();

        let result = apply_upgrade(&mut conn, "patientDB", 3, &[]);
        assert!(matches!(
            result,
            Err(StoreError::VersionDowngrade { requested: 3, existing: 4 })
        ));
    }

    #[test]
    fn test_seed_row_without_key_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        let spec = CollectionSpec::new("medicines", "name").with_seed_rows(vec![json!({"label": "x"})]);

        let result = apply_upgrade(&mut conn, "patientDB", 1, &[spec]);
        assert!(matches!(result, Err(StoreError::MissingKey { .. })));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
    }
}
