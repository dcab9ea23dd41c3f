//! Collection record operations.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::schema::collection_table;
use super::{LocalStore, StoreError, StoreResult};

impl LocalStore {
    /// All records of a collection, in stored order.
    pub fn get_all<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        self.key_field(collection)?;
        let table = collection_table(collection);
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT body FROM {table} ORDER BY position, rowid"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for body in rows {
            records.push(serde_json::from_str(&body?)?);
        }
        Ok(records)
    }

    /// Replace the full contents of a collection.
    ///
    /// Clears the collection then writes every record in order, inside one
    /// transaction. Records sharing a key collapse to the last one written.
    pub fn put_all<T: Serialize>(&mut self, collection: &str, records: &[T]) -> StoreResult<()> {
        let key_field = self.key_field(collection)?;
        let table = collection_table(collection);

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        for (position, record) in records.iter().enumerate() {
            let value = serde_json::to_value(record)?;
            let key = record_key(&value, collection, &key_field)?;
            insert_record(&tx, collection, &key, position as i64, &value)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert one record at the end of a collection.
    ///
    /// Fails with [`StoreError::KeyExists`] if the key is already stored.
    pub fn add<T: Serialize>(&self, collection: &str, record: &T) -> StoreResult<()> {
        let key_field = self.key_field(collection)?;
        let table = collection_table(collection);
        let value = serde_json::to_value(record)?;
        let key = record_key(&value, collection, &key_field)?;

        let exists = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {table} WHERE record_key = ?"),
                [&key],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            return Err(StoreError::KeyExists {
                collection: collection.to_string(),
                key,
            });
        }

        let next_position: i64 = self.conn.query_row(
            &format!("SELECT COALESCE(MAX(position) + 1, 0) FROM {table}"),
            [],
            |row| row.get(0),
        )?;
        insert_record(&self.conn, collection, &key, next_position, &value)
    }

    /// Remove every record of a collection. Returns the number removed.
    pub fn clear(&self, collection: &str) -> StoreResult<usize> {
        self.key_field(collection)?;
        let table = collection_table(collection);
        Ok(self.conn.execute(&format!("DELETE FROM {table}"), [])?)
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.key_field(collection)?;
        let table = collection_table(collection);
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Key field of a registered collection.
    fn key_field(&self, collection: &str) -> StoreResult<String> {
        self.conn
            .query_row(
                "SELECT key_field FROM store_collections WHERE name = ?",
                [collection],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }
}

/// Extract the string key of a record.
pub(super) fn record_key(value: &Value, collection: &str, key_field: &str) -> StoreResult<String> {
    value
        .get(key_field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::MissingKey {
            collection: collection.to_string(),
            field: key_field.to_string(),
        })
}

pub(super) fn insert_record(
    conn: &Connection,
    collection: &str,
    key: &str,
    position: i64,
    value: &Value,
) -> StoreResult<()> {
    let table = collection_table(collection);
    let body = serde_json::to_string(value)?;
    conn.execute(
        &format!(
            r#"
            INSERT INTO {table} (record_key, position, body) VALUES (?1, ?2, ?3)
            ON CONFLICT(record_key) DO UPDATE SET
                position = excluded.position,
                body = excluded.body
            "#
        ),
        params![key, position, body],
    )?;
    Ok(())
}
