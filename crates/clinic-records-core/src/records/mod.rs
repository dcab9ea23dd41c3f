//! Record repositories over the local store.
//!
//! Both repositories keep the authoritative list in memory and write through
//! to the store after each successful mutation.

mod medicines;
mod patients;

pub use medicines::*;
pub use patients::*;

use serde_json::json;
use thiserror::Error;

use crate::store::{CollectionSpec, StoreError};

/// Collection holding patient records, keyed by name.
pub const PATIENTS: &str = "patients";

/// Collection holding the medicine catalog, keyed by name.
pub const MEDICINES: &str = "medicines";

/// Repository errors.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Medicine already exists: {0}")]
    Duplicate(String),

    #[error("Index {index} out of range for {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Store is not open yet")]
    NotReady,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Collections of a clinic store, with the medicine catalog seeded from
/// `default_medicines`.
pub fn clinic_collections<S: AsRef<str>>(default_medicines: &[S]) -> Vec<CollectionSpec> {
    vec![
        CollectionSpec::new(PATIENTS, "name"),
        CollectionSpec::new(MEDICINES, "name").with_seed_rows(
            default_medicines
                .iter()
                .map(|name| json!({ "name": name.as_ref() }))
                .collect(),
        ),
    ]
}
