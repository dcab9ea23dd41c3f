//! Medicine catalog.

use log::{error, info, warn};

use super::{RecordError, RecordResult, MEDICINES};
use crate::models::Medicine;
use crate::store::{LocalStore, StoreResult, StoreState};

/// Outcome of adding a comma separated list of medicines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicineBatch {
    pub added: Vec<Medicine>,
    /// Names skipped because the catalog already had them
    pub duplicates: Vec<String>,
}

/// In-memory medicine catalog, mirrored to the `medicines` collection.
#[derive(Debug, Default)]
pub struct MedicineCatalog {
    medicines: Vec<Medicine>,
}

impl MedicineCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted catalog.
    pub fn load(store: &LocalStore) -> StoreResult<Self> {
        let medicines: Vec<Medicine> = store.get_all(MEDICINES)?;
        info!(
            "event=medicines_load module=records status=ok count={}",
            medicines.len()
        );
        Ok(Self { medicines })
    }

    /// All medicines, stored order.
    pub fn all(&self) -> &[Medicine] {
        &self.medicines
    }

    pub fn len(&self) -> usize {
        self.medicines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medicines.is_empty()
    }

    /// Case-insensitive membership check.
    pub fn contains(&self, name: &str) -> bool {
        self.medicines.iter().any(|m| m.is_named(name))
    }

    /// Medicines whose name contains `substring`, case-insensitive.
    /// An empty filter returns everything.
    pub fn filter(&self, substring: &str) -> Vec<&Medicine> {
        let needle = substring.to_lowercase();
        self.medicines
            .iter()
            .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Add a medicine unless one with the same name exists.
    ///
    /// The entry is written to the store before it joins the in-memory
    /// catalog; a store failure leaves the catalog unchanged.
    pub fn add_if_absent(&mut self, store: &StoreState, name: &str) -> RecordResult<Medicine> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RecordError::Validation("medicine name is required".into()));
        }
        let store = match store.store() {
            Ok(store) => store,
            Err(_) => {
                warn!("event=medicine_add module=records status=rejected reason=store_closed");
                return Err(RecordError::NotReady);
            }
        };
        if self.contains(name) {
            return Err(RecordError::Duplicate(name.to_string()));
        }

        let medicine = Medicine::new(name);
        if let Err(err) = store.add(MEDICINES, &medicine) {
            error!("event=medicine_add module=records status=error error={err}");
            return Err(err.into());
        }
        info!("event=medicine_add module=records status=ok");
        self.medicines.push(medicine.clone());
        Ok(medicine)
    }

    /// Add each name of a comma separated list.
    ///
    /// Blank entries are skipped and duplicates are reported without
    /// stopping the rest. Any other failure aborts the remaining names.
    pub fn add_list(&mut self, store: &StoreState, input: &str) -> RecordResult<MedicineBatch> {
        let mut batch = MedicineBatch::default();
        for name in input.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match self.add_if_absent(store, name) {
                Ok(medicine) => batch.added.push(medicine),
                Err(RecordError::Duplicate(name)) => batch.duplicates.push(name),
                Err(err) => return Err(err),
            }
        }
        Ok(batch)
    }
}
