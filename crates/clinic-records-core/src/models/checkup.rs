//! Checkup models.

use serde::{Deserialize, Serialize};

/// A medicine prescribed during a checkup.
///
/// Holds a copy of the catalog name at selection time. Renaming or removing
/// the catalog entry later does not touch existing checkups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicineRef {
    pub name: String,
}

impl MedicineRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One dated clinical visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Checkup {
    /// Visit date as entered (not calendar-validated)
    pub date: String,
    /// Findings
    #[serde(default)]
    pub notes: String,
    /// Secondary notes (diagnosis)
    #[serde(default)]
    pub notes2: String,
    /// Weight in kg, as entered
    #[serde(default)]
    pub weight: String,
    /// Prescribed medicines
    #[serde(default)]
    pub medicines: Vec<MedicineRef>,
}

impl Checkup {
    /// Create a checkup for the given visit date.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to attach prescribed medicines by name.
    pub fn with_medicines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.medicines = names.into_iter().map(MedicineRef::new).collect();
        self
    }

    /// Names of the prescribed medicines, in prescription order.
    pub fn medicine_names(&self) -> impl Iterator<Item = &str> {
        self.medicines.iter().map(|m| m.name.as_str())
    }

    pub(crate) fn has_date(&self) -> bool {
        !self.date.trim().is_empty()
    }
}
