//! Clinic Records Core Library
//!
//! Local-first patient records with checkup history and a medicine catalog.
//!
//! # Architecture
//!
//! ```text
//! View command (native / web shell via FFI)
//!        │
//!        ▼
//!   Clinic session ── Closed ──► rejects mutations (NotReady)
//!        │ Open
//!        ▼
//!   PatientRepository / MedicineCatalog   (authoritative in-memory lists)
//!        │ full snapshot after each mutation
//!        ▼
//!   LocalStore  ── versioned SQLite, keyed JSON collections
//!                  "patients" (key: name), "medicines" (key: name, seeded)
//! ```
//!
//! # Modules
//!
//! - [`store`]: versioned local store with keyed collections
//! - [`records`]: patient repository and medicine catalog
//! - [`models`]: domain types (Patient, Checkup, Medicine) and age display
//! - [`session`]: command interface owning the store lifecycle
//! - [`config`], [`logging`], [`bootstrap`]: process setup

pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod models;
pub mod records;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::ClinicConfig;
pub use models::{
    describe_age, AgeSpan, BirthMonth, Checkup, Medicine, MedicineRef, Patient, PatientFields,
    DEFAULT_MEDICINES,
};
pub use records::{MedicineBatch, MedicineCatalog, PatientRepository, RecordError, UpsertOutcome};
pub use session::Clinic;
pub use store::{CollectionSpec, LocalStore, StoreError, StoreOptions, StoreState};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Index {index} out of range for {len} records")]
    IndexOutOfRange { index: u32, len: u32 },

    #[error("Store is not open yet")]
    NotReady,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<RecordError> for ClinicError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::StorageUnavailable(msg) => ClinicError::StorageUnavailable(msg),
            RecordError::Validation(msg) => ClinicError::Validation(msg),
            RecordError::Duplicate(name) => ClinicError::Duplicate(name),
            RecordError::IndexOutOfRange { index, len } => ClinicError::IndexOutOfRange {
                index: index as u32,
                len: len as u32,
            },
            RecordError::NotReady => ClinicError::NotReady,
            RecordError::Storage(err) => ClinicError::Storage(err.to_string()),
        }
    }
}

impl From<models::BirthMonthError> for ClinicError {
    fn from(e: models::BirthMonthError) -> Self {
        ClinicError::Validation(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Storage(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a clinic store at the given path with default settings.
#[uniffi::export]
pub fn open_clinic(path: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let mut config = ClinicConfig::default();
    config.storage.database_path = Some(path.into());
    let clinic = Clinic::open(&config.store_options())?;
    Ok(ClinicCore::wrap(clinic))
}

/// Create an in-memory clinic store (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory() -> Result<Arc<ClinicCore>, ClinicError> {
    let mut config = ClinicConfig::default();
    config.storage.in_memory = true;
    let clinic = Clinic::open(&config.store_options())?;
    Ok(ClinicCore::wrap(clinic))
}

/// Start from a config file (or the default location), initializing logging.
#[uniffi::export]
pub fn open_clinic_with_config(config_path: Option<String>) -> Result<Arc<ClinicCore>, ClinicError> {
    let clinic = bootstrap::start_from(config_path.map(Into::into))
        .map_err(|e| ClinicError::Config(format!("{e:#}")))?;
    Ok(ClinicCore::wrap(clinic))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe session wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    session: Mutex<Clinic>,
}

impl ClinicCore {
    fn wrap(clinic: Clinic) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(clinic),
        })
    }
}

#[uniffi::export]
impl ClinicCore {
    /// Whether the store has finished opening.
    pub fn is_ready(&self) -> Result<bool, ClinicError> {
        Ok(self.session.lock()?.is_ready())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// All patients, insertion order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session.patients().iter().map(FfiPatient::from).collect())
    }

    /// Patients whose name contains `query`, case-insensitive.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session
            .search_patients(&query)
            .into_iter()
            .map(FfiPatient::from)
            .collect())
    }

    /// Get a patient by name, case-insensitive.
    pub fn find_patient(&self, name: String) -> Result<Option<FfiPatient>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session.find_patient(&name).map(FfiPatient::from))
    }

    /// Add a checkup, creating the patient when the name is new.
    pub fn record_checkup(
        &self,
        fields: FfiPatientFields,
        checkup: FfiCheckup,
    ) -> Result<FfiUpsertResult, ClinicError> {
        let mut session = self.session.lock()?;
        let existing = session.find_patient(fields.name.trim()).is_some();
        let fields = fields.into_patient_fields(existing)?;
        let checkup: Checkup = checkup.into();
        let outcome = session.record_checkup(&fields, &checkup)?;
        Ok(outcome.into())
    }

    /// Delete the patient at `index` of [`ClinicCore::list_patients`].
    pub fn delete_patient(&self, index: u32) -> Result<FfiPatient, ClinicError> {
        let mut session = self.session.lock()?;
        let removed = session.delete_patient(index as usize)?;
        Ok(FfiPatient::from(&removed))
    }

    /// Checkup of a patient on a given visit date.
    pub fn checkup_on(&self, name: String, date: String) -> Result<Option<FfiCheckup>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session
            .find_patient(&name)
            .and_then(|p| p.checkup_on(&date))
            .map(FfiCheckup::from))
    }

    // =========================================================================
    // Medicine Operations
    // =========================================================================

    /// All catalog medicine names.
    pub fn list_medicines(&self) -> Result<Vec<String>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session.medicines().iter().map(|m| m.name.clone()).collect())
    }

    /// Catalog names containing `query`, case-insensitive.
    pub fn filter_medicines(&self, query: String) -> Result<Vec<String>, ClinicError> {
        let session = self.session.lock()?;
        Ok(session
            .filter_medicines(&query)
            .into_iter()
            .map(|m| m.name.clone())
            .collect())
    }

    /// Add one medicine; fails if the name exists in any case.
    pub fn add_medicine(&self, name: String) -> Result<String, ClinicError> {
        let mut session = self.session.lock()?;
        Ok(session.add_medicine(&name)?.name)
    }

    /// Add a comma separated list of medicines.
    pub fn add_medicines(&self, list: String) -> Result<FfiMedicineBatch, ClinicError> {
        let mut session = self.session.lock()?;
        let batch = session.add_medicines(&list)?;
        Ok(FfiMedicineBatch {
            added: batch.added.into_iter().map(|m| m.name).collect(),
            duplicates: batch.duplicates,
        })
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub name: String,
    pub gender: String,
    pub year_of_birth: i32,
    /// 0-based
    pub month_of_birth: u32,
    pub nationality: String,
    /// Display age as of today
    pub age: Option<String>,
    pub checkups: Vec<FfiCheckup>,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            gender: patient.gender.clone(),
            year_of_birth: patient.year_of_birth,
            month_of_birth: patient.month_of_birth,
            nationality: patient.nationality.clone(),
            age: patient.age_on(chrono::Local::now().date_naive()),
            checkups: patient.checkups.iter().map(FfiCheckup::from).collect(),
        }
    }
}

/// FFI-safe checkup.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCheckup {
    pub date: String,
    pub notes: String,
    pub notes2: String,
    pub weight: String,
    pub medicines: Vec<String>,
}

impl From<&Checkup> for FfiCheckup {
    fn from(checkup: &Checkup) -> Self {
        Self {
            date: checkup.date.clone(),
            notes: checkup.notes.clone(),
            notes2: checkup.notes2.clone(),
            weight: checkup.weight.clone(),
            medicines: checkup.medicine_names().map(str::to_string).collect(),
        }
    }
}

impl From<FfiCheckup> for Checkup {
    fn from(checkup: FfiCheckup) -> Self {
        Checkup {
            date: checkup.date,
            notes: checkup.notes,
            notes2: checkup.notes2,
            weight: checkup.weight,
            medicines: checkup.medicines.into_iter().map(MedicineRef::new).collect(),
        }
    }
}

/// FFI-safe patient fields. `birth` is entered as `YYYY/MM`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientFields {
    pub name: String,
    pub gender: Option<String>,
    pub birth: Option<String>,
    pub nationality: Option<String>,
}

impl FfiPatientFields {
    /// Convert for an upsert. Birth text is only parsed when the patient
    /// would be created; an existing patient ignores it.
    fn into_patient_fields(self, existing: bool) -> Result<PatientFields, ClinicError> {
        let birth = if existing {
            None
        } else {
            self.birth
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(BirthMonth::parse)
                .transpose()?
        };
        Ok(PatientFields {
            name: self.name,
            gender: self.gender,
            birth,
            nationality: self.nationality,
        })
    }
}

/// FFI-safe upsert result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUpsertResult {
    /// True when a new patient was created
    pub created: bool,
    pub index: u32,
}

impl From<UpsertOutcome> for FfiUpsertResult {
    fn from(outcome: UpsertOutcome) -> Self {
        Self {
            created: matches!(outcome, UpsertOutcome::Created { .. }),
            index: outcome.index() as u32,
        }
    }
}

/// FFI-safe medicine batch result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicineBatch {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_patient_fields(name: &str) -> FfiPatientFields {
        FfiPatientFields {
            name: name.into(),
            gender: Some("Female".into()),
            birth: Some("1990/05".into()),
            nationality: Some("Dutch".into()),
        }
    }

    fn checkup(date: &str) -> FfiCheckup {
        FfiCheckup {
            date: date.into(),
            notes: "cough".into(),
            notes2: "bronchitis".into(),
            weight: "61".into(),
            medicines: vec!["Amoxicillin".into()],
        }
    }

    #[test]
    fn test_record_and_list() {
        let core = open_clinic_in_memory().unwrap();
        assert!(core.is_ready().unwrap());

        let result = core
            .record_checkup(new_patient_fields("Alice"), checkup("2024-01-10"))
            .unwrap();
        assert!(result.created);
        assert_eq!(result.index, 0);

        let patients = core.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].month_of_birth, 4);
        assert!(patients[0].age.is_some());

        let visit = core
            .checkup_on("alice".into(), "2024-01-10".into())
            .unwrap()
            .unwrap();
        assert_eq!(visit.notes2, "bronchitis");
        assert_eq!(visit.medicines, vec!["Amoxicillin"]);
    }

    #[test]
    fn test_bad_birth_input_is_validation_error() {
        let core = open_clinic_in_memory().unwrap();
        let mut fields = new_patient_fields("Alice");
        fields.birth = Some("05/1990".into());

        let result = core.record_checkup(fields, checkup("2024-01-10"));
        assert!(matches!(result, Err(ClinicError::Validation(_))));
        assert!(core.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_existing_patient_ignores_bad_birth_input() {
        let core = open_clinic_in_memory().unwrap();
        core.record_checkup(new_patient_fields("Alice"), checkup("2024-01-10"))
            .unwrap();

        let fields = FfiPatientFields {
            name: "alice".into(),
            gender: None,
            birth: Some("05/1990".into()),
            nationality: None,
        };
        let result = core.record_checkup(fields, checkup("2024-02-10")).unwrap();
        assert!(!result.created);
        assert_eq!(result.index, 0);

        let patients = core.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].month_of_birth, 4);
        let dates: Vec<_> = patients[0].checkups.iter().map(|c| c.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-02-10", "2024-01-10"]);
    }

    #[test]
    fn test_error_mapping() {
        let core = open_clinic_in_memory().unwrap();

        assert!(matches!(
            core.delete_patient(3),
            Err(ClinicError::IndexOutOfRange { index: 3, len: 0 })
        ));
        assert!(matches!(
            core.add_medicine("ASPIRIN".into()),
            Err(ClinicError::Duplicate(_))
        ));
    }

    #[test]
    fn test_add_medicines_batch() {
        let core = open_clinic_in_memory().unwrap();
        let batch = core.add_medicines("Zinc, aspirin".into()).unwrap();
        assert_eq!(batch.added, vec!["Zinc"]);
        assert_eq!(batch.duplicates, vec!["aspirin"]);
        assert_eq!(core.filter_medicines("zin".into()).unwrap(), vec!["Zinc"]);
    }
}
