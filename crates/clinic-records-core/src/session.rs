//! Clinic session: the command interface over store and repositories.
//!
//! A session starts `Closed`. Once a store open completes it loads both
//! collections and becomes `Open`. Mutating commands issued while closed are
//! rejected with [`RecordError::NotReady`]; reads see empty lists.

use log::{error, info};

use crate::models::{Checkup, Medicine, Patient, PatientFields};
use crate::records::{
    MedicineBatch, MedicineCatalog, PatientRepository, RecordError, RecordResult, UpsertOutcome,
};
use crate::store::{LocalStore, PendingOpen, StoreOptions, StoreResult, StoreState};

/// Session owning the store lifecycle and both repositories.
#[derive(Debug, Default)]
pub struct Clinic {
    store: StoreState,
    patients: PatientRepository,
    medicines: MedicineCatalog,
}

impl Clinic {
    /// A closed session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store synchronously and load it.
    pub fn open(options: &StoreOptions) -> RecordResult<Self> {
        let mut clinic = Self::new();
        clinic.complete_open(options.open())?;
        Ok(clinic)
    }

    /// Start a background open; feed the result to [`Clinic::complete_open`].
    pub fn begin_open(options: StoreOptions) -> (Self, PendingOpen) {
        (Self::new(), options.open_in_background())
    }

    /// Handle the open-completion signal.
    ///
    /// On failure the session stays closed and the error is logged.
    pub fn complete_open(&mut self, result: StoreResult<LocalStore>) -> RecordResult<()> {
        let store = result.map_err(|err| {
            error!("event=clinic_open module=session status=error error={err}");
            RecordError::StorageUnavailable(err.to_string())
        })?;

        let loaded = PatientRepository::load(&store)
            .and_then(|patients| MedicineCatalog::load(&store).map(|medicines| (patients, medicines)));
        let (patients, medicines) = loaded.map_err(|err| {
            error!("event=clinic_open module=session status=error error_code=load_failed error={err}");
            RecordError::StorageUnavailable(err.to_string())
        })?;

        info!(
            "event=clinic_open module=session status=ok patients={} medicines={}",
            patients.len(),
            medicines.len()
        );
        self.patients = patients;
        self.medicines = medicines;
        self.store = StoreState::Open(store);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_open()
    }

    // =========================================================================
    // Patients
    // =========================================================================

    pub fn patients(&self) -> &[Patient] {
        self.patients.all()
    }

    pub fn patient(&self, index: usize) -> Option<&Patient> {
        self.patients.get(index)
    }

    pub fn find_patient(&self, name: &str) -> Option<&Patient> {
        self.patients.find_by_name(name)
    }

    pub fn search_patients(&self, substring: &str) -> Vec<&Patient> {
        self.patients.search(substring)
    }

    /// Add a checkup, creating the patient when the name is new.
    pub fn record_checkup(
        &mut self,
        fields: &PatientFields,
        checkup: &Checkup,
    ) -> RecordResult<UpsertOutcome> {
        self.patients.upsert_checkup(&mut self.store, fields, checkup)
    }

    pub fn delete_patient(&mut self, index: usize) -> RecordResult<Patient> {
        self.patients.delete_at(&mut self.store, index)
    }

    // =========================================================================
    // Medicines
    // =========================================================================

    pub fn medicines(&self) -> &[Medicine] {
        self.medicines.all()
    }

    pub fn filter_medicines(&self, substring: &str) -> Vec<&Medicine> {
        self.medicines.filter(substring)
    }

    pub fn add_medicine(&mut self, name: &str) -> RecordResult<Medicine> {
        self.medicines.add_if_absent(&self.store, name)
    }

    pub fn add_medicines(&mut self, list: &str) -> RecordResult<MedicineBatch> {
        self.medicines.add_list(&self.store, list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BirthMonth, DEFAULT_MEDICINES};
    use crate::records::clinic_collections;
    use crate::store::StoreError;

    fn options() -> StoreOptions {
        StoreOptions {
            path: None,
            name: "patientDB".into(),
            version: 4,
            collections: clinic_collections(DEFAULT_MEDICINES),
        }
    }

    #[test]
    fn test_closed_session() {
        let mut clinic = Clinic::new();
        assert!(!clinic.is_ready());
        assert!(clinic.patients().is_empty());
        assert!(clinic.medicines().is_empty());

        let fields = PatientFields::new_patient("Bob", "Male", BirthMonth::new(2000, 1).unwrap(), "Irish");
        let result = clinic.record_checkup(&fields, &Checkup::new("2024-01-01"));
        assert!(matches!(result, Err(RecordError::NotReady)));
        assert!(matches!(clinic.add_medicine("Zinc"), Err(RecordError::NotReady)));
    }

    #[test]
    fn test_background_open_then_commands() {
        let (mut clinic, pending) = Clinic::begin_open(options());
        assert!(!clinic.is_ready());

        clinic.complete_open(pending.wait()).unwrap();
        assert!(clinic.is_ready());
        assert_eq!(clinic.medicines().len(), DEFAULT_MEDICINES.len());

        let fields = PatientFields::new_patient("Bob", "Male", BirthMonth::new(2000, 1).unwrap(), "Irish");
        clinic
            .record_checkup(&fields, &Checkup::new("2024-01-01").with_medicines(["Aspirin"]))
            .unwrap();
        assert_eq!(clinic.find_patient("bob").unwrap().checkups[0].medicines[0].name, "Aspirin");
    }

    #[test]
    fn test_failed_open_stays_closed() {
        let mut clinic = Clinic::new();
        let result = clinic.complete_open(Err(StoreError::OpenAborted("disk gone".into())));

        assert!(matches!(result, Err(RecordError::StorageUnavailable(_))));
        assert!(!clinic.is_ready());
    }
}
