//! Patient repository.

use log::{error, info, warn};

use super::{RecordError, RecordResult, PATIENTS};
use crate::models::{Checkup, Patient, PatientFields};
use crate::store::{LocalStore, StoreResult, StoreState};

/// Result of recording a checkup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Checkup prepended to an existing patient
    Updated { index: usize },
    /// New patient appended
    Created { index: usize },
}

impl UpsertOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Updated { index } | Self::Created { index } => *index,
        }
    }
}

/// In-memory patient list, mirrored to the `patients` collection.
#[derive(Debug, Default)]
pub struct PatientRepository {
    patients: Vec<Patient>,
}

impl PatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the list from the persisted collection.
    pub fn load(store: &LocalStore) -> StoreResult<Self> {
        let patients: Vec<Patient> = store.get_all(PATIENTS)?;
        info!(
            "event=patients_load module=records status=ok count={}",
            patients.len()
        );
        Ok(Self { patients })
    }

    /// All patients, insertion order.
    pub fn all(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Patient> {
        self.patients.get(index)
    }

    /// Case-insensitive exact name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Patient> {
        self.position_of(name).map(|index| &self.patients[index])
    }

    /// Patients whose name contains `substring`, case-insensitive.
    pub fn search(&self, substring: &str) -> Vec<&Patient> {
        let needle = substring.to_lowercase();
        self.patients
            .iter()
            .filter(|p| p.name_contains_lowered(&needle))
            .collect()
    }

    /// Record a checkup, creating the patient if needed.
    ///
    /// An existing patient (matched by name, case-insensitive) gets the
    /// checkup prepended. Otherwise a new patient is appended, which needs
    /// gender, birth month and nationality.
    pub fn upsert_checkup(
        &mut self,
        store: &mut StoreState,
        fields: &PatientFields,
        checkup: &Checkup,
    ) -> RecordResult<UpsertOutcome> {
        if !store.is_open() {
            warn!("event=patient_upsert module=records status=rejected reason=store_closed");
            return Err(RecordError::NotReady);
        }

        let name = fields.trimmed_name();
        if name.is_empty() {
            return Err(RecordError::Validation("patient name is required".into()));
        }
        if !checkup.has_date() {
            return Err(RecordError::Validation("checkup date is required".into()));
        }

        let outcome = match self.position_of(name) {
            Some(index) => {
                self.patients[index].checkups.insert(0, checkup.clone());
                UpsertOutcome::Updated { index }
            }
            None => {
                let patient = fields.to_new_patient(checkup.clone()).ok_or_else(|| {
                    RecordError::Validation(format!(
                        "missing required fields: {}",
                        fields.missing_for_new_patient().join(", ")
                    ))
                })?;
                self.patients.push(patient);
                UpsertOutcome::Created {
                    index: self.patients.len() - 1,
                }
            }
        };

        self.persist(store);
        Ok(outcome)
    }

    /// Remove the patient at `index`.
    pub fn delete_at(&mut self, store: &mut StoreState, index: usize) -> RecordResult<Patient> {
        if !store.is_open() {
            warn!("event=patient_delete module=records status=rejected reason=store_closed");
            return Err(RecordError::NotReady);
        }
        if index >= self.patients.len() {
            return Err(RecordError::IndexOutOfRange {
                index,
                len: self.patients.len(),
            });
        }

        let removed = self.patients.remove(index);
        self.persist(store);
        Ok(removed)
    }

    /// Write the full list to the store.
    ///
    /// Failures are logged only; the in-memory list stays as it is.
    pub fn persist(&self, store: &mut StoreState) -> bool {
        let result = store
            .store_mut()
            .and_then(|s| s.put_all(PATIENTS, &self.patients));
        match result {
            Ok(()) => {
                info!(
                    "event=patients_save module=records status=ok count={}",
                    self.patients.len()
                );
                true
            }
            Err(err) => {
                error!("event=patients_save module=records status=error error={err}");
                false
            }
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.patients.iter().position(|p| p.matches_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BirthMonth, DEFAULT_MEDICINES};
    use crate::records::clinic_collections;

    fn open_state() -> StoreState {
        let store =
            LocalStore::open_in_memory("patientDB", 4, &clinic_collections(DEFAULT_MEDICINES))
                .unwrap();
        StoreState::Open(store)
    }

    fn alice() -> PatientFields {
        PatientFields::new_patient("Alice", "Female", BirthMonth::new(1990, 4).unwrap(), "Dutch")
    }

    #[test]
    fn test_create_then_find_case_insensitive() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();

        let outcome = repo
            .upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"))
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created { index: 0 });
        let found = repo.find_by_name("alice").unwrap();
        assert_eq!(found.name, "Alice");
        assert_eq!(found.checkups.len(), 1);
    }

    #[test]
    fn test_second_checkup_is_prepended() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        repo.upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"))
            .unwrap();

        let outcome = repo
            .upsert_checkup(
                &mut state,
                &PatientFields::existing("ALICE"),
                &Checkup::new("2024-02-20"),
            )
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated { index: 0 });
        let patient = repo.find_by_name("Alice").unwrap();
        assert_eq!(patient.checkups[0].date, "2024-02-20");
        assert_eq!(patient.checkups[1].date, "2024-01-10");
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_new_patient_missing_nationality() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        let mut fields = alice();
        fields.nationality = None;

        let result = repo.upsert_checkup(&mut state, &fields, &Checkup::new("2024-01-10"));

        match result {
            Err(RecordError::Validation(message)) => assert!(message.contains("nationality")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(repo.is_empty());
    }

    #[test]
    fn test_name_and_date_required() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();

        let mut blank_name = alice();
        blank_name.name = "   ".into();
        assert!(matches!(
            repo.upsert_checkup(&mut state, &blank_name, &Checkup::new("2024-01-10")),
            Err(RecordError::Validation(_))
        ));
        assert!(matches!(
            repo.upsert_checkup(&mut state, &alice(), &Checkup::new("")),
            Err(RecordError::Validation(_))
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        repo.upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"))
            .unwrap();

        let result = repo.delete_at(&mut state, 1);
        assert!(matches!(
            result,
            Err(RecordError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_delete_persists() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        repo.upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"))
            .unwrap();

        let removed = repo.delete_at(&mut state, 0).unwrap();
        assert_eq!(removed.name, "Alice");

        let reloaded = PatientRepository::load(state.store().unwrap()).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_search_substring() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        for name in ["Maxine", "Luna", "max"] {
            let mut fields = alice();
            fields.name = name.into();
            repo.upsert_checkup(&mut state, &fields, &Checkup::new("2024-01-10"))
                .unwrap();
        }

        let names: Vec<_> = repo.search("MAX").iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Maxine", "max"]);
        assert_eq!(repo.search("").len(), 3);
    }

    #[test]
    fn test_closed_store_rejects_mutation() {
        let mut state = StoreState::Closed;
        let mut repo = PatientRepository::new();

        let result = repo.upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"));
        assert!(matches!(result, Err(RecordError::NotReady)));
        assert!(matches!(repo.delete_at(&mut state, 0), Err(RecordError::NotReady)));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_persist_failure_keeps_memory() {
        let mut state = open_state();
        let mut repo = PatientRepository::new();
        repo.upsert_checkup(&mut state, &alice(), &Checkup::new("2024-01-10"))
            .unwrap();

        // Break the backing table so the snapshot write fails.
        state
            .store()
            .unwrap()
            .conn()
            .execute_batch("DROP TABLE collection_patients;")
            .unwrap();

        let outcome = repo.upsert_checkup(
            &mut state,
            &PatientFields::existing("alice"),
            &Checkup::new("2024-03-01"),
        );
        assert!(outcome.is_ok());
        assert_eq!(repo.find_by_name("alice").unwrap().checkups.len(), 2);
    }
}
