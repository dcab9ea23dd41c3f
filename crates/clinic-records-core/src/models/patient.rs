//! Patient models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{describe_age, Checkup};

/// Earliest accepted birth year.
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// A patient record.
///
/// `name` is the identifying key. Lookups compare names case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Patient name (key)
    pub name: String,
    /// Gender as entered (e.g. "Male", "Female")
    pub gender: String,
    /// Birth year
    pub year_of_birth: i32,
    /// Birth month, 0-based (0 = January)
    pub month_of_birth: u32,
    /// Nationality
    pub nationality: String,
    /// Checkup history, newest first
    #[serde(default)]
    pub checkups: Vec<Checkup>,
}

impl Patient {
    /// Birth year and month of this patient.
    pub fn birth(&self) -> BirthMonth {
        BirthMonth {
            year: self.year_of_birth,
            month0: self.month_of_birth,
        }
    }

    /// Case-insensitive exact name match.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Case-insensitive substring match on the name.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn name_contains_lowered(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
    }

    /// First checkup recorded for the given visit date.
    pub fn checkup_on(&self, date: &str) -> Option<&Checkup> {
        self.checkups.iter().find(|c| c.date == date)
    }

    /// Most recently recorded checkup.
    pub fn latest_checkup(&self) -> Option<&Checkup> {
        self.checkups.first()
    }

    /// Display age on the given day; `None` if born after it.
    pub fn age_on(&self, today: NaiveDate) -> Option<String> {
        describe_age(today, self.year_of_birth, self.month_of_birth)
    }
}

/// Birth year and 0-based month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthMonth {
    pub year: i32,
    /// 0-based month (0 = January)
    pub month0: u32,
}

/// Birth month input errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BirthMonthError {
    #[error("birth date must be YYYY/MM, got `{0}`")]
    Malformed(String),

    #[error("birth year {year} must be between {min} and {max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("birth month {0} must be between 1 and 12")]
    MonthOutOfRange(u32),
}

impl BirthMonth {
    /// Build from a year and a 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, BirthMonthError> {
        if !(1..=12).contains(&month) {
            return Err(BirthMonthError::MonthOutOfRange(month));
        }
        Ok(Self {
            year,
            month0: month - 1,
        })
    }

    /// Parse `YYYY/MM` input against the current calendar year.
    pub fn parse(input: &str) -> Result<Self, BirthMonthError> {
        Self::parse_with_current_year(input, chrono::Local::now().year())
    }

    /// Parse `YYYY/MM` input (1-based month), rejecting years outside
    /// `MIN_BIRTH_YEAR..=current_year`.
    pub fn parse_with_current_year(input: &str, current_year: i32) -> Result<Self, BirthMonthError> {
        let malformed = || BirthMonthError::Malformed(input.to_string());

        let (year_str, month_str) = input.trim().split_once('/').ok_or_else(malformed)?;
        let year: i32 = year_str.trim().parse().map_err(|_| malformed())?;
        let month: u32 = month_str.trim().parse().map_err(|_| malformed())?;

        if year < MIN_BIRTH_YEAR || year > current_year {
            return Err(BirthMonthError::YearOutOfRange {
                year,
                min: MIN_BIRTH_YEAR,
                max: current_year,
            });
        }
        Self::new(year, month)
    }
}

/// Patient-identifying fields submitted alongside a checkup.
///
/// For an existing patient only `name` matters. A new patient also needs
/// gender, birth month and nationality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientFields {
    pub name: String,
    pub gender: Option<String>,
    pub birth: Option<BirthMonth>,
    pub nationality: Option<String>,
}

impl PatientFields {
    /// Fields that identify an existing patient by name only.
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Complete fields for a new patient.
    pub fn new_patient(
        name: impl Into<String>,
        gender: impl Into<String>,
        birth: BirthMonth,
        nationality: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gender: Some(gender.into()),
            birth: Some(birth),
            nationality: Some(nationality.into()),
        }
    }

    /// Trimmed patient name.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }

    /// Names of the fields a new patient still lacks.
    pub fn missing_for_new_patient(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_blank(&self.gender).is_none() {
            missing.push("gender");
        }
        if self.birth.is_none() {
            missing.push("birth");
        }
        if non_blank(&self.nationality).is_none() {
            missing.push("nationality");
        }
        missing
    }

    /// Build a new patient holding a single checkup, if all fields are present.
    pub(crate) fn to_new_patient(&self, checkup: Checkup) -> Option<Patient> {
        let gender = non_blank(&self.gender)?;
        let birth = self.birth?;
        let nationality = non_blank(&self.nationality)?;
        Some(Patient {
            name: self.trimmed_name().to_string(),
            gender: gender.to_string(),
            year_of_birth: birth.year,
            month_of_birth: birth.month0,
            nationality: nationality.to_string(),
            checkups: vec![checkup],
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
