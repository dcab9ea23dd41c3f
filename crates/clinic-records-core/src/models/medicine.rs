//! Medicine catalog models.

use serde::{Deserialize, Serialize};

/// Medicines seeded into a freshly created catalog.
pub const DEFAULT_MEDICINES: &[&str] = &[
    "Aspirin",
    "Ibuprofen",
    "Paracetamol",
    "Amoxicillin",
    "Metformin",
    "Amlodipine",
];

/// A single catalog entry. `name` is the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medicine {
    pub name: String,
}

impl Medicine {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_named() {
        let medicine = Medicine::new("Aspirin");
        assert!(medicine.is_named("aspirin"));
        assert!(medicine.is_named("ASPIRIN"));
        assert!(!medicine.is_named("aspirin 100mg"));
    }
}
