//! Domain models for clinic records.

mod age;
mod checkup;
mod medicine;
mod patient;

pub use age::*;
pub use checkup::*;
pub use medicine::*;
pub use patient::*;
