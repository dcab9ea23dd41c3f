//! Display age derived from a birth year and month.

use chrono::{Datelike, NaiveDate};

/// Below this many whole years the month component is shown.
const MONTH_DETAIL_YEARS: i32 = 3;

/// Whole years and remaining months between a birth month and today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeSpan {
    pub years: i32,
    pub months: i32,
}

impl AgeSpan {
    /// Elapsed time from (`year_of_birth`, `month_of_birth` 0-based) to today.
    ///
    /// Days are ignored. Returns `None` when the birth month is after today
    /// or the stored birth year and month are out of range.
    pub fn between(today: NaiveDate, year_of_birth: i32, month_of_birth: u32) -> Option<Self> {
        if month_of_birth > 11 {
            return None;
        }
        let mut years = today.year().checked_sub(year_of_birth)?;
        let mut months = today.month0() as i32 - month_of_birth as i32;
        if months < 0 {
            years -= 1;
            months += 12;
        }
        if years < 0 {
            return None;
        }
        Some(Self { years, months })
    }

    /// Render as shown on a patient card.
    ///
    /// Exactly three years and beyond drop the month component.
    pub fn render(&self) -> String {
        if self.years >= MONTH_DETAIL_YEARS {
            return format!("{} years", self.years);
        }
        if self.years == 0 {
            return format!("{} months", self.months);
        }
        format!(
            "{} year{} and {} month{}",
            self.years,
            if self.years > 1 { "s" } else { "" },
            self.months,
            if self.months != 1 { "s" } else { "" },
        )
    }
}

/// Display age for a stored birth month on the given day.
pub fn describe_age(today: NaiveDate, year_of_birth: i32, month_of_birth: u32) -> Option<String> {
    AgeSpan::between(today, year_of_birth, month_of_birth).map(|span| span.render())
}
