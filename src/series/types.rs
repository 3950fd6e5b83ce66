//! Core series type

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dated numeric amount
///
/// The unit is whatever the caller chose (dollars, miles, hours). Several
/// observations may share a date; they are summed when a series is built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Calendar day of the observation
    pub date: NaiveDate,
    /// Observed value
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}
