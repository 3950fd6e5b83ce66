//! Date/Series Utilities
//!
//! Turns sparse, timestamped observations into the contiguous daily series
//! the trend analyzer works on:
//!
//! - **types**: `Observation`, a dated numeric value
//! - **dates**: calendar helpers (start-of-day, add-days, weekday-of)
//! - **daily**: per-day aggregation and gap filling
//!
//! All calendar logic is UTC/naive-date based so results never depend on the
//! host locale or time zone.

pub mod daily;
pub mod dates;
pub mod types;

pub use daily::{aggregate_daily, daily_totals, fill_gaps};
pub use dates::{add_days, days_between, start_of_day, weekday_of};
pub use types::Observation;
