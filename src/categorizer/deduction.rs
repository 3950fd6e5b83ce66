//! Deductibility lookup
//!
//! The category → deductible share table is owned elsewhere; the categorizer
//! only asks it about the category it predicted.

use std::collections::{BTreeMap, HashMap};

/// Share of an expense in `category` that is tax deductible, in percent
pub trait DeductionRules: Send + Sync {
    fn deductible_percent(&self, category: &str) -> Option<f64>;
}

impl DeductionRules for HashMap<String, f64> {
    fn deductible_percent(&self, category: &str) -> Option<f64> {
        self.get(category).copied()
    }
}

impl DeductionRules for BTreeMap<String, f64> {
    fn deductible_percent(&self, category: &str) -> Option<f64> {
        self.get(category).copied()
    }
}
