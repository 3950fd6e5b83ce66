//! Learned model state
//!
//! The categorizer's entire memory: token statistics per category, document
//! frequencies, vocabulary and running amount statistics. This is also the
//! persisted record, so every field defaults when absent to let older files
//! load after new fields are added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current persisted schema version
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Minimum examples before the model makes predictions
pub const MIN_TRAINED_EXAMPLES: u64 = 10;

/// Running mean and spread of amounts via Welford's algorithm
///
/// No history is stored; each amount updates the statistics in O(1) with
/// good numerical stability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AmountStats {
    pub count: u64,
    pub mean: f64,
    /// Sum of squared deviations from the running mean
    pub m2: f64,
}

impl AmountStats {
    pub fn push(&mut self, amount: f64) {
        self.count += 1;
        let delta = amount - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (amount - self.mean);
    }

    /// Population variance (0 with no observations)
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Everything the categorizer has learned
///
/// Invariant: `total_examples` equals the sum of `category_doc_counts`, and
/// counts only grow until an explicit [`LearnedModel::reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearnedModel {
    pub version: u32,
    /// category → token → occurrences
    pub category_token_counts: BTreeMap<String, BTreeMap<String, u64>>,
    /// category → training examples seen
    pub category_doc_counts: BTreeMap<String, u64>,
    /// token → number of categories containing it
    pub document_frequency: BTreeMap<String, u64>,
    pub vocabulary: BTreeSet<String>,
    pub total_examples: u64,
    pub amount_stats: BTreeMap<String, AmountStats>,
    /// Self-consistency accuracy from the last estimate
    pub last_accuracy: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LearnedModel {
    pub fn new() -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            ..Default::default()
        }
    }

    /// Fold one labeled example into the model
    ///
    /// Non-finite amounts are ignored for the amount statistics; the tokens
    /// and document count are still recorded.
    pub fn record(&mut self, tokens: &[String], category: &str, amount: f64) {
        *self
            .category_doc_counts
            .entry(category.to_string())
            .or_insert(0) += 1;
        self.total_examples += 1;

        let counts = self
            .category_token_counts
            .entry(category.to_string())
            .or_default();
        for token in tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
            self.vocabulary.insert(token.clone());
        }

        let touched: BTreeSet<&String> = tokens.iter().collect();
        for token in touched {
            let containing = self
                .category_token_counts
                .values()
                .filter(|counts| counts.contains_key(token))
                .count() as u64;
            self.document_frequency.insert(token.clone(), containing);
        }

        if amount.is_finite() {
            self.amount_stats
                .entry(category.to_string())
                .or_default()
                .push(amount);
        }

        self.updated_at = Some(Utc::now());
    }

    /// Drop everything learned
    pub fn reset(&mut self) {
        *self = Self::new();
        self.updated_at = Some(Utc::now());
    }

    pub fn is_trained(&self) -> bool {
        self.total_examples >= MIN_TRAINED_EXAMPLES
    }

    pub fn category_count(&self) -> usize {
        self.category_doc_counts.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category_doc_counts.keys().map(String::as_str)
    }

    /// Prior probability of a category (share of all examples)
    pub fn prior(&self, category: &str) -> f64 {
        if self.total_examples == 0 {
            return 0.0;
        }
        self.category_doc_counts.get(category).copied().unwrap_or(0) as f64
            / self.total_examples as f64
    }

    pub fn token_count(&self, category: &str, token: &str) -> u64 {
        self.category_token_counts
            .get(category)
            .and_then(|counts| counts.get(token))
            .copied()
            .unwrap_or(0)
    }

    /// Total token occurrences recorded for a category
    pub fn total_tokens(&self, category: &str) -> u64 {
        self.category_token_counts
            .get(category)
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    /// Number of categories containing `token`, defaulting to 1 when unseen
    pub fn doc_frequency(&self, token: &str) -> u64 {
        self.document_frequency
            .get(token)
            .copied()
            .filter(|&df| df > 0)
            .unwrap_or(1)
    }

    /// Most frequent tokens of a category, ties broken alphabetically
    pub fn top_tokens(&self, category: &str, limit: usize) -> Vec<&str> {
        let Some(counts) = self.category_token_counts.get(category) else {
            return Vec::new();
        };

        let mut ranked: Vec<(&String, &u64)> = counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(token, _)| token.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_welford_matches_two_pass() {
        let amounts = [12.5, 40.0, 38.25, 55.1, 9.99, 41.0, 1000.0, 0.5, 38.0];
        let mut stats = AmountStats::default();
        for a in amounts {
            stats.push(a);
        }

        let n = amounts.len() as f64;
        let mean = amounts.iter().sum::<f64>() / n;
        let var = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;

        assert_eq!(stats.count, amounts.len() as u64);
        assert!((stats.mean - mean).abs() < 1e-9);
        assert!((stats.std_dev() - var.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_welford_large_offset_is_stable() {
        let mut stats = AmountStats::default();
        for a in [1e9 + 4.0, 1e9 + 7.0, 1e9 + 13.0, 1e9 + 16.0] {
            stats.push(a);
        }
        assert!((stats.variance() - 22.5).abs() < 1e-6);
    }

    #[test]
    fn test_amount_stats_empty() {
        let stats = AmountStats::default();
        assert_eq!(stats.variance(), 0.0);
        assert_eq!(stats.std_dev(), 0.0);
    }

    #[test]
    fn test_record_updates_counts() {
        let mut model = LearnedModel::new();
        model.record(&tokens(&["shell", "gas", "gas"]), "Gas", 40.0);
        model.record(&tokens(&["kroger", "grocery"]), "Groceries", 80.0);
        model.record(&tokens(&["gas", "station"]), "Gas", 35.0);

        assert_eq!(model.total_examples, 3);
        assert_eq!(model.category_doc_counts["Gas"], 2);
        assert_eq!(model.token_count("Gas", "gas"), 3);
        assert_eq!(model.total_tokens("Gas"), 5);
        assert_eq!(model.vocabulary.len(), 5);
        assert_eq!(model.document_frequency["gas"], 1);
        assert_eq!(model.amount_stats["Gas"].count, 2);
        assert!((model.prior("Gas") - 2.0 / 3.0).abs() < 1e-12);

        let sum: u64 = model.category_doc_counts.values().sum();
        assert_eq!(sum, model.total_examples);
    }

    #[test]
    fn test_document_frequency_counts_categories() {
        let mut model = LearnedModel::new();
        model.record(&tokens(&["station"]), "Gas", 40.0);
        model.record(&tokens(&["station"]), "Transit", 3.0);
        model.record(&tokens(&["station"]), "Gas", 41.0);
        assert_eq!(model.document_frequency["station"], 2);
        assert_eq!(model.doc_frequency("station"), 2);
        assert_eq!(model.doc_frequency("unseen"), 1);
    }

    #[test]
    fn test_non_finite_amount_skipped() {
        let mut model = LearnedModel::new();
        model.record(&tokens(&["refund"]), "Other", f64::NAN);
        assert_eq!(model.total_examples, 1);
        assert!(!model.amount_stats.contains_key("Other"));
    }

    #[test]
    fn test_top_tokens_order() {
        let mut model = LearnedModel::new();
        model.record(&tokens(&["beta", "alpha", "gamma", "gamma"]), "X", 1.0);
        assert_eq!(model.top_tokens("X", 2), vec!["gamma", "alpha"]);
        assert!(model.top_tokens("missing", 5).is_empty());
    }

    #[test]
    fn test_trained_threshold_and_reset() {
        let mut model = LearnedModel::new();
        for _ in 0..9 {
            model.record(&tokens(&["coffee"]), "Meals", 5.0);
        }
        assert!(!model.is_trained());
        model.record(&tokens(&["coffee"]), "Meals", 5.0);
        assert!(model.is_trained());

        model.reset();
        assert_eq!(model.total_examples, 0);
        assert!(model.vocabulary.is_empty());
        assert_eq!(model.version, MODEL_FORMAT_VERSION);
    }

    #[test]
    fn test_older_record_without_new_fields_loads() {
        let json = r#"{
            "category_doc_counts": {"Gas": 2},
            "total_examples": 2,
            "amount_stats": {"Gas": {"count": 2, "mean": 40.0}}
        }"#;
        let model: LearnedModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.total_examples, 2);
        assert_eq!(model.amount_stats["Gas"].m2, 0.0);
        assert!(model.vocabulary.is_empty());
        assert_eq!(model.last_accuracy, 0.0);
    }
}
