//! Category scorers and the weighted ensemble
//!
//! Three independent views of a record:
//!
//! - **Bayesian**: multinomial Naive Bayes over tokens with add-one smoothing,
//!   normalized in log space
//! - **TF-IDF**: cosine similarity between the record and each category's
//!   token profile
//! - **Amount**: Gaussian likelihood of the amount under each category's
//!   running mean and spread
//!
//! Each scorer votes for at most one category; the ensemble adds up the
//! weighted votes per category.

use crate::categorizer::model::LearnedModel;
use crate::trend::stats::EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BAYESIAN_WEIGHT: f64 = 0.50;
pub const TFIDF_WEIGHT: f64 = 0.35;
pub const AMOUNT_WEIGHT: f64 = 0.15;

/// Ensemble score a winner must exceed
pub const MIN_ENSEMBLE_SCORE: f64 = 0.15;
/// Ceiling on reported confidence
pub const MAX_CONFIDENCE: f64 = 0.95;

const MIN_TFIDF_SIMILARITY: f64 = 0.05;
const MAX_TFIDF_CONFIDENCE: f64 = 0.90;
const MIN_AMOUNT_SAMPLES: u64 = 5;
const MIN_AMOUNT_POSTERIOR: f64 = 0.20;

/// Which scorer produced a vote
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scorer {
    Bayesian,
    TfIdf,
    Amount,
}

impl Scorer {
    pub fn weight(self) -> f64 {
        match self {
            Scorer::Bayesian => BAYESIAN_WEIGHT,
            Scorer::TfIdf => TFIDF_WEIGHT,
            Scorer::Amount => AMOUNT_WEIGHT,
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scorer::Bayesian => write!(f, "bayesian"),
            Scorer::TfIdf => write!(f, "tfidf"),
            Scorer::Amount => write!(f, "amount"),
        }
    }
}

/// One scorer's preferred category
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub scorer: Scorer,
    pub category: String,
    /// Scorer-specific confidence in [0, 1]
    pub confidence: f64,
}

/// Ensemble winner
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutcome {
    pub category: String,
    /// Sum of weighted confidences of the agreeing votes
    pub score: f64,
    /// Scorers whose vote matched the winner
    pub agreeing: Vec<Scorer>,
}

/// Normalized Naive Bayes posteriors per category
///
/// `ln P(c) + Σ ln((count(t, c) + 1) / (tokens(c) + |V|))`, turned into
/// probabilities with log-sum-exp. Empty when the model has no examples.
pub fn bayesian_posteriors(model: &LearnedModel, tokens: &[String]) -> BTreeMap<String, f64> {
    let mut log_scores: BTreeMap<String, f64> = BTreeMap::new();
    if model.total_examples == 0 {
        return BTreeMap::new();
    }

    let vocabulary = model.vocabulary.len() as f64;
    for (category, &docs) in &model.category_doc_counts {
        if docs == 0 {
            continue;
        }
        let log_prior = (docs as f64 / model.total_examples as f64).ln();
        let denominator = model.total_tokens(category) as f64 + vocabulary;
        let log_likelihood: f64 = tokens
            .iter()
            .map(|t| ((model.token_count(category, t) as f64 + 1.0) / denominator.max(1.0)).ln())
            .sum();
        log_scores.insert(category.clone(), log_prior + log_likelihood);
    }

    let max = log_scores
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let norm: f64 = log_scores.values().map(|l| (l - max).exp()).sum();

    log_scores
        .into_iter()
        .map(|(category, l)| (category, (l - max).exp() / norm))
        .collect()
}

/// Bayesian vote: most probable category and its posterior
pub fn bayesian_vote(model: &LearnedModel, tokens: &[String]) -> Option<Vote> {
    argmax(&bayesian_posteriors(model, tokens)).map(|(category, p)| Vote {
        scorer: Scorer::Bayesian,
        category,
        confidence: p,
    })
}

/// TF-IDF cosine vote
///
/// Needs at least two categories (with one, every IDF is zero). The best
/// similarity must exceed 0.05; confidence is the similarity capped at 0.90.
pub fn tfidf_vote(model: &LearnedModel, tokens: &[String]) -> Option<Vote> {
    let num_categories = model.category_count();
    if num_categories < 2 || tokens.is_empty() {
        return None;
    }

    let idf = |token: &str| (num_categories as f64 / model.doc_frequency(token) as f64).ln();

    let mut query_tf: BTreeMap<&str, f64> = BTreeMap::new();
    for token in tokens {
        *query_tf.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let query: BTreeMap<&str, f64> = query_tf
        .into_iter()
        .map(|(t, c)| (t, c / tokens.len() as f64 * idf(t)))
        .collect();
    let query_norm = query.values().map(|w| w * w).sum::<f64>().sqrt();
    if query_norm < EPSILON {
        return None;
    }

    let mut similarities: BTreeMap<String, f64> = BTreeMap::new();
    for (category, counts) in &model.category_token_counts {
        let total = model.total_tokens(category) as f64;
        if total < 1.0 {
            continue;
        }

        let weight = |token: &str, count: u64| count as f64 / total * idf(token);
        let norm = counts
            .iter()
            .map(|(t, &c)| weight(t, c).powi(2))
            .sum::<f64>()
            .sqrt();
        if norm < EPSILON {
            continue;
        }

        let dot: f64 = query
            .iter()
            .filter_map(|(t, q)| counts.get(*t).map(|&c| q * weight(t, c)))
            .sum();
        similarities.insert(category.clone(), dot / (query_norm * norm));
    }

    argmax(&similarities)
        .filter(|(_, sim)| *sim > MIN_TFIDF_SIMILARITY)
        .map(|(category, sim)| Vote {
            scorer: Scorer::TfIdf,
            category,
            confidence: sim.min(MAX_TFIDF_CONFIDENCE),
        })
}

/// Gaussian amount vote
///
/// Only categories with at least 5 amounts and a non-zero spread take part.
/// Densities are weighted by the category prior and normalized; the winner
/// needs a posterior above 0.20.
pub fn amount_vote(model: &LearnedModel, amount: f64) -> Option<Vote> {
    if !amount.is_finite() {
        return None;
    }

    let weighted: BTreeMap<String, f64> = model
        .amount_stats
        .iter()
        .filter(|(_, s)| s.count >= MIN_AMOUNT_SAMPLES && s.std_dev() > EPSILON)
        .map(|(category, s)| {
            let sd = s.std_dev();
            let z = (amount - s.mean) / sd;
            let density = (-0.5 * z * z).exp() / (sd * (2.0 * std::f64::consts::PI).sqrt());
            (category.clone(), density * model.prior(category))
        })
        .collect();

    let total: f64 = weighted.values().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let posteriors: BTreeMap<String, f64> = weighted
        .into_iter()
        .map(|(category, w)| (category, w / total))
        .collect();

    argmax(&posteriors)
        .filter(|(_, p)| *p > MIN_AMOUNT_POSTERIOR)
        .map(|(category, p)| Vote {
            scorer: Scorer::Amount,
            category,
            confidence: p,
        })
}

/// Weighted sum of votes per category; winner must exceed the minimum score
pub fn combine(votes: &[Vote]) -> Option<EnsembleOutcome> {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    for vote in votes {
        *scores.entry(vote.category.clone()).or_insert(0.0) +=
            vote.scorer.weight() * vote.confidence;
    }

    let (category, score) = argmax(&scores)?;
    if score <= MIN_ENSEMBLE_SCORE {
        return None;
    }

    let agreeing = votes
        .iter()
        .filter(|v| v.category == category)
        .map(|v| v.scorer)
        .collect();

    Some(EnsembleOutcome {
        category,
        score,
        agreeing,
    })
}

/// Examples required before accuracy is estimated
pub const MIN_ACCURACY_EXAMPLES: u64 = 20;
const ACCURACY_SAMPLE_TOKENS: usize = 5;

/// Self-consistency accuracy proxy
///
/// Each category's five most frequent tokens are fed back through the
/// Bayesian scorer; the result is the share of categories that recover
/// themselves. Returns 0 below [`MIN_ACCURACY_EXAMPLES`].
pub fn estimate_accuracy(model: &LearnedModel) -> f64 {
    if model.total_examples < MIN_ACCURACY_EXAMPLES {
        return 0.0;
    }

    let mut evaluated = 0usize;
    let mut correct = 0usize;
    for category in model.categories() {
        let sample: Vec<String> = model
            .top_tokens(category, ACCURACY_SAMPLE_TOKENS)
            .into_iter()
            .map(str::to_string)
            .collect();
        if sample.is_empty() {
            continue;
        }

        evaluated += 1;
        if bayesian_vote(model, &sample).is_some_and(|v| v.category == category) {
            correct += 1;
        }
    }

    if evaluated == 0 {
        0.0
    } else {
        correct as f64 / evaluated as f64
    }
}

/// Highest-valued entry; ties go to the alphabetically first key
fn argmax(scores: &BTreeMap<String, f64>) -> Option<(String, f64)> {
    let mut best: Option<(&String, f64)> = None;
    for (key, &value) in scores {
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((key, value));
        }
    }
    best.map(|(k, v)| (k.clone(), v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::tokenizer::tokenize;

    fn train(model: &mut LearnedModel, text: &str, category: &str, amount: f64) {
        model.record(&tokenize(text), category, amount);
    }

    fn two_category_model() -> LearnedModel {
        let mut model = LearnedModel::new();
        for (i, station) in ["Shell", "Chevron", "Exxon", "Shell", "Valero", "Chevron"]
            .iter()
            .enumerate()
        {
            train(&mut model, &format!("{} gas station", station), "Gas", 38.0 + i as f64 * 2.0);
        }
        for (i, store) in ["Kroger", "Safeway", "Trader Joes", "Kroger", "Whole Foods", "Aldi"]
            .iter()
            .enumerate()
        {
            train(&mut model, &format!("{} grocery run", store), "Groceries", 120.0 + i as f64 * 10.0);
        }
        model
    }

    #[test]
    fn test_bayesian_posteriors_sum_to_one() {
        let model = two_category_model();
        let posteriors = bayesian_posteriors(&model, &tokenize("shell gas"));
        let total: f64 = posteriors.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(posteriors["Gas"] > posteriors["Groceries"]);
    }

    #[test]
    fn test_bayesian_handles_many_tokens_without_underflow() {
        let model = two_category_model();
        let long_text = "kroger grocery ".repeat(400);
        let vote = bayesian_vote(&model, &tokenize(&long_text)).unwrap();
        assert_eq!(vote.category, "Groceries");
        assert!(vote.confidence.is_finite());
    }

    #[test]
    fn test_bayesian_empty_model() {
        let model = LearnedModel::new();
        assert!(bayesian_vote(&model, &tokenize("anything")).is_none());
    }

    #[test]
    fn test_tfidf_requires_two_categories() {
        let mut model = LearnedModel::new();
        for _ in 0..10 {
            train(&mut model, "shell gas station", "Gas", 40.0);
        }
        assert!(tfidf_vote(&model, &tokenize("shell gas")).is_none());
    }

    #[test]
    fn test_tfidf_picks_matching_category() {
        let model = two_category_model();
        let vote = tfidf_vote(&model, &tokenize("safeway grocery")).unwrap();
        assert_eq!(vote.category, "Groceries");
        assert!(vote.confidence > MIN_TFIDF_SIMILARITY);
        assert!(vote.confidence <= MAX_TFIDF_CONFIDENCE);
    }

    #[test]
    fn test_tfidf_unknown_tokens_yield_nothing() {
        let model = two_category_model();
        assert!(tfidf_vote(&model, &tokenize("zzyzx quux")).is_none());
    }

    #[test]
    fn test_amount_vote() {
        let model = two_category_model();
        let vote = amount_vote(&model, 41.0).unwrap();
        assert_eq!(vote.category, "Gas");
        assert!(vote.confidence > 0.9);

        let vote = amount_vote(&model, 140.0).unwrap();
        assert_eq!(vote.category, "Groceries");

        assert!(amount_vote(&model, f64::NAN).is_none());
    }

    #[test]
    fn test_amount_vote_needs_spread_and_samples() {
        let mut model = LearnedModel::new();
        for _ in 0..10 {
            train(&mut model, "netflix", "Subscriptions", 15.49);
        }
        for amount in [10.0, 20.0, 30.0, 40.0] {
            train(&mut model, "lunch", "Meals", amount);
        }
        assert!(amount_vote(&model, 15.49).is_none());
    }

    #[test]
    fn test_combine_weights_votes() {
        let votes = vec![
            Vote { scorer: Scorer::Bayesian, category: "Gas".into(), confidence: 0.8 },
            Vote { scorer: Scorer::TfIdf, category: "Gas".into(), confidence: 0.6 },
            Vote { scorer: Scorer::Amount, category: "Meals".into(), confidence: 0.9 },
        ];
        let outcome = combine(&votes).unwrap();
        assert_eq!(outcome.category, "Gas");
        assert!((outcome.score - (0.5 * 0.8 + 0.35 * 0.6)).abs() < 1e-12);
        assert_eq!(outcome.agreeing, vec![Scorer::Bayesian, Scorer::TfIdf]);
    }

    #[test]
    fn test_estimate_accuracy() {
        let mut model = two_category_model();
        // 12 examples: below the threshold
        assert_eq!(estimate_accuracy(&model), 0.0);

        for _ in 0..4 {
            train(&mut model, "shell gas station", "Gas", 40.0);
            train(&mut model, "kroger grocery run", "Groceries", 130.0);
        }
        assert_eq!(model.total_examples, 20);
        assert!((estimate_accuracy(&model) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_rejects_weak_score() {
        let votes = vec![Vote {
            scorer: Scorer::Amount,
            category: "Gas".into(),
            confidence: 0.9,
        }];
        assert!(combine(&votes).is_none());
        assert!(combine(&[]).is_none());
    }
}
