//! Adaptive categorizer
//!
//! Owns the [`LearnedModel`], trains it one example (or batch) at a time and
//! predicts categories for unlabeled records with the weighted ensemble.
//! All mutation goes through `&mut self`; share an instance across tasks
//! with [`crate::categorizer::CategorizerHandle`].

use crate::categorizer::deduction::DeductionRules;
use crate::categorizer::embedding::{centroid_predict, EmbeddingProvider};
use crate::categorizer::error::ModelStoreResult;
use crate::categorizer::model::LearnedModel;
use crate::categorizer::scoring::{self, Scorer, Vote};
use crate::categorizer::store::ModelStore;
use crate::categorizer::tokenizer::{tokenize, tokenize_record};
use crate::config::CategorizerConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A labeled record to learn from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingExample {
    pub description: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub amount: f64,
    pub category: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TrainingExample {
    pub fn new(description: impl Into<String>, amount: f64, category: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            merchant_name: None,
            amount,
            category: category.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn tokens(&self) -> Vec<String> {
        tokenize_record(&self.description, self.merchant_name.as_deref())
    }
}

/// Which scorers backed a prediction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMethod {
    Bayesian,
    TfIdf,
    Amount,
    /// Two or more scorers agreed on the winner
    Ensemble,
}

impl From<Scorer> for PredictionMethod {
    fn from(scorer: Scorer) -> Self {
        match scorer {
            Scorer::Bayesian => PredictionMethod::Bayesian,
            Scorer::TfIdf => PredictionMethod::TfIdf,
            Scorer::Amount => PredictionMethod::Amount,
        }
    }
}

impl std::fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionMethod::Bayesian => write!(f, "bayesian"),
            PredictionMethod::TfIdf => write!(f, "tfidf"),
            PredictionMethod::Amount => write!(f, "amount"),
            PredictionMethod::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Predicted category for an unlabeled record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MLPrediction {
    pub category: String,
    /// In (0.15, 0.95]
    pub confidence: f64,
    pub method: PredictionMethod,
    pub reasoning: String,
    /// From the deduction rules, when configured and known for the category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible_percent: Option<f64>,
}

/// Snapshot of what the model has learned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStats {
    pub total_examples: u64,
    /// category → training examples
    pub categories: BTreeMap<String, u64>,
    pub vocabulary_size: usize,
    pub last_accuracy: f64,
    pub is_trained: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Incrementally trained ensemble categorizer
pub struct AdaptiveCategorizer {
    model: LearnedModel,
    store: Option<ModelStore>,
    persist_every: u32,
    background_persist: bool,
    /// Single-example training calls since the last reset
    train_calls: u64,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    deductions: Option<Arc<dyn DeductionRules>>,
}

impl std::fmt::Debug for AdaptiveCategorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveCategorizer")
            .field("total_examples", &self.model.total_examples)
            .field("store", &self.store.as_ref().map(|s| s.path().to_path_buf()))
            .field("persist_every", &self.persist_every)
            .field("embeddings", &self.embeddings.is_some())
            .field("deductions", &self.deductions.is_some())
            .finish()
    }
}

impl Default for AdaptiveCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveCategorizer {
    /// In-memory categorizer with nothing learned and no persistence
    pub fn new() -> Self {
        Self::from_model(LearnedModel::new())
    }

    /// Categorizer over an existing model, without persistence
    pub fn from_model(model: LearnedModel) -> Self {
        Self {
            model,
            store: None,
            persist_every: 5,
            background_persist: false,
            train_calls: 0,
            embeddings: None,
            deductions: None,
        }
    }

    /// Load the persisted model named by the configuration
    pub fn open(config: &CategorizerConfig) -> Self {
        let mut categorizer = Self::with_store(ModelStore::new(config.model_path.clone()));
        categorizer.persist_every = config.persist_every;
        categorizer.background_persist = config.background_persist;
        categorizer
    }

    /// Load from `store` (empty if absent or unreadable) and persist there
    pub fn with_store(store: ModelStore) -> Self {
        let model = store.load();
        Self {
            store: Some(store),
            ..Self::from_model(model)
        }
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings = Some(provider);
        self
    }

    pub fn with_deduction_rules(mut self, rules: Arc<dyn DeductionRules>) -> Self {
        self.deductions = Some(rules);
        self
    }

    pub fn with_persist_every(mut self, every: u32) -> Self {
        self.persist_every = every;
        self
    }

    pub fn with_background_persist(mut self, enabled: bool) -> Self {
        self.background_persist = enabled;
        self
    }

    pub fn model(&self) -> &LearnedModel {
        &self.model
    }

    pub fn is_model_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Learn from one example
    ///
    /// Every `persist_every`-th call re-estimates accuracy and saves the model.
    /// Save failures are logged, never returned.
    pub fn train(&mut self, example: &TrainingExample) {
        self.model
            .record(&example.tokens(), &example.category, example.amount);
        self.train_calls += 1;

        if self.persist_every > 0 && self.train_calls % u64::from(self.persist_every) == 0 {
            self.flush();
        }
    }

    /// Learn from many examples, then estimate accuracy and save once
    pub fn train_batch(&mut self, examples: &[TrainingExample]) {
        if examples.is_empty() {
            return;
        }

        for example in examples {
            self.model
                .record(&example.tokens(), &example.category, example.amount);
        }
        self.flush();

        tracing::info!(
            examples = examples.len(),
            total = self.model.total_examples,
            categories = self.model.category_count(),
            accuracy = self.model.last_accuracy,
            "Trained categorizer batch"
        );
    }

    /// Predict a category for an unlabeled record
    ///
    /// `None` until the model has seen enough examples, when the text has no
    /// usable tokens, or when no category clears the ensemble threshold.
    pub fn predict(
        &self,
        description: &str,
        merchant: Option<&str>,
        amount: f64,
    ) -> Option<MLPrediction> {
        if !self.model.is_trained() {
            return None;
        }

        let tokens = tokenize_record(description, merchant);
        if tokens.is_empty() {
            return None;
        }

        let votes: Vec<Vote> = [
            scoring::bayesian_vote(&self.model, &tokens),
            scoring::tfidf_vote(&self.model, &tokens),
            scoring::amount_vote(&self.model, amount),
        ]
        .into_iter()
        .flatten()
        .collect();

        tracing::debug!(tokens = tokens.len(), votes = ?votes, "Ensemble votes");

        let outcome = scoring::combine(&votes)?;
        let method = match outcome.agreeing.as_slice() {
            [single] => PredictionMethod::from(*single),
            _ => PredictionMethod::Ensemble,
        };
        let reasoning = describe_votes(&votes, &outcome.category, &tokens);
        let deductible_percent = self
            .deductions
            .as_ref()
            .and_then(|rules| rules.deductible_percent(&outcome.category));

        Some(MLPrediction {
            confidence: outcome.score.min(scoring::MAX_CONFIDENCE),
            category: outcome.category,
            method,
            reasoning,
            deductible_percent,
        })
    }

    /// Category nearest in embedding space, if a provider is configured
    ///
    /// Independent of [`AdaptiveCategorizer::predict`].
    pub fn embedding_centroid_predict(&self, description: &str) -> Option<(String, f64)> {
        let tokens = tokenize(description);
        centroid_predict(&self.model, &tokens, self.embeddings.as_deref())
    }

    /// Self-consistency accuracy of the current model (0 below 20 examples)
    pub fn estimate_accuracy(&self) -> f64 {
        scoring::estimate_accuracy(&self.model)
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            total_examples: self.model.total_examples,
            categories: self.model.category_doc_counts.clone(),
            vocabulary_size: self.model.vocabulary.len(),
            last_accuracy: self.model.last_accuracy,
            is_trained: self.model.is_trained(),
            updated_at: self.model.updated_at,
        }
    }

    /// Forget everything and persist the empty model immediately
    pub fn reset(&mut self) {
        self.model.reset();
        self.train_calls = 0;
        self.persist();
        tracing::info!("Categorizer model reset");
    }

    /// Synchronously write the model, reporting failures
    pub fn save(&self) -> ModelStoreResult<()> {
        match &self.store {
            Some(store) => store.save(&self.model),
            None => Ok(()),
        }
    }

    fn flush(&mut self) {
        self.model.last_accuracy = self.estimate_accuracy();
        self.persist();
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };

        if self.background_persist {
            // Detached; the store orders concurrent writes itself
            let _ = store.save_in_background(self.model.clone());
        } else if let Err(e) = store.save(&self.model) {
            tracing::warn!(error = %e, "Failed to persist categorizer model");
        }
    }
}

fn describe_votes(votes: &[Vote], winner: &str, tokens: &[String]) -> String {
    let agreeing: Vec<String> = votes
        .iter()
        .filter(|v| v.category == winner)
        .map(|v| format!("{} {:.0}%", v.scorer, v.confidence * 100.0))
        .collect();
    let dissenting: Vec<String> = votes
        .iter()
        .filter(|v| v.category != winner)
        .map(|v| format!("{} preferred {}", v.scorer, v.category))
        .collect();

    let mut reasoning = format!(
        "{} chosen by {} from tokens [{}]",
        winner,
        agreeing.join(", "),
        tokens.join(", ")
    );
    if !dissenting.is_empty() {
        reasoning.push_str(&format!("; {}", dissenting.join(", ")));
    }
    reasoning
}
