//! Adaptive transaction categorizer
//!
//! Learns category labels from free-text transaction records and predicts
//! labels for new ones. Three scorers vote (Naive Bayes over tokens, TF-IDF
//! cosine similarity, and a Gaussian over amounts) and a weighted ensemble
//! picks the winner. The learned state is a single [`LearnedModel`] persisted
//! as JSON between runs.
//!
//! ```
//! use gigstats::categorizer::{AdaptiveCategorizer, TrainingExample};
//!
//! let mut categorizer = AdaptiveCategorizer::new();
//! let examples: Vec<_> = (0..12)
//!     .map(|i| TrainingExample::new("Shell gas station", 30.0 + i as f64, "Gas"))
//!     .collect();
//! categorizer.train_batch(&examples);
//!
//! let prediction = categorizer.predict("Shell fuel", None, 38.0).unwrap();
//! assert_eq!(prediction.category, "Gas");
//! ```

pub mod deduction;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod handle;
pub mod model;
pub mod scoring;
pub mod store;
pub mod tokenizer;

pub use deduction::DeductionRules;
pub use embedding::{centroid_predict, EmbeddingProvider, StaticEmbeddings};
pub use engine::{AdaptiveCategorizer, MLPrediction, ModelStats, PredictionMethod, TrainingExample};
pub use error::{ModelStoreError, ModelStoreResult};
pub use handle::CategorizerHandle;
pub use model::{AmountStats, LearnedModel, MIN_TRAINED_EXAMPLES, MODEL_FORMAT_VERSION};
pub use scoring::{estimate_accuracy, Scorer, Vote};
pub use store::ModelStore;
pub use tokenizer::{tokenize, tokenize_record};
