//! Word-embedding centroid prediction
//!
//! An auxiliary classification path that compares input tokens with each
//! category's most frequent learned tokens through an external embedding
//! provider. It never feeds the ensemble score; without a provider it
//! returns nothing.

use crate::categorizer::model::LearnedModel;
use std::collections::HashMap;
use std::sync::Arc;

const CENTROID_TOKENS: usize = 20;
const MIN_PAIR_SIMILARITY: f64 = 0.3;
const MIN_CENTROID_SCORE: f64 = 0.40;
const MAX_CENTROID_CONFIDENCE: f64 = 0.85;

/// Cosine distance between two words, if both are known to the provider
pub trait EmbeddingProvider: Send + Sync {
    fn distance(&self, a: &str, b: &str) -> Option<f64>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<T> {
    fn distance(&self, a: &str, b: &str) -> Option<f64> {
        (**self).distance(a, b)
    }
}

/// Fixed table of word vectors, compared by cosine distance
///
/// Useful for small domain vocabularies and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEmbeddings {
    vectors: HashMap<String, Vec<f64>>,
}

impl StaticEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f64>) {
        self.vectors.insert(word.into(), vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl EmbeddingProvider for StaticEmbeddings {
    fn distance(&self, a: &str, b: &str) -> Option<f64> {
        let va = self.vectors.get(a)?;
        let vb = self.vectors.get(b)?;
        if va.len() != vb.len() {
            return None;
        }

        let dot: f64 = va.iter().zip(vb).map(|(x, y)| x * y).sum();
        let na = va.iter().map(|x| x * x).sum::<f64>().sqrt();
        let nb = vb.iter().map(|x| x * x).sum::<f64>().sqrt();
        if na == 0.0 || nb == 0.0 {
            return None;
        }
        Some(1.0 - dot / (na * nb))
    }
}

/// Best category by average embedding similarity to its top tokens
///
/// For every category, similarities `1 - distance` between each input token
/// and each of the category's top 20 tokens are averaged over the pairs
/// scoring above 0.3. The best average must exceed 0.40; confidence is capped
/// at 0.85.
pub fn centroid_predict(
    model: &LearnedModel,
    tokens: &[String],
    provider: Option<&dyn EmbeddingProvider>,
) -> Option<(String, f64)> {
    let provider = provider?;
    if tokens.is_empty() {
        return None;
    }

    let mut best: Option<(String, f64)> = None;
    for category in model.categories() {
        let top = model.top_tokens(category, CENTROID_TOKENS);

        let mut sum = 0.0;
        let mut pairs = 0usize;
        for token in tokens {
            for learned in &top {
                let Some(distance) = provider.distance(token, learned) else {
                    continue;
                };
                let similarity = 1.0 - distance;
                if similarity > MIN_PAIR_SIMILARITY {
                    sum += similarity;
                    pairs += 1;
                }
            }
        }
        if pairs == 0 {
            continue;
        }

        let score = sum / pairs as f64;
        if best.as_ref().map_or(true, |(_, b)| score > *b) {
            best = Some((category.to_string(), score));
        }
    }

    let (category, score) = best?;
    tracing::debug!(%category, score, "Embedding centroid candidate");
    (score > MIN_CENTROID_SCORE).then(|| (category, score.min(MAX_CENTROID_CONFIDENCE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn embeddings() -> StaticEmbeddings {
        let mut e = StaticEmbeddings::new();
        e.insert("fuel", vec![1.0, 0.1, 0.0]);
        e.insert("gas", vec![0.9, 0.2, 0.0]);
        e.insert("petrol", vec![1.0, 0.0, 0.05]);
        e.insert("grocery", vec![0.0, 1.0, 0.1]);
        e.insert("produce", vec![0.1, 0.9, 0.0]);
        e
    }

    fn model() -> LearnedModel {
        let mut m = LearnedModel::new();
        m.record(&tokens(&["gas", "fuel"]), "Gas", 40.0);
        m.record(&tokens(&["grocery", "produce"]), "Groceries", 90.0);
        m
    }

    #[test]
    fn test_static_distance() {
        let e = embeddings();
        assert!(e.distance("fuel", "fuel").unwrap().abs() < 1e-12);
        assert!(e.distance("fuel", "grocery").unwrap() > 0.8);
        assert!(e.distance("fuel", "unknown").is_none());
    }

    #[test]
    fn test_centroid_prefers_semantic_neighbor() {
        let e = embeddings();
        let (category, confidence) =
            centroid_predict(&model(), &tokens(&["petrol"]), Some(&e)).unwrap();
        assert_eq!(category, "Gas");
        assert!(confidence > MIN_CENTROID_SCORE);
        assert!(confidence <= MAX_CENTROID_CONFIDENCE);
    }

    #[test]
    fn test_centroid_without_provider() {
        assert!(centroid_predict(&model(), &tokens(&["petrol"]), None).is_none());
    }

    #[test]
    fn test_centroid_unknown_words() {
        let e = embeddings();
        assert!(centroid_predict(&model(), &tokens(&["zebra"]), Some(&e)).is_none());
        assert!(centroid_predict(&model(), &[], Some(&e)).is_none());
    }
}
