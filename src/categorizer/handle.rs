//! Shared async access to one categorizer
//!
//! Training and prediction are serialized through a single async mutex, so
//! any number of tasks can hold a clone of the handle.

use crate::categorizer::engine::{AdaptiveCategorizer, MLPrediction, ModelStats, TrainingExample};
use crate::categorizer::error::ModelStoreResult;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct CategorizerHandle {
    inner: Arc<Mutex<AdaptiveCategorizer>>,
}

impl CategorizerHandle {
    pub fn new(categorizer: AdaptiveCategorizer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(categorizer)),
        }
    }

    pub async fn train(&self, example: TrainingExample) {
        self.inner.lock().await.train(&example);
    }

    pub async fn train_batch(&self, examples: Vec<TrainingExample>) {
        self.inner.lock().await.train_batch(&examples);
    }

    pub async fn predict(
        &self,
        description: &str,
        merchant: Option<&str>,
        amount: f64,
    ) -> Option<MLPrediction> {
        self.inner.lock().await.predict(description, merchant, amount)
    }

    pub async fn embedding_centroid_predict(&self, description: &str) -> Option<(String, f64)> {
        self.inner.lock().await.embedding_centroid_predict(description)
    }

    pub async fn stats(&self) -> ModelStats {
        self.inner.lock().await.stats()
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    pub async fn save(&self) -> ModelStoreResult<()> {
        self.inner.lock().await.save()
    }
}

impl From<AdaptiveCategorizer> for CategorizerHandle {
    fn from(categorizer: AdaptiveCategorizer) -> Self {
        Self::new(categorizer)
    }
}
