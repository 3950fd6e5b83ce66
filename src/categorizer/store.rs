//! JSON persistence for the learned model
//!
//! One pretty-printed file per installation. Writes go to a temporary file
//! in the same directory and are renamed over the destination, so a crash
//! mid-write leaves the previous model intact.

use crate::categorizer::error::{ModelStoreError, ModelStoreResult};
use crate::categorizer::model::LearnedModel;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Location of the persisted model plus write ordering state
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    /// Bumped for every requested save
    requested: Arc<AtomicU64>,
    /// Generation of the last model written; held while writing
    written: Arc<Mutex<u64>>,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requested: Arc::new(AtomicU64::new(0)),
            written: Arc::new(Mutex::new(0)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the model, falling back to an empty one
    ///
    /// A missing file is the first-run case. An unreadable or corrupt file is
    /// logged and also yields an empty model.
    pub fn load(&self) -> LearnedModel {
        match self.try_load() {
            Ok(Some(model)) => {
                tracing::info!(
                    path = %self.path.display(),
                    examples = model.total_examples,
                    categories = model.category_count(),
                    "Loaded categorizer model"
                );
                model
            }
            Ok(None) => LearnedModel::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load categorizer model, starting empty"
                );
                LearnedModel::new()
            }
        }
    }

    /// Load the model, surfacing read and decode failures
    ///
    /// `Ok(None)` when no model has been saved yet.
    pub fn try_load(&self) -> ModelStoreResult<Option<LearnedModel>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let model: LearnedModel = serde_json::from_str(&content)?;
        Ok(Some(model))
    }

    /// Write the model atomically
    pub fn save(&self, model: &LearnedModel) -> ModelStoreResult<()> {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_generation(model, generation)
    }

    /// Persist without blocking the caller
    ///
    /// Inside a tokio runtime the write runs on the blocking pool and the
    /// task handle is returned; otherwise it runs inline. Failures are logged
    /// and dropped. A write overtaken by a newer one is skipped.
    pub fn save_in_background(&self, model: LearnedModel) -> Option<JoinHandle<()>> {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let store = self.clone();
                Some(runtime.spawn_blocking(move || {
                    if let Err(e) = store.write_generation(&model, generation) {
                        tracing::warn!(error = %e, "Background model save failed");
                    }
                }))
            }
            Err(_) => {
                if let Err(e) = self.write_generation(&model, generation) {
                    tracing::warn!(error = %e, "Model save failed");
                }
                None
            }
        }
    }

    fn write_generation(&self, model: &LearnedModel, generation: u64) -> ModelStoreResult<()> {
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        if *written > generation {
            tracing::debug!(generation, latest = *written, "Skipping stale model save");
            return Ok(());
        }

        self.write_atomic(model)?;
        *written = generation;

        tracing::debug!(
            path = %self.path.display(),
            examples = model.total_examples,
            "Saved categorizer model"
        );
        Ok(())
    }

    fn write_atomic(&self, model: &LearnedModel) -> ModelStoreResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let content = serde_json::to_string_pretty(model)?;
        let mut file = tempfile::NamedTempFile::new_in(&parent)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .map_err(|e| ModelStoreError::Io(e.error))?;
        Ok(())
    }
}
