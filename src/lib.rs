//! # gigstats
//!
//! Financial analytics for gig workers: trend analysis over daily earnings,
//! expenses and fees, plus an incrementally trained transaction categorizer.
//!
//! ## Features
//!
//! - **Trend analysis**: OLS trend with R² strength, weekday seasonality,
//!   change-point detection and short-range forecasts
//! - **Multi-metric overview**: earnings, expenses, profit and fees analyzed
//!   together with pairwise correlations and a narrative summary
//! - **Adaptive categorization**: Naive Bayes, TF-IDF and amount scorers in a
//!   weighted ensemble, learning from every labeled transaction
//! - **Durable model**: the learned model persists as JSON across restarts
//!
//! ## Modules
//!
//! - [`series`]: Date utilities, daily aggregation and gap filling
//! - [`trend`]: Trend analyzer and multi-metric overview
//! - [`categorizer`]: Adaptive categorizer and model persistence
//! - [`import`]: CSV import of series and training examples
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use gigstats::series::{add_days, Observation};
//! use gigstats::trend::analyze_trend;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let earnings: Vec<Observation> = (0..28)
//!     .map(|i| Observation::new(add_days(start, i), 100.0 + 5.0 * i as f64))
//!     .collect();
//!
//! let trend = analyze_trend(&earnings, "Earnings").unwrap();
//! assert!(trend.direction.is_up());
//! println!("{}", trend.summary);
//! ```

pub mod categorizer;
pub mod config;
pub mod import;
pub mod series;
pub mod trend;

// Re-export top-level types for convenience
pub use series::{aggregate_daily, fill_gaps, Observation};

pub use trend::{
    analyze_multi_metric, analyze_trend, calculate_momentum, decompose_seasonal,
    detect_change_points, pearson_correlation, ChangePoint, MetricCorrelation, MetricKind,
    MultiMetricTrend, SeasonalDecomposition, TrendDirection, TrendResult,
};

pub use categorizer::{
    AdaptiveCategorizer, CategorizerHandle, DeductionRules, EmbeddingProvider, LearnedModel,
    MLPrediction, ModelStats, ModelStore, ModelStoreError, PredictionMethod, TrainingExample,
};

pub use import::{ImportError, ImportReport, ObservationImporter};

pub use config::{CategorizerConfig, Config, ConfigError, LoggingConfig};
