//! Trend Analyzer
//!
//! Stateless statistics over a user's daily history:
//!
//! - **stats**: means, variances, OLS, R², Pearson, EMA
//! - **seasonal**: weekday factors and additive seasonal decomposition
//! - **changepoint**: binary segmentation with Welch's t-test
//! - **analyzer**: single-metric trend, forecast, momentum and summary
//! - **multi_metric**: earnings/expenses/profit/fees overview
//! - **types**: result types
//!
//! Every function is pure and performs no I/O, so calls can run in
//! parallel across inputs. Insufficient data yields `None` (or `NaN` for
//! correlations) rather than an extrapolated guess.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use gigstats::series::{add_days, Observation};
//! use gigstats::trend::{analyze_trend, TrendDirection};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let history: Vec<Observation> = (0..30)
//!     .map(|i| Observation::new(add_days(start, i), 100.0 + 7.0 * i as f64))
//!     .collect();
//!
//! let trend = analyze_trend(&history, "Earnings").unwrap();
//! assert_eq!(trend.direction, TrendDirection::StrongUp);
//! ```

pub mod analyzer;
pub mod changepoint;
pub mod multi_metric;
pub mod seasonal;
pub mod stats;
pub mod types;

pub use analyzer::{analyze_trend, calculate_momentum, classify_direction, MIN_TREND_POINTS};
pub use changepoint::{detect_change_points, DEFAULT_MIN_SEGMENT_LENGTH};
pub use multi_metric::{analyze_multi_metric, profit_series};
pub use seasonal::{decompose_seasonal, weekday_factors};
pub use stats::{linear_regression, pearson_correlation, r_squared, LinearFit};
pub use types::{
    ChangePoint, MetricCorrelation, MetricKind, MultiMetricTrend, SeasonalDecomposition,
    TrendDirection, TrendResult,
};
