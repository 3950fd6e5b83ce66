//! Result types produced by the trend analyzer
//!
//! Every result is built fresh per call and never mutated afterwards.
//! All types serialize with `serde` so a report layer can forward them as-is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction and rough magnitude of a fitted trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TrendDirection {
    StrongUp,
    ModerateUp,
    Flat,
    ModerateDown,
    StrongDown,
}

impl TrendDirection {
    pub fn is_up(self) -> bool {
        matches!(self, TrendDirection::StrongUp | TrendDirection::ModerateUp)
    }

    pub fn is_down(self) -> bool {
        matches!(self, TrendDirection::StrongDown | TrendDirection::ModerateDown)
    }

    pub fn is_flat(self) -> bool {
        self == TrendDirection::Flat
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::StrongUp => write!(f, "strongUp"),
            TrendDirection::ModerateUp => write!(f, "moderateUp"),
            TrendDirection::Flat => write!(f, "flat"),
            TrendDirection::ModerateDown => write!(f, "moderateDown"),
            TrendDirection::StrongDown => write!(f, "strongDown"),
        }
    }
}

/// A detected shift in the level of a series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangePoint {
    /// First day of the new level
    pub date: NaiveDate,
    /// Mean of the segment ending just before `date`
    pub before_avg: f64,
    /// Mean of the segment starting at `date`
    pub after_avg: f64,
    /// Relative change in percent (0 when the prior level is zero)
    pub percent_change: f64,
    /// Human-readable description
    pub description: String,
}

/// Full trend analysis of one metric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendResult {
    /// Caller-supplied label, used only in generated text
    pub label: String,
    pub direction: TrendDirection,
    /// R² of the fit, in [0, 1]
    pub strength: f64,
    /// Deseasonalized change per day
    pub slope: f64,
    pub weekly_change: f64,
    pub monthly_change: f64,
    /// Weekday (1 = Sunday ... 7 = Saturday) to multiplier
    pub seasonal_factors: BTreeMap<u32, f64>,
    pub change_points: Vec<ChangePoint>,
    pub forecast_7_day: f64,
    pub forecast_30_day: f64,
    /// Residual spread relative to the mean level
    pub volatility: f64,
    pub summary: String,
    /// Length of the gap-filled daily series
    pub data_points: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Additive decomposition of a series into trend, seasonal and residual parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalDecomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    /// Share of detrended variance explained by the seasonal pattern, in [0, 1]
    pub seasonal_strength: f64,
}

/// Metrics tracked by the multi-metric overview
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Earnings,
    Expenses,
    Profit,
    Fees,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Earnings => write!(f, "earnings"),
            MetricKind::Expenses => write!(f, "expenses"),
            MetricKind::Profit => write!(f, "profit"),
            MetricKind::Fees => write!(f, "fees"),
        }
    }
}

/// Pearson correlation between two raw metric series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricCorrelation {
    pub metric_a: MetricKind,
    pub metric_b: MetricKind,
    /// Pearson coefficient, in [-1, 1]
    pub coefficient: f64,
    /// Number of shared days the coefficient was computed over
    pub sample_size: usize,
}

/// Combined view over earnings, expenses, profit and fees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiMetricTrend {
    pub earnings: Option<TrendResult>,
    pub expenses: Option<TrendResult>,
    pub profit: Option<TrendResult>,
    pub fees: Option<TrendResult>,
    pub correlations: Vec<MetricCorrelation>,
    /// Short/long EMA momentum of daily earnings (0 when history is short)
    pub earnings_momentum: f64,
    pub narrative_summary: String,
}
