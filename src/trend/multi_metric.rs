//! Multi-metric overview
//!
//! Analyzes earnings, expenses, fees and the derived daily profit side by
//! side, correlates the raw series on the days all three were recorded,
//! and turns the combination into a short narrative.

use crate::series::{daily_totals, fill_gaps, Observation};
use crate::trend::analyzer::{analyze_trend, calculate_momentum};
use crate::trend::stats::pearson_correlation;
use crate::trend::types::{MetricCorrelation, MetricKind, MultiMetricTrend, TrendResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Correlations at or beyond this magnitude are called out in the narrative
const STRONG_CORRELATION: f64 = 0.7;

/// Momentum (relative EMA gap) worth mentioning
const NOTABLE_MOMENTUM: f64 = 0.1;

const MOMENTUM_SHORT_WINDOW: usize = 7;
const MOMENTUM_LONG_WINDOW: usize = 30;

/// Analyze earnings, expenses, fees and profit together
pub fn analyze_multi_metric(
    earnings: &[Observation],
    expenses: &[Observation],
    fees: &[Observation],
) -> MultiMetricTrend {
    let profit = profit_series(earnings, expenses);

    let earnings_trend = analyze_trend(earnings, "Earnings");
    let expenses_trend = analyze_trend(expenses, "Expenses");
    let profit_trend = analyze_trend(&profit, "Profit");
    let fees_trend = analyze_trend(fees, "Fees");

    let correlations = correlate(earnings, expenses, fees);

    let filled: Vec<f64> = fill_gaps(earnings).iter().map(|o| o.value).collect();
    let earnings_momentum =
        calculate_momentum(&filled, MOMENTUM_SHORT_WINDOW, MOMENTUM_LONG_WINDOW);

    let narrative_summary = build_narrative(
        earnings_trend.as_ref(),
        expenses_trend.as_ref(),
        profit_trend.as_ref(),
        fees_trend.as_ref(),
        &correlations,
        earnings_momentum,
    );

    tracing::debug!(
        correlations = correlations.len(),
        momentum = earnings_momentum,
        "Multi-metric overview built"
    );

    MultiMetricTrend {
        earnings: earnings_trend,
        expenses: expenses_trend,
        profit: profit_trend,
        fees: fees_trend,
        correlations,
        earnings_momentum,
        narrative_summary,
    }
}

/// Daily earnings minus expenses over the union of both date sets
///
/// A day present on only one side counts the other side as 0.
pub fn profit_series(earnings: &[Observation], expenses: &[Observation]) -> Vec<Observation> {
    let earned = daily_totals(earnings);
    let spent = daily_totals(expenses);

    let days: BTreeSet<NaiveDate> = earned.keys().chain(spent.keys()).copied().collect();
    days.into_iter()
        .map(|day| {
            let e = earned.get(&day).copied().unwrap_or(0.0);
            let x = spent.get(&day).copied().unwrap_or(0.0);
            Observation::new(day, e - x)
        })
        .collect()
}

/// Pairwise Pearson correlations over days present in all three series
///
/// Pairs whose coefficient is undefined (too few shared days, constant
/// series) are omitted.
fn correlate(
    earnings: &[Observation],
    expenses: &[Observation],
    fees: &[Observation],
) -> Vec<MetricCorrelation> {
    let series: [(MetricKind, BTreeMap<NaiveDate, f64>); 3] = [
        (MetricKind::Earnings, daily_totals(earnings)),
        (MetricKind::Expenses, daily_totals(expenses)),
        (MetricKind::Fees, daily_totals(fees)),
    ];

    let shared: Vec<NaiveDate> = series[0]
        .1
        .keys()
        .filter(|d| series[1].1.contains_key(d) && series[2].1.contains_key(d))
        .copied()
        .collect();

    let aligned: Vec<Vec<f64>> = series
        .iter()
        .map(|(_, totals)| shared.iter().map(|d| totals[d]).collect())
        .collect();

    let mut correlations = Vec::new();
    for i in 0..series.len() {
        for j in (i + 1)..series.len() {
            let r = pearson_correlation(&aligned[i], &aligned[j]);
            if r.is_nan() {
                continue;
            }
            correlations.push(MetricCorrelation {
                metric_a: series[i].0,
                metric_b: series[j].0,
                coefficient: r,
                sample_size: shared.len(),
            });
        }
    }

    correlations
}

fn build_narrative(
    earnings: Option<&TrendResult>,
    expenses: Option<&TrendResult>,
    profit: Option<&TrendResult>,
    fees: Option<&TrendResult>,
    correlations: &[MetricCorrelation],
    earnings_momentum: f64,
) -> String {
    let mut parts = Vec::new();

    match (earnings.map(|t| t.direction), expenses.map(|t| t.direction)) {
        (Some(e), Some(x)) if e.is_up() && !x.is_up() => parts.push(
            "Margin improving: earnings are rising while expenses hold steady or fall."
                .to_string(),
        ),
        (Some(e), Some(x)) if e.is_up() && x.is_up() => parts.push(
            "Earnings and expenses are both rising; keep an eye on costs keeping pace."
                .to_string(),
        ),
        (Some(e), Some(x)) if e.is_down() && x.is_up() => parts.push(
            "Margin squeeze: earnings are falling while expenses climb.".to_string(),
        ),
        (Some(e), Some(x)) if e.is_down() && x.is_down() => parts.push(
            "Activity is slowing: earnings and expenses are both declining.".to_string(),
        ),
        (Some(e), Some(_)) if e.is_down() => parts.push(
            "Earnings are declining while expenses are unchanged.".to_string(),
        ),
        (Some(e), Some(x)) if e.is_flat() && x.is_up() => parts.push(
            "Expenses are growing while earnings hold flat.".to_string(),
        ),
        (Some(e), Some(x)) if e.is_flat() && x.is_down() => parts.push(
            "Margin improving: expenses are falling while earnings hold flat.".to_string(),
        ),
        (Some(_), Some(_)) => {
            parts.push("Earnings and expenses are both stable.".to_string())
        }
        (Some(e), None) => parts.push(format!("Earnings trend: {}.", e)),
        (None, Some(x)) => parts.push(format!("Expenses trend: {}.", x)),
        (None, None) => {}
    }

    if let Some(p) = profit {
        if p.direction.is_up() {
            parts.push(format!(
                "Profit is growing by about {:.2} per week.",
                p.weekly_change
            ));
        } else if p.direction.is_down() {
            parts.push(format!(
                "Profit is shrinking by about {:.2} per week.",
                p.weekly_change.abs()
            ));
        }
    }

    if let Some(f) = fees {
        if f.direction.is_up() {
            parts.push("Platform fees are trending up.".to_string());
        } else if f.direction.is_down() {
            parts.push("Platform fees are trending down.".to_string());
        }
    }

    if earnings_momentum > NOTABLE_MOMENTUM {
        parts.push(format!(
            "Recent earnings are running {:.0}% above the monthly average.",
            earnings_momentum * 100.0
        ));
    } else if earnings_momentum < -NOTABLE_MOMENTUM {
        parts.push(format!(
            "Recent earnings are running {:.0}% below the monthly average.",
            earnings_momentum.abs() * 100.0
        ));
    }

    for corr in correlations
        .iter()
        .filter(|c| c.coefficient.abs() > STRONG_CORRELATION)
    {
        let kind = if corr.coefficient > 0.0 {
            "positively"
        } else {
            "negatively"
        };
        parts.push(format!(
            "{} and {} are strongly {} correlated (r={:.2}).",
            capitalize(&corr.metric_a.to_string()),
            corr.metric_b,
            kind,
            corr.coefficient
        ));
    }

    if parts.is_empty() {
        "Not enough history yet to identify trends.".to_string()
    } else {
        parts.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
