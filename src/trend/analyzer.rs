//! Single-metric trend analysis
//!
//! `analyze_trend` runs the full pipeline over one metric:
//!
//! ```text
//! observations → gap-filled daily series → weekday factors → deseasonalize
//!   → OLS fit → R² / residual volatility
//!   → change points (raw series) → 30-day seasonal forecast → summary
//! ```
//!
//! Pure functions only: no I/O, no shared state.

use crate::series::{add_days, fill_gaps, weekday_of, Observation};
use crate::trend::changepoint::{detect_change_points, segment_means, DEFAULT_MIN_SEGMENT_LENGTH};
use crate::trend::seasonal::{deseasonalize, weekday_factors};
use crate::trend::stats::{
    coefficient_of_variation, ema_last, linear_regression, mean, r_squared, LinearFit, EPSILON,
};
use crate::trend::types::{ChangePoint, TrendDirection, TrendResult};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Minimum length of the gap-filled series before a trend is reported
pub const MIN_TREND_POINTS: usize = 14;

/// Days projected by the forecast
pub const FORECAST_HORIZON_DAYS: usize = 30;

const STRONG_SLOPE: f64 = 5.0;
const STRONG_R2: f64 = 0.3;
const MODERATE_SLOPE: f64 = 2.0;
const MODERATE_R2: f64 = 0.15;

/// Weekday factor above which a day is called out in the summary
const PEAK_DAY_FACTOR: f64 = 1.1;

/// Analyze the trend of one metric
///
/// Returns `None` when the gap-filled daily series has fewer than
/// [`MIN_TREND_POINTS`] days; short histories are never extrapolated.
pub fn analyze_trend(observations: &[Observation], label: &str) -> Option<TrendResult> {
    let series = fill_gaps(observations);
    if series.len() < MIN_TREND_POINTS {
        tracing::debug!(
            label = %label,
            points = series.len(),
            "Not enough history for trend analysis"
        );
        return None;
    }

    let raw: Vec<f64> = series.iter().map(|o| o.value).collect();
    let factors = weekday_factors(&series);
    let adjusted = deseasonalize(&series, &factors);

    let fit = linear_regression(&adjusted);
    let strength = r_squared(&adjusted, &fit);

    let residuals: Vec<f64> = adjusted
        .iter()
        .enumerate()
        .map(|(i, v)| v - fit.predict(i as f64))
        .collect();
    let volatility = coefficient_of_variation(&residuals, mean(&adjusted));

    let change_points = build_change_points(&series, &raw, label);

    let last_date = series[series.len() - 1].date;
    let (forecast_7_day, forecast_30_day) = forecast(&fit, &factors, series.len(), last_date);

    let direction = classify_direction(fit.slope, strength);
    let summary = build_summary(label, direction, fit.slope, &factors, &change_points, volatility);

    tracing::debug!(
        label = %label,
        points = series.len(),
        slope = fit.slope,
        r2 = strength,
        change_points = change_points.len(),
        "Trend analyzed"
    );

    Some(TrendResult {
        label: label.to_string(),
        direction,
        strength,
        slope: fit.slope,
        weekly_change: fit.slope * 7.0,
        monthly_change: fit.slope * 30.0,
        seasonal_factors: factors,
        change_points,
        forecast_7_day,
        forecast_30_day,
        volatility,
        summary,
        data_points: series.len(),
        start_date: series[0].date,
        end_date: last_date,
    })
}

/// Classify a fitted slope (per day) and its R² into a direction
pub fn classify_direction(slope: f64, r_squared: f64) -> TrendDirection {
    let magnitude = slope.abs();
    let up = slope > 0.0;

    if magnitude > STRONG_SLOPE && r_squared > STRONG_R2 {
        if up {
            TrendDirection::StrongUp
        } else {
            TrendDirection::StrongDown
        }
    } else if magnitude > MODERATE_SLOPE && r_squared > MODERATE_R2 {
        if up {
            TrendDirection::ModerateUp
        } else {
            TrendDirection::ModerateDown
        }
    } else {
        TrendDirection::Flat
    }
}

/// Short-vs-long EMA momentum
///
/// `(short_ema - long_ema) / long_ema` over the final values. Returns 0 with
/// fewer than `long_window` values or when the long EMA is near zero.
pub fn calculate_momentum(values: &[f64], short_window: usize, long_window: usize) -> f64 {
    if values.len() < long_window {
        return 0.0;
    }

    match (ema_last(values, short_window), ema_last(values, long_window)) {
        (Some(short), Some(long)) if long.abs() >= EPSILON => (short - long) / long,
        _ => 0.0,
    }
}

/// Seasonally adjusted projection of the fitted line, floored at zero
///
/// Returns the (7-day, 30-day) totals.
fn forecast(
    fit: &LinearFit,
    factors: &BTreeMap<u32, f64>,
    observed_days: usize,
    last_date: NaiveDate,
) -> (f64, f64) {
    let mut week = 0.0;
    let mut month = 0.0;

    for ahead in 1..=FORECAST_HORIZON_DAYS {
        let x = (observed_days + ahead - 1) as f64;
        let date = add_days(last_date, ahead as i64);
        let factor = factors.get(&weekday_of(date)).copied().unwrap_or(1.0);
        let projected = (fit.predict(x) * factor).max(0.0);

        if ahead <= 7 {
            week += projected;
        }
        month += projected;
    }

    (week, month)
}

fn build_change_points(series: &[Observation], raw: &[f64], label: &str) -> Vec<ChangePoint> {
    let indices = detect_change_points(raw, DEFAULT_MIN_SEGMENT_LENGTH);
    let means = segment_means(raw, &indices);
    let subject = subject(label);

    indices
        .iter()
        .zip(means)
        .map(|(&idx, (before_avg, after_avg))| {
            let date = series[idx].date;
            let (percent_change, description) = if before_avg.abs() < EPSILON {
                (
                    0.0,
                    format!(
                        "{} started from a zero baseline around {} (avg {:.2})",
                        subject, date, after_avg
                    ),
                )
            } else {
                let pct = (after_avg - before_avg) / before_avg.abs() * 100.0;
                let verb = if pct >= 0.0 { "rose" } else { "fell" };
                (
                    pct,
                    format!(
                        "{} {} {:.0}% around {} (avg {:.2} -> {:.2})",
                        subject,
                        verb,
                        pct.abs(),
                        date,
                        before_avg,
                        after_avg
                    ),
                )
            };

            ChangePoint {
                date,
                before_avg,
                after_avg,
                percent_change,
                description,
            }
        })
        .collect()
}

fn build_summary(
    label: &str,
    direction: TrendDirection,
    slope: f64,
    factors: &BTreeMap<u32, f64>,
    change_points: &[ChangePoint],
    volatility: f64,
) -> String {
    let subject = subject(label);
    let mut parts = Vec::new();

    parts.push(match direction {
        TrendDirection::StrongUp => format!(
            "{} is rising strongly, about {:.2}/day ({:+.2}/week).",
            subject,
            slope.abs(),
            slope * 7.0
        ),
        TrendDirection::ModerateUp => format!(
            "{} is rising moderately, about {:.2}/day ({:+.2}/week).",
            subject,
            slope.abs(),
            slope * 7.0
        ),
        TrendDirection::Flat => format!("{} is holding steady ({:+.2}/day).", subject, slope),
        TrendDirection::ModerateDown => format!(
            "{} is declining moderately, about {:.2}/day ({:+.2}/week).",
            subject,
            slope.abs(),
            slope * 7.0
        ),
        TrendDirection::StrongDown => format!(
            "{} is declining sharply, about {:.2}/day ({:+.2}/week).",
            subject,
            slope.abs(),
            slope * 7.0
        ),
    });

    let mut peaks: Vec<(u32, f64)> = factors
        .iter()
        .filter(|(_, &f)| f > PEAK_DAY_FACTOR)
        .map(|(&d, &f)| (d, f))
        .collect();
    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    if !peaks.is_empty() {
        let days: Vec<String> = peaks
            .iter()
            .take(2)
            .map(|(d, f)| format!("{} ({:.2}x)", weekday_name(*d), f))
            .collect();
        parts.push(format!("Strongest days: {}.", days.join(", ")));
    }

    match change_points {
        [] => {}
        [only] => parts.push(format!("One shift detected: {}.", only.description)),
        [.., last] => parts.push(format!(
            "{} shifts detected; most recent: {}.",
            change_points.len(),
            last.description
        )),
    }

    if volatility > 1.0 {
        parts.push("Day-to-day values are highly volatile.".to_string());
    } else if volatility > 0.5 {
        parts.push("Day-to-day values are moderately volatile.".to_string());
    }

    parts.join(" ")
}

fn subject(label: &str) -> &str {
    if label.trim().is_empty() {
        "Value"
    } else {
        label
    }
}

fn weekday_name(day: u32) -> &'static str {
    match day {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        // A Sunday
        NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
    }

    fn daily(values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(add_days(start(), i as i64), v))
            .collect()
    }

    #[test]
    fn test_insufficient_history() {
        assert!(analyze_trend(&daily(&[100.0; 13]), "earnings").is_none());
        assert!(analyze_trend(&[], "earnings").is_none());
    }

    #[test]
    fn test_gap_filling_counts_toward_minimum() {
        let observations = vec![
            Observation::new(start(), 50.0),
            Observation::new(add_days(start(), 13), 50.0),
        ];
        let result = analyze_trend(&observations, "earnings").unwrap();
        assert_eq!(result.data_points, 14);
        assert_eq!(result.end_date, add_days(start(), 13));
    }

    #[test]
    fn test_constant_series_is_flat() {
        let result = analyze_trend(&daily(&[100.0; 14]), "earnings").unwrap();
        assert_eq!(result.slope, 0.0);
        assert_eq!(result.strength, 0.0);
        assert_eq!(result.direction, TrendDirection::Flat);
        assert_eq!(result.volatility, 0.0);
        assert!(result.change_points.is_empty());
        assert!((result.forecast_7_day - 700.0).abs() < 1e-6);
        assert!((result.forecast_30_day - 3000.0).abs() < 1e-6);
        assert!(result.seasonal_factors.values().all(|&f| (f - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_linear_ramp_is_strong_up() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 7.0 * i as f64).collect();
        let result = analyze_trend(&daily(&values), "earnings").unwrap();

        assert!((result.slope - 7.0).abs() < 1.0, "slope {}", result.slope);
        assert!(result.strength > 0.9);
        assert_eq!(result.direction, TrendDirection::StrongUp);
        assert!((result.weekly_change - result.slope * 7.0).abs() < 1e-9);
        assert!(result.forecast_30_day > result.forecast_7_day);
        assert!(result.summary.contains("rising strongly"));
    }

    #[test]
    fn test_declining_series() {
        let values: Vec<f64> = (0..28).map(|i| 300.0 - 3.0 * i as f64).collect();
        let result = analyze_trend(&daily(&values), "miles").unwrap();
        assert!(result.direction.is_down());
        assert!(result.slope < 0.0);
    }

    #[test]
    fn test_level_shift_reports_change_point() {
        let noise = [-2.0, 1.0, 3.0, -1.0, 0.0, 2.0, -3.0];
        let values: Vec<f64> = (0..28)
            .map(|i| if i < 14 { 100.0 } else { 200.0 } + noise[i % 7])
            .collect();
        let result = analyze_trend(&daily(&values), "earnings").unwrap();

        assert_eq!(result.change_points.len(), 1);
        let cp = &result.change_points[0];
        assert_eq!(cp.date, add_days(start(), 14));
        assert!((cp.before_avg - 100.0).abs() < 1e-9);
        assert!((cp.after_avg - 200.0).abs() < 1e-9);
        assert!((cp.percent_change - 100.0).abs() < 1e-6);
        assert!(cp.description.contains("rose 100%"));
        assert!(result.summary.contains("One shift detected"));
    }

    #[test]
    fn test_forecast_never_negative() {
        let values: Vec<f64> = (0..21).map(|i| (200.0 - 10.0 * i as f64).max(0.0)).collect();
        let result = analyze_trend(&daily(&values), "tips").unwrap();
        assert!(result.forecast_7_day >= 0.0);
        assert!(result.forecast_30_day >= result.forecast_7_day);
    }

    #[test]
    fn test_weekly_pattern_in_summary() {
        // Saturdays (weekday 7) earn triple
        let values: Vec<f64> = (0..28).map(|i| if i % 7 == 6 { 300.0 } else { 100.0 }).collect();
        let result = analyze_trend(&daily(&values), "earnings").unwrap();

        assert!(result.seasonal_factors[&7] > 2.0);
        assert!(result.summary.contains("Saturday"));
        assert_eq!(result.direction, TrendDirection::Flat);
    }

    #[test]
    fn test_summary_names_two_strongest_days() {
        // Sunday, Friday and Saturday all clear the peak threshold
        let week = [180.0, 100.0, 100.0, 100.0, 100.0, 200.0, 250.0];
        let values: Vec<f64> = (0..28).map(|i| week[i % 7]).collect();
        let result = analyze_trend(&daily(&values), "earnings").unwrap();

        assert!(result.seasonal_factors[&1] > 1.1);
        assert!(result.summary.contains("Strongest days: Saturday (1.70x), Friday (1.36x)."));
        assert!(!result.summary.contains("Sunday"));
    }

    #[test]
    fn test_volatility_qualifiers() {
        // Period-4 patterns spread evenly across weekdays, so every factor is 1
        let spiky: Vec<f64> = (0..28).map(|i| if i % 4 == 3 { 300.0 } else { 0.0 }).collect();
        let result = analyze_trend(&daily(&spiky), "earnings").unwrap();
        assert!(result.volatility > 1.0);
        assert!(result.summary.contains("highly volatile"));

        let uneven: Vec<f64> = (0..28).map(|i| if i % 4 == 3 { 150.0 } else { 50.0 }).collect();
        let result = analyze_trend(&daily(&uneven), "earnings").unwrap();
        assert!(result.volatility > 0.5 && result.volatility <= 1.0);
        assert!(result.summary.contains("moderately volatile"));

        let steady = analyze_trend(&daily(&[100.0; 28]), "earnings").unwrap();
        assert!(!steady.summary.contains("volatile"));
    }

    #[test]
    fn test_strength_bounded_for_noisy_series() {
        let values: Vec<f64> = (0..40)
            .map(|i| 50.0 + ((i * 37) % 11) as f64 * 3.0 - ((i * 17) % 5) as f64)
            .collect();
        let result = analyze_trend(&daily(&values), "").unwrap();
        assert!((0.0..=1.0).contains(&result.strength));
        assert!(result.summary.starts_with("Value"));
    }

    #[test]
    fn test_classify_direction_thresholds() {
        assert_eq!(classify_direction(6.0, 0.5), TrendDirection::StrongUp);
        assert_eq!(classify_direction(-6.0, 0.5), TrendDirection::StrongDown);
        assert_eq!(classify_direction(6.0, 0.2), TrendDirection::ModerateUp);
        assert_eq!(classify_direction(-3.0, 0.2), TrendDirection::ModerateDown);
        assert_eq!(classify_direction(3.0, 0.1), TrendDirection::Flat);
        assert_eq!(classify_direction(1.0, 0.9), TrendDirection::Flat);
        assert_eq!(classify_direction(0.0, 0.0), TrendDirection::Flat);
    }

    #[test]
    fn test_momentum() {
        assert_eq!(calculate_momentum(&[10.0; 29], 7, 30), 0.0);
        assert!(calculate_momentum(&[10.0; 40], 7, 30).abs() < 1e-12);
        assert_eq!(calculate_momentum(&[0.0; 40], 7, 30), 0.0);

        let rising: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        assert!(calculate_momentum(&rising, 7, 30) > 0.0);

        let falling: Vec<f64> = (0..60).map(|i| 100.0 - i as f64).collect();
        assert!(calculate_momentum(&falling, 7, 30) < 0.0);
    }
}
