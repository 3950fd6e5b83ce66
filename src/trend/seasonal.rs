//! Weekly seasonality
//!
//! Two views of the same idea: multiplicative weekday factors used by the
//! trend fit and forecast, and a general additive decomposition for any
//! period.

use crate::series::{weekday_of, Observation};
use crate::trend::stats::{mean, variance, EPSILON};
use crate::trend::types::SeasonalDecomposition;
use std::collections::BTreeMap;

/// Multiplier per weekday (1 = Sunday ... 7 = Saturday)
///
/// Each factor is the weekday's average value divided by the overall mean.
/// Weekdays with no observations, and every weekday when the overall mean is
/// zero, get 1.0.
pub fn weekday_factors(series: &[Observation]) -> BTreeMap<u32, f64> {
    let mut factors: BTreeMap<u32, f64> = (1..=7).map(|d| (d, 1.0)).collect();

    let values: Vec<f64> = series.iter().map(|o| o.value).collect();
    let overall = mean(&values);
    if overall.abs() < EPSILON {
        return factors;
    }

    let mut sums = [0.0_f64; 7];
    let mut counts = [0_usize; 7];
    for obs in series {
        let slot = (weekday_of(obs.date) - 1) as usize;
        sums[slot] += obs.value;
        counts[slot] += 1;
    }

    for (slot, (&sum, &count)) in sums.iter().zip(counts.iter()).enumerate() {
        if count > 0 {
            factors.insert(slot as u32 + 1, (sum / count as f64) / overall);
        }
    }

    factors
}

/// Divide each value by its weekday factor
///
/// Near-zero factors are skipped and the raw value kept.
pub fn deseasonalize(series: &[Observation], factors: &BTreeMap<u32, f64>) -> Vec<f64> {
    series
        .iter()
        .map(|obs| {
            let factor = factors.get(&weekday_of(obs.date)).copied().unwrap_or(1.0);
            if factor.abs() < EPSILON {
                obs.value
            } else {
                obs.value / factor
            }
        })
        .collect()
}

/// Additive decomposition into trend, seasonal pattern and residual
///
/// The trend is a centered moving average over `period` values; positions
/// where the window does not fit are filled from the nearest defined value
/// (or zero if the series is shorter than one window). The seasonal pattern
/// is the mean detrended value per `index mod period`, shifted to sum to
/// zero.
pub fn decompose_seasonal(values: &[f64], period: usize) -> SeasonalDecomposition {
    let n = values.len();
    if n == 0 || period == 0 {
        return SeasonalDecomposition {
            trend: values.to_vec(),
            seasonal: vec![0.0; n],
            residual: vec![0.0; n],
            seasonal_strength: 0.0,
        };
    }

    let trend = centered_moving_average(values, period);

    let detrended: Vec<f64> = values.iter().zip(&trend).map(|(v, t)| v - t).collect();

    let mut pattern = vec![0.0; period];
    for (pos, slot) in pattern.iter_mut().enumerate() {
        let bucket: Vec<f64> = detrended.iter().skip(pos).step_by(period).copied().collect();
        *slot = mean(&bucket);
    }
    let pattern_mean = mean(&pattern);
    for slot in pattern.iter_mut() {
        *slot -= pattern_mean;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| pattern[i % period]).collect();

    let residual: Vec<f64> = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((v, t), s)| v - t - s)
        .collect();

    let detrended_var = variance(&detrended);
    let seasonal_strength = if detrended_var < EPSILON {
        0.0
    } else {
        (1.0 - variance(&residual) / detrended_var).clamp(0.0, 1.0)
    };

    SeasonalDecomposition {
        trend,
        seasonal,
        residual,
        seasonal_strength,
    }
}

/// Centered moving average with edge back/forward fill
fn centered_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;

    let mut averages: Vec<Option<f64>> = vec![None; n];
    for (i, slot) in averages.iter_mut().enumerate() {
        if i < half || i - half + period > n {
            continue;
        }
        let start = i - half;
        *slot = Some(mean(&values[start..start + period]));
    }

    let first = averages.iter().position(Option::is_some);
    let last = averages.iter().rposition(Option::is_some);

    match (first, last) {
        (Some(first), Some(last)) => {
            let head = averages[first].unwrap_or(0.0);
            let tail = averages[last].unwrap_or(0.0);
            averages
                .iter()
                .enumerate()
                .map(|(i, v)| match v {
                    Some(v) => *v,
                    None if i < first => head,
                    None => tail,
                })
                .collect()
        }
        _ => vec![0.0; n],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weekly_series(pattern: [f64; 7], weeks: usize) -> Vec<Observation> {
        // 2024-01-14 is a Sunday, so pattern[0] lands on weekday 1
        let start = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        (0..weeks * 7)
            .map(|i| {
                Observation::new(
                    start + chrono::Duration::days(i as i64),
                    pattern[i % 7],
                )
            })
            .collect()
    }

    #[test]
    fn test_weekday_factors() {
        let series = weekly_series([50.0, 100.0, 100.0, 100.0, 100.0, 100.0, 150.0], 4);
        let factors = weekday_factors(&series);
        assert_eq!(factors.len(), 7);
        assert!((factors[&1] - 0.5).abs() < 1e-9);
        assert!((factors[&2] - 1.0).abs() < 1e-9);
        assert!((factors[&7] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_weekday_factors_zero_mean() {
        let series = weekly_series([0.0; 7], 2);
        let factors = weekday_factors(&series);
        assert!(factors.values().all(|&f| f == 1.0));
    }

    #[test]
    fn test_deseasonalize_flattens_pattern() {
        let series = weekly_series([50.0, 100.0, 100.0, 100.0, 100.0, 100.0, 150.0], 3);
        let factors = weekday_factors(&series);
        let flat = deseasonalize(&series, &factors);
        for v in flat {
            assert!((v - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decompose_pure_seasonal() {
        let pattern = [1.0, -1.0, 2.0, -2.0, 0.0, 3.0, -3.0];
        let values: Vec<f64> = (0..42).map(|i| 10.0 + pattern[i % 7]).collect();

        let d = decompose_seasonal(&values, 7);
        assert_eq!(d.trend.len(), values.len());
        assert_eq!(d.seasonal.len(), values.len());
        assert_eq!(d.residual.len(), values.len());

        for t in &d.trend {
            assert!((t - 10.0).abs() < 1e-9);
        }
        let pattern_sum: f64 = d.seasonal[..7].iter().sum();
        assert!(pattern_sum.abs() < 1e-9);
        assert!((d.seasonal_strength - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decompose_components_add_up() {
        let values: Vec<f64> = (0..30)
            .map(|i| i as f64 * 0.5 + if i % 7 == 5 { 4.0 } else { 0.0 } + (i % 3) as f64)
            .collect();
        let d = decompose_seasonal(&values, 7);
        for i in 0..values.len() {
            let sum = d.trend[i] + d.seasonal[i] + d.residual[i];
            assert!((sum - values[i]).abs() < 1e-9);
        }
        assert!((0.0..=1.0).contains(&d.seasonal_strength));
    }

    #[test]
    fn test_decompose_short_series_has_zero_trend() {
        let d = decompose_seasonal(&[1.0, 2.0, 3.0], 7);
        assert_eq!(d.trend, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_decompose_constant_series() {
        let d = decompose_seasonal(&[5.0; 21], 7);
        assert_eq!(d.seasonal_strength, 0.0);
    }
}
