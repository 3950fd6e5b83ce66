//! Numeric building blocks
//!
//! Plain slice reductions used across the analyzer. Variances use the
//! population formula (divide by n). Every division is guarded by
//! [`EPSILON`].

/// Threshold below which a denominator is treated as zero
pub const EPSILON: f64 = 1e-10;

/// Arithmetic mean (0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (0 for an empty slice)
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Spread of `values` relative to `level` (0 when the level is near zero)
pub fn coefficient_of_variation(values: &[f64], level: f64) -> f64 {
    if level.abs() < EPSILON {
        0.0
    } else {
        std_dev(values) / level.abs()
    }
}

/// Fitted line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Closed-form ordinary least squares of `y` against its index 0..n-1
///
/// A degenerate design (fewer than two points) yields a flat line at the
/// mean of `y`.
pub fn linear_regression(y: &[f64]) -> LinearFit {
    let n = y.len() as f64;
    let sum_x: f64 = (0..y.len()).map(|i| i as f64).sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = y.iter().enumerate().map(|(i, v)| i as f64 * v).sum();
    let sum_x2: f64 = (0..y.len()).map(|i| (i as f64).powi(2)).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < EPSILON {
        return LinearFit {
            slope: 0.0,
            intercept: mean(y),
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    LinearFit { slope, intercept }
}

/// Coefficient of determination of `fit` over `y`, clamped to [0, 1]
///
/// Returns 0 when `y` has no variance to explain.
pub fn r_squared(y: &[f64], fit: &LinearFit) -> f64 {
    let y_mean = mean(y);
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if ss_tot < EPSILON {
        return 0.0;
    }

    let ss_res: f64 = y
        .iter()
        .enumerate()
        .map(|(i, v)| (v - fit.predict(i as f64)).powi(2))
        .sum();

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Calculate Pearson correlation coefficient
///
/// Both series are mean-centered over their common prefix. Returns NaN when
/// fewer than 3 pairs are available or either series is constant.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 3 {
        return f64::NAN;
    }

    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denominator = (sum_x2 * sum_y2).sqrt();
    if denominator < EPSILON {
        return f64::NAN;
    }

    (sum_xy / denominator).clamp(-1.0, 1.0)
}

/// Final value of an exponential moving average with `alpha = 2 / (window + 1)`
///
/// Seeded with the first value. `None` for an empty slice.
pub fn ema_last(values: &[f64], window: usize) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let alpha = 2.0 / (window as f64 + 1.0);
    Some(
        rest.iter()
            .fold(first, |ema, &v| alpha * v + (1.0 - alpha) * ema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(variance(&values), 4.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[]), 0.0);
    }

    #[test]
    fn test_linear_regression_exact_line() {
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 2.5 * i as f64).collect();
        let fit = linear_regression(&y);
        assert!((fit.slope - 2.5).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
        assert!((r_squared(&y, &fit) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regression_degenerate() {
        let fit = linear_regression(&[42.0]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 42.0);
    }

    #[test]
    fn test_r_squared_constant_series() {
        let y = [5.0; 20];
        let fit = linear_regression(&y);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(r_squared(&y, &fit), 0.0);
    }

    #[test]
    fn test_pearson_correlation_perfect_positive() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.0]);
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_correlation_perfect_negative() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[4.0, 3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_correlation_symmetric_and_bounded() {
        let x = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let y = [2.0, 7.0, 1.0, 8.0, 2.0, 8.0, 1.0, 8.0];
        let xy = pearson_correlation(&x, &y);
        let yx = pearson_correlation(&y, &x);
        assert!((xy - yx).abs() < 1e-12);
        assert!((-1.0..=1.0).contains(&xy));
    }

    #[test]
    fn test_pearson_correlation_insufficient_or_constant() {
        assert!(pearson_correlation(&[1.0, 2.0], &[2.0, 1.0]).is_nan());
        assert!(pearson_correlation(&[], &[]).is_nan());
        assert!(pearson_correlation(&[3.0, 3.0, 3.0, 3.0], &[1.0, 2.0, 3.0, 4.0]).is_nan());
    }

    #[test]
    fn test_coefficient_of_variation() {
        let cv = coefficient_of_variation(&[8.0, 12.0], 20.0);
        assert!((cv - 0.1).abs() < 1e-12);
        assert_eq!(coefficient_of_variation(&[1.0, 5.0], 0.0), 0.0);
    }

    #[test]
    fn test_ema_last() {
        assert_eq!(ema_last(&[], 7), None);
        assert_eq!(ema_last(&[10.0], 7), Some(10.0));
        // alpha = 0.5 for window 3
        let ema = ema_last(&[10.0, 20.0], 3).unwrap();
        assert!((ema - 15.0).abs() < 1e-12);
        let constant = ema_last(&[4.0; 50], 30).unwrap();
        assert!((constant - 4.0).abs() < 1e-12);
    }
}
