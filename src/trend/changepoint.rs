//! Change-point detection by binary segmentation
//!
//! A segment is split at the index maximizing Welch's t-statistic between
//! its two halves, provided the statistic clears the two-tailed p < 0.01
//! critical value. Both halves are then examined independently. Segments are
//! processed from an explicit worklist, so arbitrarily long or fragmented
//! input cannot exhaust the stack.

use crate::trend::stats::{mean, EPSILON};

/// Default minimum number of observations on each side of a split
pub const DEFAULT_MIN_SEGMENT_LENGTH: usize = 7;

/// |t| threshold, roughly two-tailed p < 0.01
pub const T_CRITICAL: f64 = 2.576;

/// Indices where the level of `values` shifts, sorted ascending
///
/// Every returned index `k` starts a new segment: `values[..k]` and
/// `values[k..]` sit on different sides of the split. No index lies within
/// `min_segment_length` of the boundaries of the segment it was found in.
pub fn detect_change_points(values: &[f64], min_segment_length: usize) -> Vec<usize> {
    let min_len = min_segment_length.max(1);
    let mut found = Vec::new();
    let mut pending = vec![(0usize, values.len())];

    while let Some((start, end)) = pending.pop() {
        if end - start < 2 * min_len {
            continue;
        }

        if let Some(split) = best_split(&values[start..end], min_len) {
            let index = start + split;
            found.push(index);
            pending.push((start, index));
            pending.push((index, end));
        }
    }

    found.sort_unstable();
    found
}

/// Best accepted split offset within `segment`, if any
///
/// Suffix moments are built once from the right, so scanning all candidate
/// splits is linear in the segment length.
fn best_split(segment: &[f64], min_len: usize) -> Option<usize> {
    let mut suffix = vec![Moments::default(); segment.len() + 1];
    for i in (0..segment.len()).rev() {
        suffix[i] = suffix[i + 1];
        suffix[i].push(segment[i]);
    }

    let mut left = Moments::of(&segment[..min_len - 1]);
    let mut best: Option<(usize, f64)> = None;

    for k in min_len..=(segment.len() - min_len) {
        left.push(segment[k - 1]);
        let t = t_statistic(&left, &suffix[k]).abs();
        if best.map_or(true, |(_, best_t)| t > best_t) {
            best = Some((k, t));
        }
    }

    best.filter(|&(_, t)| t > T_CRITICAL).map(|(k, _)| k)
}

/// Running count, mean and sum of squared deviations (Welford)
///
/// Deviations are accumulated around the running mean, so a large common
/// level does not swamp the variance.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    n: f64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn of(values: &[f64]) -> Self {
        let mut m = Self::default();
        for &v in values {
            m.push(v);
        }
        m
    }

    fn push(&mut self, v: f64) {
        self.n += 1.0;
        let delta = v - self.mean;
        self.mean += delta / self.n;
        self.m2 += delta * (v - self.mean);
    }

    /// Population variance
    fn variance(&self) -> f64 {
        if self.n < 1.0 {
            return 0.0;
        }
        (self.m2 / self.n).max(0.0)
    }
}

/// Welch's t-statistic with population variances
///
/// Two constant halves at different levels have a zero standard error; the
/// error is floored at [`EPSILON`] so such a split scores as maximally
/// significant instead of dividing by zero.
fn t_statistic(left: &Moments, right: &Moments) -> f64 {
    let standard_error = (left.variance() / left.n + right.variance() / right.n).sqrt();
    (left.mean - right.mean) / standard_error.max(EPSILON)
}

/// Mean of each segment delimited by `points`, as (before, after) pairs
///
/// For change point `i` the "before" segment runs from the previous change
/// point (or the start) and the "after" segment to the next one (or the end).
pub fn segment_means(values: &[f64], points: &[usize]) -> Vec<(f64, f64)> {
    let mut bounds = Vec::with_capacity(points.len() + 2);
    bounds.push(0);
    bounds.extend_from_slice(points);
    bounds.push(values.len());

    bounds
        .windows(3)
        .map(|w| (mean(&values[w[0]..w[1]]), mean(&values[w[1]..w[2]])))
        .collect()
}
