//! Daily aggregation and gap filling

use crate::series::dates::{add_days, days_between, start_of_day};
use crate::series::types::Observation;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Sum raw timestamped values into one observation per calendar day
///
/// Output is sorted by date. Days without any input are not emitted; use
/// [`fill_gaps`] for a contiguous series.
pub fn aggregate_daily(points: &[(DateTime<Utc>, f64)]) -> Vec<Observation> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, value) in points {
        *totals.entry(start_of_day(*ts)).or_insert(0.0) += value;
    }

    totals
        .into_iter()
        .map(|(date, value)| Observation::new(date, value))
        .collect()
}

/// Per-day totals of dated observations, keyed and ordered by date
pub fn daily_totals(observations: &[Observation]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for obs in observations {
        *totals.entry(obs.date).or_insert(0.0) += obs.value;
    }
    totals
}

/// Build a contiguous daily series from sparse observations
///
/// Observations are summed per day and every missing calendar day between
/// the first and last date is filled with 0. The result has exactly
/// `(last - first).days + 1` entries, or none for empty input.
pub fn fill_gaps(observations: &[Observation]) -> Vec<Observation> {
    let totals = daily_totals(observations);

    let (first, last) = match (totals.keys().next(), totals.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Vec::new(),
    };

    let span = days_between(first, last);
    let mut series = Vec::with_capacity(span as usize + 1);
    for offset in 0..=span {
        let date = add_days(first, offset);
        let value = totals.get(&date).copied().unwrap_or(0.0);
        series.push(Observation::new(date, value));
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_aggregate_daily_sums_same_day() {
        let points = vec![
            (Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(), 20.0),
            (Utc.with_ymd_and_hms(2024, 1, 15, 18, 30, 0).unwrap(), 15.5),
            (Utc.with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap(), 40.0),
        ];

        let daily = aggregate_daily(&points);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0], Observation::new(date(2024, 1, 15), 35.5));
        assert_eq!(daily[1], Observation::new(date(2024, 1, 17), 40.0));
    }

    #[test]
    fn test_fill_gaps_is_contiguous() {
        let observations = vec![
            Observation::new(date(2024, 1, 10), 5.0),
            Observation::new(date(2024, 1, 1), 1.0),
            Observation::new(date(2024, 1, 4), 2.0),
            Observation::new(date(2024, 1, 4), 3.0),
        ];

        let series = fill_gaps(&observations);
        assert_eq!(series.len(), 10);
        assert_eq!(series[0].date, date(2024, 1, 1));
        assert_eq!(series[9].date, date(2024, 1, 10));
        assert_eq!(series[3].value, 5.0);
        assert_eq!(series[1].value, 0.0);

        for pair in series.windows(2) {
            assert_eq!(days_between(pair[0].date, pair[1].date), 1);
        }
    }

    #[test]
    fn test_fill_gaps_empty() {
        assert!(fill_gaps(&[]).is_empty());
    }

    #[test]
    fn test_fill_gaps_single_day() {
        let series = fill_gaps(&[Observation::new(date(2024, 6, 1), 9.0)]);
        assert_eq!(series, vec![Observation::new(date(2024, 6, 1), 9.0)]);
    }
}
