//! Benchmarks for gigstats analysis and categorization
//!
//! Run with: cargo bench

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use gigstats::categorizer::{AdaptiveCategorizer, ModelStore, TrainingExample};
use gigstats::series::{add_days, Observation};
use gigstats::trend::{analyze_multi_metric, analyze_trend, detect_change_points};
use tempfile::tempdir;

fn create_test_series(days: usize) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    (0..days)
        .map(|i| {
            let weekend = if i % 7 >= 5 { 1.4 } else { 1.0 };
            let level = if i > days / 2 { 180.0 } else { 120.0 };
            let noise = ((i * 37) % 11) as f64 - 5.0;
            Observation::new(add_days(start, i as i64), (level + 0.2 * i as f64 + noise) * weekend)
        })
        .collect()
}

fn create_training_examples(count: usize) -> Vec<TrainingExample> {
    let templates = [
        ("Shell gas station", "Gas", 40.0),
        ("Chevron fuel", "Gas", 45.0),
        ("Kroger grocery", "Groceries", 90.0),
        ("Chipotle lunch", "Meals", 12.0),
        ("Verizon phone bill", "Phone", 70.0),
        ("Jiffy Lube oil change", "Maintenance", 60.0),
    ];
    (0..count)
        .map(|i| {
            let (desc, category, amount) = templates[i % templates.len()];
            TrainingExample::new(desc, amount + (i % 9) as f64, category)
        })
        .collect()
}

fn bench_trend(c: &mut Criterion) {
    let mut group = c.benchmark_group("trend");

    for days in [30, 365, 1825] {
        let series = create_test_series(days);

        group.throughput(Throughput::Elements(days as u64));

        group.bench_function(format!("analyze_trend_{}", days), |b| {
            b.iter(|| analyze_trend(black_box(&series), "Earnings"))
        });

        let values: Vec<f64> = series.iter().map(|o| o.value).collect();
        group.bench_function(format!("change_points_{}", days), |b| {
            b.iter(|| detect_change_points(black_box(&values), 7))
        });
    }

    let earnings = create_test_series(365);
    let expenses: Vec<Observation> = earnings
        .iter()
        .map(|o| Observation::new(o.date, o.value * 0.3))
        .collect();
    let fees: Vec<Observation> = earnings
        .iter()
        .map(|o| Observation::new(o.date, o.value * 0.1))
        .collect();
    group.bench_function("multi_metric_365", |b| {
        b.iter(|| analyze_multi_metric(black_box(&earnings), &expenses, &fees))
    });

    group.finish();
}

fn bench_categorizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("categorizer");

    let examples = create_training_examples(600);

    group.throughput(Throughput::Elements(examples.len() as u64));
    group.bench_function("train_batch_600", |b| {
        b.iter(|| {
            let mut categorizer = AdaptiveCategorizer::new();
            categorizer.train_batch(black_box(&examples));
            categorizer
        })
    });

    let mut categorizer = AdaptiveCategorizer::new();
    categorizer.train_batch(&examples);

    group.throughput(Throughput::Elements(1));
    group.bench_function("predict", |b| {
        b.iter(|| categorizer.predict(black_box("Shell fill-up"), Some("Shell"), 42.0))
    });

    group.bench_function("save_model", |b| {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("model.json"));
        b.iter(|| store.save(black_box(categorizer.model())).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_trend, bench_categorizer);
criterion_main!(benches);
