use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use demand_calculator::calculator::{resample_mean, rolling_mean};
use demand_calculator::models::{ROLLING_1_YEAR, ROLLING_28_DAYS, SETTLEMENT_DATE, SETTLEMENT_PERIOD};
use demand_calculator::{DemandCalculator, DemandTransformer, Resample, TimePoint};
use polars::prelude::*;

const YEARS: usize = 3;

fn synthetic_points() -> Vec<TimePoint> {
    let start = NaiveDate::from_ymd_opt(2018, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    (0..YEARS * ROLLING_1_YEAR)
        .map(|i| {
            let period = (i % 48) as f64;
            let demand = 30000.0 + 5000.0 * (period / 48.0 * std::f64::consts::TAU).sin();
            TimePoint::new(start + Duration::minutes(30 * i as i64), demand)
        })
        .collect()
}

fn synthetic_raw_frame() -> DataFrame {
    let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    let mut dates = Vec::new();
    let mut periods = Vec::new();
    let mut demand = Vec::new();

    for day in 0..365 * YEARS {
        let date = (start + Duration::days(day as i64)).format("%d-%b-%Y").to_string();
        for period in 1..=48i64 {
            dates.push(date.clone());
            periods.push(period);
            demand.push(25000.0 + 300.0 * period as f64);
        }
    }

    df! {
        SETTLEMENT_DATE => dates,
        SETTLEMENT_PERIOD => periods,
        "ND" => demand,
    }
    .unwrap()
}

fn benchmark_rolling_means(c: &mut Criterion) {
    let points = synthetic_points();

    c.bench_function("rolling_mean_28_day", |b| {
        b.iter(|| black_box(rolling_mean(&points, ROLLING_28_DAYS)));
    });

    c.bench_function("rolling_mean_1_year", |b| {
        b.iter(|| black_box(rolling_mean(&points, ROLLING_1_YEAR)));
    });

    c.bench_function("resample_monthly", |b| {
        b.iter(|| black_box(resample_mean(&points, Resample::MonthStart)));
    });
}

fn benchmark_transform_and_group(c: &mut Criterion) {
    let raw = synthetic_raw_frame();
    let transformer = DemandTransformer::new(&[]);

    c.bench_function("transform_three_years", |b| {
        b.iter(|| black_box(transformer.transform(raw.clone()).unwrap()));
    });

    let transformed = transformer.transform(raw).unwrap();
    let calculator = DemandCalculator::new("ND");

    c.bench_function("diurnal_stats", |b| {
        b.iter(|| black_box(calculator.diurnal_stats(&transformed).unwrap()));
    });
}

criterion_group!(benches, benchmark_rolling_means, benchmark_transform_and_group);
criterion_main!(benches);
