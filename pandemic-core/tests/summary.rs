use std::collections::BTreeMap;

use chrono::NaiveDate;
use pandemic_core::{
    DailySeries, ForecastShape, GrowthStrategy, ProjectionModel, TrendConfig, TrendDirection,
    TrendError, TrendSummary,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn series_fills_missing_days_with_zero() {
    let mut by_date = BTreeMap::new();
    by_date.insert(day(2024, 3, 1), 4);
    by_date.insert(day(2024, 3, 4), 9);
    by_date.insert(day(2024, 4, 1), 50);

    let series = DailySeries::from_range(day(2024, 3, 1), day(2024, 3, 5), &by_date)
        .expect("valid range");

    assert_eq!(series.counts(), &[4, 0, 0, 9, 0]);
    assert_eq!(series.end(), day(2024, 3, 5));
    assert_eq!(series.total(), 13);
    assert_eq!(series.peak(), Some(day(2024, 3, 4)));
    assert!((series.daily_average() - 2.6).abs() < 1e-12);
}

#[test]
fn inverted_range_is_an_error() {
    let err = DailySeries::from_range(day(2024, 3, 5), day(2024, 3, 1), &BTreeMap::new())
        .expect_err("range must be rejected");
    assert!(matches!(err, TrendError::InvalidRange { .. }));
}

#[test]
fn peak_prefers_earliest_maximum() {
    let series = DailySeries::new(day(2024, 1, 1), vec![2, 7, 1, 7]);
    assert_eq!(series.peak(), Some(day(2024, 1, 2)));
    assert_eq!(DailySeries::new(day(2024, 1, 1), Vec::new()).peak(), None);
}

#[test]
fn summary_reports_growth_and_forecast() {
    let series = DailySeries::new(day(2024, 5, 1), vec![1, 2, 4, 8, 16, 32, 64]);
    let config = TrendConfig {
        strategy: GrowthStrategy::LogLinear,
        horizon_days: 3,
        ..TrendConfig::default()
    };

    let mut rng = StdRng::seed_from_u64(8);
    let summary = TrendSummary::build(&series, &config, &mut rng).expect("summary");

    assert_eq!(summary.total_cases, 127);
    assert_eq!(summary.peak_day, Some(day(2024, 5, 7)));
    assert_eq!(summary.direction, TrendDirection::Increasing);
    assert_eq!(summary.model, ProjectionModel::Exponential);
    assert_eq!(summary.window_days_used, 7);
    assert_eq!(summary.growth_percent(1), "100.0%");

    let dates: Vec<NaiveDate> = summary.predictions.iter().map(|p| p.date).collect();
    assert_eq!(dates, [day(2024, 5, 8), day(2024, 5, 9), day(2024, 5, 10)]);
}

#[test]
fn zero_last_day_projects_from_one() {
    let series = DailySeries::new(day(2024, 5, 1), vec![0, 0, 0]);
    let config = TrendConfig {
        horizon_days: 1,
        shape: ForecastShape::deterministic(),
        ..TrendConfig::default()
    };

    let summary = TrendSummary::build_with_config(&series, &config).expect("summary");
    assert_eq!(summary.direction, TrendDirection::Stable);
    assert_eq!(summary.model, ProjectionModel::Stable);
    // 1 * wave(1) rounds back to 1.
    assert_eq!(summary.predictions[0].value, 1);
}

#[test]
fn seeded_config_is_reproducible() {
    let series = DailySeries::new(day(2024, 5, 1), vec![5, 6, 8, 7, 9, 12, 15]);
    let config = TrendConfig {
        seed: Some(42),
        horizon_days: 10,
        ..TrendConfig::default()
    };

    let first = TrendSummary::build_with_config(&series, &config).expect("summary");
    let second = TrendSummary::build_with_config(&series, &config).expect("summary");
    assert_eq!(first, second);
}

#[test]
fn horizon_is_clamped_to_dashboard_bounds() {
    let config = TrendConfig {
        horizon_days: 90,
        ..TrendConfig::default()
    };
    assert_eq!(config.clamped_horizon(), 30);

    let config = TrendConfig {
        horizon_days: 0,
        ..TrendConfig::default()
    };
    assert_eq!(config.clamped_horizon(), 1);

    assert_eq!(TrendConfig::parse_horizon("14"), 14);
    assert_eq!(TrendConfig::parse_horizon("250"), 30);
    assert_eq!(TrendConfig::parse_horizon("-3"), 1);
    assert_eq!(TrendConfig::parse_horizon("0"), 7);
    assert_eq!(TrendConfig::parse_horizon("soon"), 7);
    assert_eq!(TrendConfig::parse_horizon("12abc"), 12);
    assert_eq!(TrendConfig::parse_horizon("3.7"), 3);
    assert_eq!(TrendConfig::parse_horizon("  +5 days"), 5);
    assert_eq!(TrendConfig::parse_horizon("-0"), 7);
    assert_eq!(TrendConfig::parse_horizon("99999999999999999999"), 30);
}

#[test]
fn invalid_config_is_rejected_before_building() {
    let series = DailySeries::new(day(2024, 5, 1), vec![1, 2]);
    let config = TrendConfig {
        window_days: 0,
        ..TrendConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(
        TrendSummary::build(&series, &config, &mut rng),
        Err(TrendError::InvalidConfig(_))
    ));
}

#[test]
fn direction_and_model_labels() {
    assert_eq!(TrendDirection::from_rate(-0.2), TrendDirection::Decreasing);
    assert_eq!(ProjectionModel::from_rate(0.005), ProjectionModel::Linear);
    assert_eq!(ProjectionModel::from_rate(-0.05), ProjectionModel::Exponential);
}

#[test]
fn config_deserializes_with_defaults() {
    let config: TrendConfig =
        serde_json::from_str(r#"{"strategy": "log_linear", "shape": {"jitter": 0.0}}"#)
            .expect("config");
    assert_eq!(config.strategy, GrowthStrategy::LogLinear);
    assert_eq!(config.window_days, 7);
    assert_eq!(config.shape.jitter, 0.0);
    assert_eq!(config.shape.wave_divisor, 3.0);
}

#[test]
fn empty_summary_covers_range() {
    let summary = TrendSummary::empty(day(2024, 1, 1), day(2024, 1, 3)).expect("summary");
    assert_eq!(summary.daily_counts, vec![0, 0, 0]);
    assert!(summary.predictions.is_empty());
}
