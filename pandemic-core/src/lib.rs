//! Core logic for the contagious-case trend view: growth rate, forecast and summary.

mod forecast;
mod growth;
mod series;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use forecast::{
    generate_predictions, generate_predictions_seeded, generate_predictions_with_entropy,
    Forecast, ForecastShape,
};
pub use growth::{growth_rate, GrowthStrategy};
pub use series::DailySeries;

/// Growth-rate window used by the dashboard.
pub const DEFAULT_WINDOW_DAYS: usize = 7;
/// Prediction horizon used when the user has not chosen one.
pub const DEFAULT_HORIZON_DAYS: u32 = 7;
/// Upper bound of the horizon input.
pub const MAX_HORIZON_DAYS: u32 = 30;

/// Rates at or below this magnitude are presented as a linear projection.
const EXPONENTIAL_THRESHOLD: f64 = 0.01;

/// Tuning for the trend estimator and the forecast line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfig {
    /// Trailing window (days) used to estimate the growth rate.
    pub window_days: usize,
    pub strategy: GrowthStrategy,
    /// Number of future days to predict.
    pub horizon_days: u32,
    pub max_horizon_days: u32,
    pub shape: ForecastShape,
    /// Seed for a reproducible forecast. `None` draws from process entropy.
    pub seed: Option<u64>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            strategy: GrowthStrategy::default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_horizon_days: MAX_HORIZON_DAYS,
            shape: ForecastShape::default(),
            seed: None,
        }
    }
}

impl TrendConfig {
    /// Check that every parameter produces a meaningful forecast.
    pub fn validate(&self) -> Result<(), TrendError> {
        if self.window_days == 0 {
            return Err(TrendError::InvalidConfig(
                "window_days must be at least 1".to_string(),
            ));
        }
        if self.max_horizon_days == 0 {
            return Err(TrendError::InvalidConfig(
                "max_horizon_days must be at least 1".to_string(),
            ));
        }
        self.shape.validate()
    }

    /// Horizon bounded to `1..=max_horizon_days`.
    pub fn clamped_horizon(&self) -> u32 {
        self.horizon_days.clamp(1, self.max_horizon_days.max(1))
    }

    /// Interpret the free-text horizon field of the dashboard.
    ///
    /// Only the leading integer counts, so `"12abc"` reads as 12 and `"3.7"` as
    /// 3. Input without a leading integer, or zero, falls back to
    /// [`DEFAULT_HORIZON_DAYS`]; the result is clamped to `1..=MAX_HORIZON_DAYS`.
    pub fn parse_horizon(input: &str) -> u32 {
        let text = input.trim_start();
        let (negative, rest) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let digits = rest[..digits_len].trim_start_matches('0');
        if digits.is_empty() {
            return DEFAULT_HORIZON_DAYS;
        }
        if negative {
            return 1;
        }

        // Too many digits for u32 still means "as far as allowed".
        digits
            .parse::<u32>()
            .map_or(MAX_HORIZON_DAYS, |days| days.clamp(1, MAX_HORIZON_DAYS))
    }
}

/// Direction shown next to the growth rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn from_rate(rate: f64) -> Self {
        if rate > 0.0 {
            Self::Increasing
        } else if rate < 0.0 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

/// Label describing the shape of the projection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionModel {
    Exponential,
    Linear,
    Stable,
}

impl ProjectionModel {
    pub fn from_rate(rate: f64) -> Self {
        if rate == 0.0 {
            Self::Stable
        } else if rate.abs() > EXPONENTIAL_THRESHOLD {
            Self::Exponential
        } else {
            Self::Linear
        }
    }
}

/// One forecast point. The value is an estimate, never a measurement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prediction {
    pub date: NaiveDate,
    pub value: u64,
}

/// Everything the trend panel displays for one date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily_counts: Vec<u32>,
    pub total_cases: u64,
    pub daily_average: f64,
    pub peak_day: Option<NaiveDate>,
    pub growth_rate: f64,
    pub direction: TrendDirection,
    pub model: ProjectionModel,
    pub window_days_used: usize,
    pub predictions: Vec<Prediction>,
}

impl TrendSummary {
    /// Build the summary of `series`, forecasting from the day after its end.
    ///
    /// A last day with no cases still projects from a baseline of 1.
    pub fn build<R>(series: &DailySeries, config: &TrendConfig, rng: &mut R) -> Result<Self, TrendError>
    where
        R: rand::Rng + ?Sized,
    {
        config.validate()?;

        let counts = series.counts();
        let rate = growth_rate(counts, config.window_days, config.strategy);
        let baseline = match series.last_value() {
            Some(0) | None => 1,
            Some(value) => value,
        };

        let predictions = generate_predictions(
            f64::from(baseline),
            rate,
            series.end(),
            config.clamped_horizon(),
            &config.shape,
            rng,
        );

        log::debug!(
            "trend {}..{}: rate {:.4}, {} predictions",
            series.start(),
            series.end(),
            rate,
            predictions.len()
        );

        Ok(Self {
            start: series.start(),
            end: series.end(),
            daily_counts: counts.to_vec(),
            total_cases: series.total(),
            daily_average: series.daily_average(),
            peak_day: series.peak(),
            growth_rate: rate,
            direction: TrendDirection::from_rate(rate),
            model: ProjectionModel::from_rate(rate),
            window_days_used: config.window_days.min(counts.len()),
            predictions,
        })
    }

    /// Build with the randomness policy of `config`: seeded when `seed` is
    /// set, process entropy otherwise.
    pub fn build_with_config(series: &DailySeries, config: &TrendConfig) -> Result<Self, TrendError> {
        use rand::SeedableRng;

        match config.seed {
            Some(seed) => Self::build(series, config, &mut rand::rngs::StdRng::seed_from_u64(seed)),
            None => Self::build(series, config, &mut rand::thread_rng()),
        }
    }

    /// Summary for a range without any data: zero counts, no forecast.
    pub fn empty(start: NaiveDate, end: NaiveDate) -> Result<Self, TrendError> {
        let series = DailySeries::from_range(start, end, &Default::default())?;
        Ok(Self {
            start,
            end,
            daily_counts: series.counts().to_vec(),
            total_cases: 0,
            daily_average: 0.0,
            peak_day: None,
            growth_rate: 0.0,
            direction: TrendDirection::Stable,
            model: ProjectionModel::Stable,
            window_days_used: 0,
            predictions: Vec::new(),
        })
    }

    /// Growth rate formatted as a percentage with `decimals` digits.
    pub fn growth_percent(&self, decimals: usize) -> String {
        format!("{:.*}%", decimals, self.growth_rate * 100.0)
    }
}

/// Errors raised while preparing trend data.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("input is missing the minimum required data")]
    MissingData,
    #[error("could not read input: {0}")]
    Parse(String),
    #[error("date range ends ({end}) before it starts ({start})")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
