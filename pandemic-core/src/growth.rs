//! Day-over-day growth-rate estimation over a trailing window.

use serde::{Deserialize, Serialize};

/// How the growth rate is estimated from the trailing window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStrategy {
    /// Compound rate between the oldest count and a linearly weighted average
    /// that favours recent days.
    #[default]
    WeightedAverage,
    /// `exp(slope) - 1` of an OLS line fitted to `ln(count)`.
    LogLinear,
}

impl std::str::FromStr for GrowthStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "weighted_average" | "weighted" => Ok(Self::WeightedAverage),
            "log_linear" | "regression" => Ok(Self::LogLinear),
            other => Err(format!("unknown growth strategy: {other}")),
        }
    }
}

/// Estimate the average proportional change per day of `counts`.
///
/// Only the last `min(window_days, counts.len())` values are used. Fewer than
/// two usable points yield `0.0`. The result is unbounded and negative for a
/// declining series.
pub fn growth_rate(counts: &[u32], window_days: usize, strategy: GrowthStrategy) -> f64 {
    if counts.len() < 2 {
        return 0.0;
    }

    let window = &counts[counts.len() - window_days.min(counts.len())..];
    if window.len() < 2 {
        return 0.0;
    }

    let rate = match strategy {
        GrowthStrategy::WeightedAverage => weighted_average_rate(window),
        GrowthStrategy::LogLinear => log_linear_rate(window),
    };

    log::debug!(
        "growth rate over {} days ({:?}): {rate:.6}",
        window.len(),
        strategy
    );
    rate
}

fn weighted_average_rate(window: &[u32]) -> f64 {
    let n = window.len() as f64;
    let weighted_sum: f64 = window
        .iter()
        .enumerate()
        .map(|(index, &count)| f64::from(count) * (index as f64 + 1.0))
        .sum();
    let total_weight = n * (n + 1.0) / 2.0;
    let weighted_average = weighted_sum / total_weight;

    // Both ends floored at 1 so an empty day never divides by zero.
    let initial = f64::from(window[0]).max(1.0);
    let last = weighted_average.max(1.0);

    (last / initial).powf(1.0 / (n - 1.0)) - 1.0
}

fn log_linear_rate(window: &[u32]) -> f64 {
    let n = window.len() as f64;
    let logs: Vec<f64> = window
        .iter()
        .map(|&count| f64::from(count.max(1)).ln())
        .collect();

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = logs.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in logs.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };

    slope.exp() - 1.0
}
