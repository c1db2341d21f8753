//! Stylized forecast line extrapolated from the growth rate.

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{Prediction, TrendError};

/// Multiplicative adjustments layered onto the exponential extrapolation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastShape {
    /// Half-width of the uniform jitter factor, `[1 - jitter, 1 + jitter]`.
    /// Zero disables randomness entirely.
    pub jitter: f64,
    /// Amplitude of the `1 + a * sin(i / divisor)` wave.
    pub wave_amplitude: f64,
    pub wave_divisor: f64,
}

impl Default for ForecastShape {
    fn default() -> Self {
        Self {
            jitter: 0.1,
            wave_amplitude: 0.1,
            wave_divisor: 3.0,
        }
    }
}

impl ForecastShape {
    /// Shape without jitter: the forecast becomes a pure function of its inputs.
    pub fn deterministic() -> Self {
        Self {
            jitter: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), TrendError> {
        if !self.jitter.is_finite() || !(0.0..1.0).contains(&self.jitter) {
            return Err(TrendError::InvalidConfig(format!(
                "jitter must be in [0, 1), received {}",
                self.jitter
            )));
        }
        if !self.wave_amplitude.is_finite() {
            return Err(TrendError::InvalidConfig(
                "wave_amplitude must be finite".to_string(),
            ));
        }
        if !self.wave_divisor.is_finite() || self.wave_divisor <= 0.0 {
            return Err(TrendError::InvalidConfig(format!(
                "wave_divisor must be positive, received {}",
                self.wave_divisor
            )));
        }
        Ok(())
    }

    fn jitter_factor<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.jitter == 0.0 {
            return 1.0;
        }
        rng.gen_range(1.0 - self.jitter..=1.0 + self.jitter)
    }

    fn wave_factor(&self, step: f64) -> f64 {
        1.0 + self.wave_amplitude * (step / self.wave_divisor).sin()
    }
}

/// Lazy sequence of [`Prediction`]s for the days after `start`.
///
/// Yields exactly `days` items, one calendar day apart, starting at
/// `start + 1`. A forecast that would run past `NaiveDate::MAX` is cut short
/// on that date, and the reported length accounts for the cut.
pub struct Forecast<'a, R: ?Sized> {
    value: f64,
    growth_rate: f64,
    start: NaiveDate,
    days: u32,
    step: u32,
    shape: ForecastShape,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> Forecast<'a, R> {
    pub fn new(
        last_value: f64,
        growth_rate: f64,
        start: NaiveDate,
        days: u32,
        shape: ForecastShape,
        rng: &'a mut R,
    ) -> Self {
        Self {
            value: last_value,
            growth_rate,
            start,
            days,
            step: 0,
            shape,
            rng,
        }
    }
}

impl<R: Rng + ?Sized> Iterator for Forecast<'_, R> {
    type Item = Prediction;

    fn next(&mut self) -> Option<Prediction> {
        if self.step >= self.days {
            return None;
        }
        self.step += 1;

        let Some(date) = self.start.checked_add_days(Days::new(u64::from(self.step))) else {
            // Past the last representable date: stop for good.
            self.step = self.days;
            return None;
        };

        let step = f64::from(self.step);
        let jitter = self.shape.jitter_factor(self.rng);
        let wave = self.shape.wave_factor(step);
        let momentum = 1.0 + self.growth_rate * (step + 1.0).ln();

        self.value *= (1.0 + self.growth_rate) * jitter * wave * momentum;

        Some(Prediction {
            date,
            // Strong negative momentum can push the running value below zero.
            value: self.value.max(0.0).round() as u64,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let representable = NaiveDate::MAX
            .signed_duration_since(self.start)
            .num_days()
            .saturating_sub(i64::from(self.step))
            .max(0);
        let remaining = i64::from(self.days - self.step).min(representable) as usize;
        (remaining, Some(remaining))
    }
}

impl<R: Rng + ?Sized> ExactSizeIterator for Forecast<'_, R> {}

/// Predict `days` values after `start`, drawing jitter from `rng`.
pub fn generate_predictions<R: Rng + ?Sized>(
    last_value: f64,
    growth_rate: f64,
    start: NaiveDate,
    days: u32,
    shape: &ForecastShape,
    rng: &mut R,
) -> Vec<Prediction> {
    Forecast::new(last_value, growth_rate, start, days, *shape, rng).collect()
}

/// Reproducible variant: identical inputs and seed give identical output.
pub fn generate_predictions_seeded(
    last_value: f64,
    growth_rate: f64,
    start: NaiveDate,
    days: u32,
    shape: &ForecastShape,
    seed: u64,
) -> Vec<Prediction> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_predictions(last_value, growth_rate, start, days, shape, &mut rng)
}

/// Variant drawing from the thread-local entropy source; every call differs
/// unless `shape.jitter` is zero.
pub fn generate_predictions_with_entropy(
    last_value: f64,
    growth_rate: f64,
    start: NaiveDate,
    days: u32,
    shape: &ForecastShape,
) -> Vec<Prediction> {
    generate_predictions(
        last_value,
        growth_rate,
        start,
        days,
        shape,
        &mut rand::thread_rng(),
    )
}
