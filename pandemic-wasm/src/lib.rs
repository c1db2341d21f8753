//! Framework-neutral WASM <-> JavaScript bridge for the pandemic tracking view.

use chrono::NaiveDate;
use pandemic_appointments::AppointmentFilter;
use pandemic_core::{GrowthStrategy, TrendConfig, TrendError};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsTrendConfig {
    #[serde(default)]
    window_days: Option<usize>,
    #[serde(default)]
    strategy: Option<GrowthStrategy>,
    #[serde(default)]
    horizon_days: Option<u32>,
    #[serde(default)]
    jitter: Option<f64>,
    #[serde(default)]
    max_horizon_days: Option<u32>,
    #[serde(default)]
    wave_amplitude: Option<f64>,
    #[serde(default)]
    wave_divisor: Option<f64>,
    #[serde(default)]
    seed: Option<u64>,
}

impl From<JsTrendConfig> for TrendConfig {
    fn from(cfg: JsTrendConfig) -> Self {
        let mut base = TrendConfig::default();
        if let Some(window) = cfg.window_days {
            base.window_days = window;
        }
        if let Some(strategy) = cfg.strategy {
            base.strategy = strategy;
        }
        if let Some(days) = cfg.horizon_days {
            base.horizon_days = days;
        }
        if let Some(max) = cfg.max_horizon_days {
            base.max_horizon_days = max;
        }
        if let Some(jitter) = cfg.jitter {
            base.shape.jitter = jitter;
        }
        if let Some(amplitude) = cfg.wave_amplitude {
            base.shape.wave_amplitude = amplitude;
        }
        if let Some(divisor) = cfg.wave_divisor {
            base.shape.wave_divisor = divisor;
        }
        base.seed = cfg.seed;
        base
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsAppointmentFilter {
    start_date: String,
    end_date: String,
    #[serde(default)]
    hospital_id: Option<String>,
    #[serde(default)]
    contagious_only: Option<bool>,
}

impl TryFrom<JsAppointmentFilter> for AppointmentFilter {
    type Error = TrendError;

    fn try_from(js: JsAppointmentFilter) -> Result<Self, Self::Error> {
        let mut filter = AppointmentFilter::new(parse_date(&js.start_date)?, parse_date(&js.end_date)?);
        // The hospital dropdown uses an empty string for "all hospitals".
        filter.hospital_id = js.hospital_id.filter(|id| !id.is_empty());
        if let Some(contagious_only) = js.contagious_only {
            filter.contagious_only = contagious_only;
        }
        Ok(filter)
    }
}

/// Daily counts, growth rate and forecast for the selected appointments.
#[wasm_bindgen]
pub fn analyze_appointments(
    appointments: JsValue,
    filter: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init();

    let payload = read_payload(appointments)?;
    let filter = read_filter(filter)?;
    let cfg = read_config(config)?;

    let summary = pandemic_appointments::analyze_appointments_value(&payload, &filter, &cfg)
        .map_err(to_js_error)?;

    to_value(&summary)
        .map_err(|err| JsValue::from_str(&format!("could not serialize trend: {err}")))
}

/// Growth rate of `counts` using the configured window and strategy.
#[wasm_bindgen]
pub fn growth_rate(counts: Vec<u32>, config: Option<JsValue>) -> Result<f64, JsValue> {
    init();

    let cfg = read_config(config)?;
    Ok(pandemic_core::growth_rate(&counts, cfg.window_days, cfg.strategy))
}

/// Forecast `horizonDays` values following `start_date` (`YYYY-MM-DD`).
#[wasm_bindgen]
pub fn generate_predictions(
    last_value: f64,
    growth_rate: f64,
    start_date: String,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init();

    let cfg = read_config(config)?;
    let start = parse_date(&start_date).map_err(to_js_error)?;

    let predictions = match cfg.seed {
        Some(seed) => pandemic_core::generate_predictions_seeded(
            last_value,
            growth_rate,
            start,
            cfg.horizon_days,
            &cfg.shape,
            seed,
        ),
        None => pandemic_core::generate_predictions_with_entropy(
            last_value,
            growth_rate,
            start,
            cfg.horizon_days,
            &cfg.shape,
        ),
    };

    to_value(&predictions)
        .map_err(|err| JsValue::from_str(&format!("could not serialize predictions: {err}")))
}

/// Cases per hospital and per weekday (Sunday first) for the filter's range.
#[wasm_bindgen]
pub fn case_breakdown(appointments: JsValue, filter: JsValue) -> Result<JsValue, JsValue> {
    init();

    let payload = read_payload(appointments)?;
    let filter = read_filter(filter)?;
    let parsed = pandemic_appointments::parse_appointments_value(&payload).map_err(to_js_error)?;
    let breakdown = pandemic_appointments::case_breakdown(&parsed, &filter);

    to_value(&breakdown)
        .map_err(|err| JsValue::from_str(&format!("could not serialize breakdown: {err}")))
}

fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn read_payload(appointments: JsValue) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(appointments)
        .map_err(|err| JsValue::from_str(&format!("could not read appointments: {err}")))
}

fn read_filter(filter: JsValue) -> Result<AppointmentFilter, JsValue> {
    let filter: JsAppointmentFilter = from_value(filter)
        .map_err(|err| JsValue::from_str(&format!("could not read filter: {err}")))?;
    AppointmentFilter::try_from(filter).map_err(to_js_error)
}

fn read_config(config: Option<JsValue>) -> Result<TrendConfig, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsTrendConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            TrendConfig::from(cfg)
        }
        _ => TrendConfig::default(),
    };
    cfg.validate().map_err(to_js_error)?;
    Ok(cfg)
}

fn parse_date(text: &str) -> Result<NaiveDate, TrendError> {
    NaiveDate::parse_from_str(text.split('T').next().unwrap_or_default(), "%Y-%m-%d")
        .map_err(|err| TrendError::Parse(format!("invalid date {text:?}: {err}")))
}

fn to_js_error(err: TrendError) -> JsValue {
    JsValue::from_str(&format_trend_error(err))
}

fn format_trend_error(err: TrendError) -> String {
    format!("Trend error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pandemic_core::ForecastShape;

    #[test]
    fn partial_config_keeps_defaults() {
        let js: JsTrendConfig =
            serde_json::from_str(r#"{"strategy": "log_linear", "jitter": 0.0, "seed": 3}"#)
                .expect("config");
        let cfg = TrendConfig::from(js);

        assert_eq!(cfg.strategy, GrowthStrategy::LogLinear);
        assert_eq!(cfg.window_days, 7);
        assert_eq!(cfg.horizon_days, 7);
        assert_eq!(cfg.shape.jitter, 0.0);
        assert_eq!(cfg.shape.wave_divisor, ForecastShape::default().wave_divisor);
        assert_eq!(cfg.seed, Some(3));
    }

    #[test]
    fn shape_and_horizon_bounds_are_configurable() {
        let js: JsTrendConfig = serde_json::from_str(
            r#"{"wave_divisor": 5.0, "max_horizon_days": 14, "horizon_days": 20}"#,
        )
        .expect("config");
        let cfg = TrendConfig::from(js);

        assert_eq!(cfg.shape.wave_divisor, 5.0);
        assert_eq!(cfg.max_horizon_days, 14);
        assert_eq!(cfg.clamped_horizon(), 14);
        assert_eq!(cfg.shape.jitter, ForecastShape::default().jitter);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_hospital_means_all_hospitals() {
        let js: JsAppointmentFilter = serde_json::from_str(
            r#"{"startDate": "2024-03-01", "endDate": "2024-03-31T00:00:00.000Z", "hospitalId": ""}"#,
        )
        .expect("filter");
        let filter = AppointmentFilter::try_from(js).expect("filter");

        assert_eq!(filter.hospital_id, None);
        assert!(filter.contagious_only);
        assert_eq!(filter.end, NaiveDate::from_ymd_opt(2024, 3, 31).expect("date"));
    }

    #[test]
    fn bad_dates_are_reported() {
        assert!(matches!(parse_date("31/03/2024"), Err(TrendError::Parse(_))));
        assert!(format_trend_error(TrendError::MissingData).starts_with("Trend error:"));
    }
}
