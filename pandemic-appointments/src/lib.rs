//! Appointment JSON (as served by the coordination backend) to contagious-case trends.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use pandemic_core::{DailySeries, TrendConfig, TrendError, TrendSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of an appointment request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    MissingData,
    Pending,
    Assigned,
    Finished,
}

/// The fields of a backend appointment that the trend view relies on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub hospital_assigned: Option<String>,
    #[serde(default)]
    pub contagious: Option<bool>,
    #[serde(default)]
    pub medical_specialty: Option<String>,
    /// The backend spells this field `prority`.
    #[serde(default, rename = "prority", alias = "priority")]
    pub priority: Option<String>,
    pub request_start_time: String,
}

impl Appointment {
    /// Calendar day of the request, taken from the date part of the timestamp.
    pub fn request_date(&self) -> Option<NaiveDate> {
        let date = self
            .request_start_time
            .split('T')
            .next()
            .unwrap_or_default()
            .trim();
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }

    pub fn is_contagious(&self) -> bool {
        self.contagious.unwrap_or(false)
    }
}

/// Selection applied before counting: date range, hospital, contagious flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub hospital_id: Option<String>,
    #[serde(default = "default_contagious_only")]
    pub contagious_only: bool,
}

fn default_contagious_only() -> bool {
    true
}

impl AppointmentFilter {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            hospital_id: None,
            contagious_only: true,
        }
    }

    pub fn with_hospital(mut self, hospital_id: impl Into<String>) -> Self {
        self.hospital_id = Some(hospital_id.into());
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.contagious_only && !appointment.is_contagious() {
            return false;
        }

        if let Some(hospital) = self.hospital_id.as_deref() {
            if appointment.hospital_assigned.as_deref() != Some(hospital) {
                return false;
            }
        }

        appointment
            .request_date()
            .is_some_and(|date| date >= self.start && date <= self.end)
    }
}

/// Number of appointments requested on each day.
///
/// Appointments with an unreadable `request_start_time` are skipped.
pub fn group_by_date<'a, I>(appointments: I) -> BTreeMap<NaiveDate, u32>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut by_date = BTreeMap::new();
    for appointment in appointments {
        match appointment.request_date() {
            Some(date) => *by_date.entry(date).or_insert(0) += 1,
            None => log::warn!(
                "appointment {} has unreadable request_start_time {:?}",
                appointment.id,
                appointment.request_start_time
            ),
        }
    }
    by_date
}

/// Appointments per assigned hospital id. Unassigned appointments are not counted.
pub fn cases_by_hospital<'a, I>(appointments: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut by_hospital = BTreeMap::new();
    for hospital in appointments
        .into_iter()
        .filter_map(|a| a.hospital_assigned.as_deref())
    {
        *by_hospital.entry(hospital.to_string()).or_insert(0) += 1;
    }
    by_hospital
}

/// Weekly distribution of request days, indexed Sunday (0) through Saturday (6).
pub fn cases_by_weekday<'a, I>(appointments: I) -> [u32; 7]
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut by_weekday = [0; 7];
    for date in appointments.into_iter().filter_map(Appointment::request_date) {
        by_weekday[date.weekday().num_days_from_sunday() as usize] += 1;
    }
    by_weekday
}

/// Weekday labels in the order used by [`cases_by_weekday`].
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Hospital and weekday distribution of the cases in a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseBreakdown {
    pub by_hospital: BTreeMap<String, u32>,
    pub by_weekday: [u32; 7],
}

/// Distribution of the appointments in `filter`'s range and contagious
/// selection, across every hospital.
///
/// The hospital filter is ignored so all hospitals can be compared.
pub fn case_breakdown(appointments: &[Appointment], filter: &AppointmentFilter) -> CaseBreakdown {
    let all_hospitals = AppointmentFilter {
        hospital_id: None,
        ..filter.clone()
    };
    let selected: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| all_hospitals.matches(a))
        .collect();

    CaseBreakdown {
        by_hospital: cases_by_hospital(selected.iter().copied()),
        by_weekday: cases_by_weekday(selected.iter().copied()),
    }
}

/// Contiguous daily counts of the appointments selected by `filter`.
pub fn daily_series(
    appointments: &[Appointment],
    filter: &AppointmentFilter,
) -> Result<DailySeries, TrendError> {
    let selected = appointments.iter().filter(|a| filter.matches(a));
    DailySeries::from_range(filter.start, filter.end, &group_by_date(selected))
}

/// Read appointments from a JSON array or a `{"data": [...]}` envelope.
pub fn parse_appointments_str(json: &str) -> Result<Vec<Appointment>, TrendError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TrendError::Parse(err.to_string()))?;
    parse_appointments_value(&value)
}

/// Read appointments from an already parsed JSON value.
///
/// Entries that do not look like appointments are skipped with a warning so a
/// single malformed record does not hide the rest of the trend.
pub fn parse_appointments_value(value: &Value) -> Result<Vec<Appointment>, TrendError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(envelope) => envelope
            .get("data")
            .and_then(Value::as_array)
            .ok_or(TrendError::MissingData)?,
        other => {
            return Err(TrendError::Parse(format!(
                "expected an array of appointments, received {}",
                json_kind(other)
            )))
        }
    };

    let mut appointments = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match Appointment::deserialize(entry) {
            Ok(appointment) => appointments.push(appointment),
            Err(err) => log::warn!("skipping appointment #{index}: {err}"),
        }
    }
    Ok(appointments)
}

/// Analyze appointments given as JSON text.
pub fn analyze_appointments_str(
    json: &str,
    filter: &AppointmentFilter,
    config: &TrendConfig,
) -> Result<TrendSummary, TrendError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| TrendError::Parse(err.to_string()))?;
    analyze_appointments_value(&value, filter, config)
}

/// Analyze appointments given as a `serde_json::Value`.
pub fn analyze_appointments_value(
    value: &Value,
    filter: &AppointmentFilter,
    config: &TrendConfig,
) -> Result<TrendSummary, TrendError> {
    let appointments = parse_appointments_value(value)?;
    analyze_appointments(&appointments, filter, config)
}

/// Build the trend summary for `filter` over already parsed appointments.
///
/// Without any appointment the summary is empty and carries no forecast.
pub fn analyze_appointments(
    appointments: &[Appointment],
    filter: &AppointmentFilter,
    config: &TrendConfig,
) -> Result<TrendSummary, TrendError> {
    if appointments.is_empty() {
        log::debug!("no appointments supplied, returning empty trend");
        return TrendSummary::empty(filter.start, filter.end);
    }

    let series = daily_series(appointments, filter)?;
    log::debug!(
        "{} of {} appointments selected for {}..{}",
        series.total(),
        appointments.len(),
        filter.start,
        filter.end
    );
    TrendSummary::build_with_config(&series, config)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
