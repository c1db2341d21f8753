use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::TrendError;

/// Contiguous per-day counts; `counts[i]` belongs to `start + i` days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailySeries {
    start: NaiveDate,
    counts: Vec<u32>,
}

impl DailySeries {
    pub fn new(start: NaiveDate, counts: Vec<u32>) -> Self {
        Self { start, counts }
    }

    /// Counts for every day of `start..=end`, zero where `by_date` has no entry.
    pub fn from_range(
        start: NaiveDate,
        end: NaiveDate,
        by_date: &BTreeMap<NaiveDate, u32>,
    ) -> Result<Self, TrendError> {
        if end < start {
            return Err(TrendError::InvalidRange { start, end });
        }

        let counts = start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|day| by_date.get(&day).copied().unwrap_or(0))
            .collect();

        Ok(Self { start, counts })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last covered day. Equals `start` for an empty series.
    pub fn end(&self) -> NaiveDate {
        let offset = self.counts.len().saturating_sub(1) as u64;
        self.start
            .checked_add_days(Days::new(offset))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.counts.len())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn daily_average(&self) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        self.total() as f64 / self.counts.len() as f64
    }

    /// First day holding the maximum count.
    pub fn peak(&self) -> Option<NaiveDate> {
        let max = *self.counts.iter().max()?;
        let index = self.counts.iter().position(|&c| c == max)?;
        self.dates().nth(index)
    }

    pub fn last_value(&self) -> Option<u32> {
        self.counts.last().copied()
    }
}
