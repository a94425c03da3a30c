/// Completion records and the count history the engine reads
///
/// A `CompletionRecord` is the persisted outcome of one date for one habit.
/// `CompletionHistory` is the read-only view of completion counts by date that
/// the deviation accumulator and status computer work from.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HistoricalStatus};

/// The settled (or today's) outcome of a single date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Which day this record is for
    pub date: NaiveDate,
    /// How many times the habit was done; fractions are partial completion
    pub num_of_times_completed: f64,
    /// Outcome of the day
    pub status: HistoricalStatus,
    /// Completed-minus-due balance going into this date
    pub schedule_deviation: f64,
}

impl CompletionRecord {
    /// Create a record with validation
    pub fn new(
        date: NaiveDate,
        num_of_times_completed: f64,
        status: HistoricalStatus,
        schedule_deviation: f64,
    ) -> Result<Self, DomainError> {
        Self::validate_times_completed(num_of_times_completed)?;

        Ok(Self {
            date,
            num_of_times_completed,
            status,
            schedule_deviation,
        })
    }

    /// Validate a completion count
    pub fn validate_times_completed(times: f64) -> Result<(), DomainError> {
        if !times.is_finite() || times < 0.0 {
            return Err(DomainError::InvalidValue {
                message: format!("Times completed must be a non-negative number, got {}", times),
            });
        }
        Ok(())
    }
}

/// Completion counts by date
///
/// Dates without an entry were not completed. Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionHistory {
    counts: BTreeMap<NaiveDate, f64>,
}

impl CompletionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CompletionRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.set(record.date, record.num_of_times_completed);
        }
        history
    }

    pub fn times_completed(&self, date: NaiveDate) -> f64 {
        self.counts.get(&date).copied().unwrap_or(0.0)
    }

    pub fn is_completed(&self, date: NaiveDate) -> bool {
        self.times_completed(date) > 0.0
    }

    /// Set the count for a date; zero removes it
    pub fn set(&mut self, date: NaiveDate, times: f64) {
        if times > 0.0 {
            self.counts.insert(date, times);
        } else {
            self.counts.remove(&date);
        }
    }

    /// Total completions over an inclusive range
    pub fn sum_in(&self, range: RangeInclusive<NaiveDate>) -> f64 {
        if range.start() > range.end() {
            return 0.0;
        }
        self.counts.range(range).map(|(_, times)| *times).sum()
    }

    /// Latest completed date not after `bound`
    pub fn last_completed_on_or_before(&self, bound: NaiveDate) -> Option<NaiveDate> {
        self.counts.range(..=bound).next_back().map(|(date, _)| *date)
    }

    pub fn completed_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.counts.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_negative_times_rejected() {
        let result = CompletionRecord::new(date(1), -1.0, HistoricalStatus::Completed, 0.0);
        assert!(result.is_err());

        let result = CompletionRecord::new(date(1), f64::NAN, HistoricalStatus::Completed, 0.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_count_is_not_stored() {
        let mut history = CompletionHistory::new();
        history.set(date(2), 1.0);
        history.set(date(2), 0.0);

        assert!(!history.is_completed(date(2)));
        assert_eq!(history.completed_dates().count(), 0);
    }

    #[test]
    fn test_range_sum_and_last_completed() {
        let mut history = CompletionHistory::new();
        history.set(date(2), 1.0);
        history.set(date(5), 0.5);
        history.set(date(9), 2.0);

        assert_eq!(history.sum_in(date(1)..=date(5)), 1.5);
        assert_eq!(history.sum_in(date(6)..=date(5)), 0.0);
        assert_eq!(history.last_completed_on_or_before(date(8)), Some(date(5)));
        assert_eq!(history.last_completed_on_or_before(date(1)), None);
    }
}
