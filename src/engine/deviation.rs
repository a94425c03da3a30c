/// Schedule deviation accounting
///
/// Deviation is the running balance of completions minus due times, summed
/// over every date strictly before an anchor. It starts from the habit's
/// start date, or from the enclosing period's start when period separation
/// is enabled.

use chrono::{Duration, NaiveDate};

use crate::domain::CompletionHistory;
use crate::engine::due::DueCalendar;

/// Computes deviation for a habit against a fixed history snapshot
#[derive(Debug, Clone, Copy)]
pub struct DeviationAccumulator<'a> {
    calendar: DueCalendar<'a>,
    history: &'a CompletionHistory,
    today: NaiveDate,
}

impl<'a> DeviationAccumulator<'a> {
    pub fn new(calendar: DueCalendar<'a>, history: &'a CompletionHistory, today: NaiveDate) -> Self {
        Self {
            calendar,
            history,
            today,
        }
    }

    pub fn calendar(&self) -> &DueCalendar<'a> {
        &self.calendar
    }

    pub fn history(&self) -> &'a CompletionHistory {
        self.history
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// First date after the summed range
    ///
    /// Past and present dates anchor on themselves. Future dates anchor on
    /// today, or on tomorrow once today has a completion.
    pub fn anchor(&self, date: NaiveDate) -> NaiveDate {
        if date <= self.today {
            date
        } else if self.history.is_completed(self.today) {
            self.today + Duration::days(1)
        } else {
            self.today
        }
    }

    /// Where accumulation starts for `date`
    pub fn range_start(&self, date: NaiveDate) -> NaiveDate {
        let schedule = self.calendar.schedule();
        if schedule.period_separation_enabled() {
            if let Some(period) = self.calendar.period_of(date) {
                return period.start;
            }
        }
        schedule.start_date
    }

    /// Deviation in effect on `date`
    pub fn deviation(&self, date: NaiveDate) -> f64 {
        let from = self.range_start(date);
        let anchor = self.anchor(date);
        if anchor <= from {
            return 0.0;
        }
        self.balance(from, anchor - Duration::days(1))
    }

    /// The habit's current deviation, as persisted on the habit record
    pub fn current(&self) -> f64 {
        let schedule = self.calendar.schedule();
        let reference = schedule
            .end_date
            .map_or(self.today, |end| end.min(self.today));
        if reference < schedule.start_date {
            return 0.0;
        }

        let from = self.range_start(reference);
        let anchor = if self.history.is_completed(self.today) {
            self.today + Duration::days(1)
        } else {
            self.today
        };
        if anchor <= from {
            return 0.0;
        }
        self.balance(from, anchor - Duration::days(1))
    }

    /// Start of the window a backlog or completing-ahead check looks at
    pub fn lookahead_start(&self, date: NaiveDate) -> NaiveDate {
        self.anchor(date).max(self.range_start(date))
    }

    fn balance(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        self.history.sum_in(from..=to) - self.calendar.due_sum(from, to)
    }
}
