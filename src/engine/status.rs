/// Per-date status computation
///
/// `HabitStatusComputer` is a pure function of a habit, its completion counts,
/// its vacations and "today". It never reads or writes storage, so the same
/// snapshot can be queried from anywhere.

use chrono::{Duration, NaiveDate};

use crate::domain::{CompletionHistory, CompletionRecord, Habit, HabitStatus, HistoricalStatus, Vacation};
use crate::engine::days_between;
use crate::engine::deviation::DeviationAccumulator;
use crate::engine::due::DueCalendar;

/// Derives the status of any date for one habit
#[derive(Debug, Clone, Copy)]
pub struct HabitStatusComputer<'a> {
    habit: &'a Habit,
    accumulator: DeviationAccumulator<'a>,
}

impl<'a> HabitStatusComputer<'a> {
    pub fn new(
        habit: &'a Habit,
        history: &'a CompletionHistory,
        vacations: &'a [Vacation],
        today: NaiveDate,
    ) -> Self {
        let calendar = DueCalendar::new(habit, vacations);
        Self {
            habit,
            accumulator: DeviationAccumulator::new(calendar, history, today),
        }
    }

    pub fn habit(&self) -> &'a Habit {
        self.habit
    }

    pub fn today(&self) -> NaiveDate {
        self.accumulator.today()
    }

    pub fn calendar(&self) -> &DueCalendar<'a> {
        self.accumulator.calendar()
    }

    pub fn accumulator(&self) -> &DeviationAccumulator<'a> {
        &self.accumulator
    }

    pub fn history(&self) -> &'a CompletionHistory {
        self.accumulator.history()
    }

    pub fn num_of_due_times(&self, date: NaiveDate) -> f64 {
        self.calendar().due_times(date)
    }

    pub fn schedule_deviation(&self, date: NaiveDate) -> f64 {
        self.accumulator.deviation(date)
    }

    /// Status of a single date
    pub fn status(&self, date: NaiveDate) -> HabitStatus {
        let schedule = &self.habit.schedule;
        if date < schedule.start_date {
            return HabitStatus::NotStarted;
        }
        if schedule.end_date.map_or(false, |end| date > end) {
            return HabitStatus::Finished;
        }

        let completed = self.history().times_completed(date);

        if self.calendar().is_on_vacation(date) {
            if completed <= 0.0 {
                return HabitStatus::OnVacation;
            }
            return if self.has_backlog(date) {
                HabitStatus::SortedOutBacklogOnVacation
            } else {
                HabitStatus::OverCompletedOnVacation
            };
        }

        let due = self.num_of_due_times(date);

        if completed > 0.0 {
            return if completed < due {
                HabitStatus::PartiallyCompleted
            } else if completed > due {
                if self.has_backlog(date) {
                    HabitStatus::SortedOutBacklog
                } else {
                    HabitStatus::OverCompleted
                }
            } else {
                HabitStatus::Completed
            };
        }

        if due <= 0.0 {
            return if date >= self.today() && self.has_backlog(date) {
                HabitStatus::Backlog
            } else {
                HabitStatus::NotDue
            };
        }

        if self.is_already_completed(date) {
            return HabitStatus::AlreadyCompleted;
        }
        if date >= self.today() {
            return HabitStatus::Planned;
        }
        if self.is_completed_later(date, due) {
            return HabitStatus::CompletedLater;
        }
        HabitStatus::Failed
    }

    /// Statuses for every date in an inclusive range
    pub fn statuses(&self, from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, HabitStatus)> {
        days_between(from, to)
            .map(|date| (date, self.status(date)))
            .collect()
    }

    /// The record that settles `date`, if it can be settled
    ///
    /// `Planned` and `Backlog` dates have no settled form.
    pub fn settled_record(&self, date: NaiveDate) -> Option<CompletionRecord> {
        let status = HistoricalStatus::settled_from(self.status(date))?;
        Some(CompletionRecord {
            date,
            num_of_times_completed: self.history().times_completed(date),
            status,
            schedule_deviation: self.schedule_deviation(date),
        })
    }

    /// Whether a negative balance is large enough that extra work on `date`
    /// pays off a missed date rather than merely over-completing
    ///
    /// For today and later, not-due dates between the anchor and `date` can
    /// absorb backlog on their own, so the deficit must exceed their capacity.
    fn has_backlog(&self, date: NaiveDate) -> bool {
        if !self.habit.schedule.backlog_enabled {
            return false;
        }
        let deviation = self.schedule_deviation(date);
        if deviation >= 0.0 {
            return false;
        }

        let absorbable = if date < self.today() {
            0.0
        } else {
            let from = self.accumulator.lookahead_start(date);
            self.calendar().absorbable_sum(from, date)
        };
        deviation <= -absorbable
    }

    /// Whether earlier surplus already covers every due time up to `date`
    fn is_already_completed(&self, date: NaiveDate) -> bool {
        if !self.habit.schedule.completing_ahead_enabled {
            return false;
        }
        let deviation = self.schedule_deviation(date);
        if deviation <= 0.0 {
            return false;
        }
        let from = self.accumulator.lookahead_start(date);
        deviation >= self.calendar().due_sum(from, date)
    }

    /// Whether later surplus, up to the last completion, covers this missed date
    fn is_completed_later(&self, date: NaiveDate, due: f64) -> bool {
        let schedule = &self.habit.schedule;
        if !schedule.backlog_enabled {
            return false;
        }
        let Some(mut limit) = self.history().last_completed_on_or_before(self.today()) else {
            return false;
        };
        if schedule.period_separation_enabled() {
            if let Some(period) = self.calendar().period_of(date) {
                limit = limit.min(period.end);
            }
        }
        if let Some(end) = schedule.end_date {
            limit = limit.min(end);
        }

        let mut surplus = 0.0;
        for later in days_between(date + Duration::days(1), limit) {
            surplus += self.history().times_completed(later) - self.num_of_due_times(later);
            if surplus >= due {
                return true;
            }
        }
        false
    }
}
