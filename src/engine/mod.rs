/// Status engine: due dates, periods, deviation, statuses, reconciliation,
/// streaks and the orchestrator that persists them
///
/// Everything below `orchestrator` is pure and works on in-memory snapshots.

pub mod deviation;
pub mod due;
pub mod orchestrator;
pub mod period;
pub mod reconcile;
pub mod status;
pub mod streaks;

pub use deviation::DeviationAccumulator;
pub use due::{due_days_in_period, is_due_by_schedule, DueCalendar};
pub use orchestrator::{HistoryOrchestrator, MutationOutcome};
pub use period::{resolve_period, Period};
pub use reconcile::{HistoryLedger, Reconciliation, ReconciliationKind};
pub use status::HabitStatusComputer;
pub use streaks::{StreakCalculator, StreakRange};

use chrono::{Duration, NaiveDate};

use crate::domain::{CompletionHistory, CompletionRecord, Habit, HabitStatus, Vacation};

/// Every date in the inclusive range, empty when `from > to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let len = if to < from { 0 } else { (to - from).num_days() + 1 };
    (0..len).map(move |offset| from + Duration::days(offset))
}

/// Everything needed to answer status queries for one habit
#[derive(Debug, Clone)]
pub struct HabitSnapshot {
    pub habit: Habit,
    pub history: CompletionHistory,
    pub vacations: Vec<Vacation>,
}

impl HabitSnapshot {
    pub fn new(habit: Habit, records: &[CompletionRecord], vacations: Vec<Vacation>) -> Self {
        Self {
            habit,
            history: CompletionHistory::from_records(records),
            vacations,
        }
    }

    pub fn computer(&self, today: NaiveDate) -> HabitStatusComputer<'_> {
        HabitStatusComputer::new(&self.habit, &self.history, &self.vacations, today)
    }

    pub fn status(&self, date: NaiveDate, today: NaiveDate) -> HabitStatus {
        self.computer(today).status(date)
    }

    /// Streaks derived from the snapshot, from the habit's start through today
    pub fn streaks(&self, today: NaiveDate) -> Vec<StreakRange> {
        let schedule = &self.habit.schedule;
        let last = schedule.end_date.map_or(today, |end| end.min(today));
        let computer = self.computer(today);
        StreakCalculator::new(today, schedule.end_date).compute(computer.statuses(schedule.start_date, last))
    }
}
