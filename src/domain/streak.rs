/// Streak records
///
/// A streak is a maximal date range of successful days. The engine computes
/// them (see `engine::streaks`); this module only defines the persisted shape
/// and the display helpers.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{HabitId, HabitStatus, StreakId};

/// A run of successful days for one habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    /// Record identity; not preserved across recomputation
    pub id: StreakId,
    /// Which habit this streak is for
    pub habit_id: HabitId,
    /// First day of the run
    pub start_date: NaiveDate,
    /// Last day of the run, `None` while it is still going
    pub end_date: Option<NaiveDate>,
}

impl Streak {
    /// Create a new streak record
    pub fn new(habit_id: HabitId, start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            id: StreakId::new(),
            habit_id,
            start_date,
            end_date,
        }
    }

    /// Create a streak from existing data (used when loading from database)
    pub fn from_existing(
        id: StreakId,
        habit_id: HabitId,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            habit_id,
            start_date,
            end_date,
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_date.is_none()
    }

    /// Last day to show for this streak
    ///
    /// An ongoing streak runs through today, or only through yesterday while
    /// today is still unresolved (`Planned` or `Backlog`). It never runs past
    /// the schedule's end date.
    pub fn effective_end(
        &self,
        today: NaiveDate,
        today_status: HabitStatus,
        schedule_end: Option<NaiveDate>,
    ) -> NaiveDate {
        let end = match self.end_date {
            Some(end) => end,
            None => match today_status {
                HabitStatus::Planned | HabitStatus::Backlog => today - Duration::days(1),
                _ => today,
            },
        };
        let end = schedule_end.map_or(end, |schedule_end| end.min(schedule_end));
        end.max(self.start_date)
    }

    /// Length of the streak in days, using the effective end
    pub fn length_in_days(
        &self,
        today: NaiveDate,
        today_status: HabitStatus,
        schedule_end: Option<NaiveDate>,
    ) -> i64 {
        (self.effective_end(today, today_status, schedule_end) - self.start_date).num_days() + 1
    }

    /// Get a motivational message based on streak length
    pub fn motivational_message(length_in_days: i64) -> String {
        match length_in_days {
            i64::MIN..=0 => "Ready to start your streak! Every journey begins with a single step.".to_string(),
            1 => "Great start! One day down, keep the momentum going.".to_string(),
            2..=6 => format!("Nice work! {} days in a row. You're building a strong habit.", length_in_days),
            7..=13 => format!("Excellent! {} days strong. You're in the groove now!", length_in_days),
            14..=29 => format!("Amazing! {} days straight. This is becoming second nature.", length_in_days),
            30..=99 => format!("Incredible! {} days of consistency. You're a habit master!", length_in_days),
            _ => format!("Legendary! {} days of unwavering commitment. You're an inspiration!", length_in_days),
        }
    }
}
