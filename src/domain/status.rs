/// Status tags produced by the engine
///
/// `HistoricalStatus` is what gets persisted once a date has passed.
/// `HabitStatus` is what the status computer returns at query time; it adds
/// the provisional states that only exist until a date is settled.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Settled outcome of a date, as stored in completion history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalStatus {
    Completed,
    PartiallyCompleted,
    NotCompleted,
    /// Not due and not done
    Skipped,
    /// Done more than required, with no backlog to pay off
    OverCompleted,
    /// Done more than required, paying off an earlier missed date
    SortedOutBacklog,
    /// Missed, but paid off by a later over-completion
    CompletedLater,
    /// Not done, but covered by an earlier over-completion
    AlreadyCompleted,
    NotCompletedOnVacation,
    OverCompletedOnVacation,
    SortedOutBacklogOnVacation,
    NotStarted,
    Finished,
}

impl HistoricalStatus {
    /// Every status a settled record can carry
    pub const ALL: [HistoricalStatus; 13] = [
        HistoricalStatus::Completed,
        HistoricalStatus::PartiallyCompleted,
        HistoricalStatus::NotCompleted,
        HistoricalStatus::Skipped,
        HistoricalStatus::OverCompleted,
        HistoricalStatus::SortedOutBacklog,
        HistoricalStatus::CompletedLater,
        HistoricalStatus::AlreadyCompleted,
        HistoricalStatus::NotCompletedOnVacation,
        HistoricalStatus::OverCompletedOnVacation,
        HistoricalStatus::SortedOutBacklogOnVacation,
        HistoricalStatus::NotStarted,
        HistoricalStatus::Finished,
    ];

    /// Statuses that close an open streak
    pub const STREAK_BREAKERS: [HistoricalStatus; 2] = [
        HistoricalStatus::NotCompleted,
        HistoricalStatus::PartiallyCompleted,
    ];

    /// Stable name used by the storage layer
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricalStatus::Completed => "completed",
            HistoricalStatus::PartiallyCompleted => "partially_completed",
            HistoricalStatus::NotCompleted => "not_completed",
            HistoricalStatus::Skipped => "skipped",
            HistoricalStatus::OverCompleted => "over_completed",
            HistoricalStatus::SortedOutBacklog => "sorted_out_backlog",
            HistoricalStatus::CompletedLater => "completed_later",
            HistoricalStatus::AlreadyCompleted => "already_completed",
            HistoricalStatus::NotCompletedOnVacation => "not_completed_on_vacation",
            HistoricalStatus::OverCompletedOnVacation => "over_completed_on_vacation",
            HistoricalStatus::SortedOutBacklogOnVacation => "sorted_out_backlog_on_vacation",
            HistoricalStatus::NotStarted => "not_started",
            HistoricalStatus::Finished => "finished",
        }
    }

    /// Parse the stable storage name back into a status
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }

    /// Done more than required, whether or not it paid off a backlog
    pub fn is_over_completion(&self) -> bool {
        matches!(
            self,
            HistoricalStatus::OverCompleted | HistoricalStatus::OverCompletedOnVacation
        )
    }

    pub fn is_sorted_out_backlog(&self) -> bool {
        matches!(
            self,
            HistoricalStatus::SortedOutBacklog | HistoricalStatus::SortedOutBacklogOnVacation
        )
    }

    /// Settle a query-time status into its persisted form
    ///
    /// Returns `None` for `Planned` and `Backlog`, which only describe dates
    /// that have not happened yet.
    pub fn settled_from(status: HabitStatus) -> Option<Self> {
        let settled = match status {
            HabitStatus::Completed => HistoricalStatus::Completed,
            HabitStatus::PartiallyCompleted => HistoricalStatus::PartiallyCompleted,
            HabitStatus::NotCompleted | HabitStatus::Failed => HistoricalStatus::NotCompleted,
            HabitStatus::Skipped | HabitStatus::NotDue => HistoricalStatus::Skipped,
            HabitStatus::OverCompleted => HistoricalStatus::OverCompleted,
            HabitStatus::SortedOutBacklog => HistoricalStatus::SortedOutBacklog,
            HabitStatus::CompletedLater => HistoricalStatus::CompletedLater,
            HabitStatus::AlreadyCompleted => HistoricalStatus::AlreadyCompleted,
            HabitStatus::OnVacation | HabitStatus::NotCompletedOnVacation => {
                HistoricalStatus::NotCompletedOnVacation
            }
            HabitStatus::OverCompletedOnVacation => HistoricalStatus::OverCompletedOnVacation,
            HabitStatus::SortedOutBacklogOnVacation => {
                HistoricalStatus::SortedOutBacklogOnVacation
            }
            HabitStatus::NotStarted => HistoricalStatus::NotStarted,
            HabitStatus::Finished => HistoricalStatus::Finished,
            HabitStatus::Planned | HabitStatus::Backlog => return None,
        };
        Some(settled)
    }
}

impl fmt::Display for HistoricalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-time status of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitStatus {
    Completed,
    PartiallyCompleted,
    NotCompleted,
    Skipped,
    OverCompleted,
    SortedOutBacklog,
    CompletedLater,
    AlreadyCompleted,
    OnVacation,
    NotCompletedOnVacation,
    OverCompletedOnVacation,
    SortedOutBacklogOnVacation,
    NotStarted,
    Finished,
    /// Due today or later and not done yet
    Planned,
    /// Not due, today or later, with backlog that could be sorted out here
    Backlog,
    /// Due in the past, not done and not made up
    Failed,
    /// Not due
    NotDue,
}

impl HabitStatus {
    /// Statuses that open a streak or keep one going by themselves
    pub fn is_streak_creator(&self) -> bool {
        matches!(
            self,
            HabitStatus::Completed
                | HabitStatus::OverCompleted
                | HabitStatus::SortedOutBacklog
                | HabitStatus::SortedOutBacklogOnVacation
                | HabitStatus::OverCompletedOnVacation
                | HabitStatus::CompletedLater
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HabitStatus::Planned => "planned",
            HabitStatus::Backlog => "backlog",
            HabitStatus::Failed => "failed",
            HabitStatus::NotDue => "not_due",
            HabitStatus::OnVacation => "on_vacation",
            other => match HistoricalStatus::settled_from(*other) {
                Some(settled) => settled.as_str(),
                None => "unknown",
            },
        }
    }
}

impl From<HistoricalStatus> for HabitStatus {
    fn from(status: HistoricalStatus) -> Self {
        match status {
            HistoricalStatus::Completed => HabitStatus::Completed,
            HistoricalStatus::PartiallyCompleted => HabitStatus::PartiallyCompleted,
            HistoricalStatus::NotCompleted => HabitStatus::NotCompleted,
            HistoricalStatus::Skipped => HabitStatus::Skipped,
            HistoricalStatus::OverCompleted => HabitStatus::OverCompleted,
            HistoricalStatus::SortedOutBacklog => HabitStatus::SortedOutBacklog,
            HistoricalStatus::CompletedLater => HabitStatus::CompletedLater,
            HistoricalStatus::AlreadyCompleted => HabitStatus::AlreadyCompleted,
            HistoricalStatus::NotCompletedOnVacation => HabitStatus::NotCompletedOnVacation,
            HistoricalStatus::OverCompletedOnVacation => HabitStatus::OverCompletedOnVacation,
            HistoricalStatus::SortedOutBacklogOnVacation => {
                HabitStatus::SortedOutBacklogOnVacation
            }
            HistoricalStatus::NotStarted => HabitStatus::NotStarted,
            HistoricalStatus::Finished => HabitStatus::Finished,
        }
    }
}

impl fmt::Display for HabitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names_are_unique_and_parse_back() {
        for status in HistoricalStatus::ALL {
            assert_eq!(HistoricalStatus::from_name(status.as_str()), Some(status));
        }
        assert_eq!(HistoricalStatus::from_name("planned"), None);
    }

    #[test]
    fn test_provisional_statuses_never_settle() {
        assert_eq!(HistoricalStatus::settled_from(HabitStatus::Planned), None);
        assert_eq!(HistoricalStatus::settled_from(HabitStatus::Backlog), None);
        assert_eq!(
            HistoricalStatus::settled_from(HabitStatus::Failed),
            Some(HistoricalStatus::NotCompleted)
        );
        assert_eq!(
            HistoricalStatus::settled_from(HabitStatus::NotDue),
            Some(HistoricalStatus::Skipped)
        );
        assert_eq!(
            HistoricalStatus::settled_from(HabitStatus::OnVacation),
            Some(HistoricalStatus::NotCompletedOnVacation)
        );
    }

    #[test]
    fn test_historical_round_trips_through_habit_status() {
        for status in HistoricalStatus::ALL {
            assert_eq!(HistoricalStatus::settled_from(status.into()), Some(status));
        }
    }
}
