/// Habit entity and related functionality
///
/// This module defines the core Habit struct: identity, habit type and the
/// recurrence schedule the engine evaluates, plus the persisted running
/// schedule deviation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HabitId, HabitType, Schedule};

/// A habit represents something the user wants to do regularly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// Display name (e.g., "Morning Run", "Read for 30min")
    pub name: String,
    /// How completion is measured
    pub habit_type: HabitType,
    /// When the habit is due
    pub schedule: Schedule,
    /// Current completed-minus-due balance, kept in sync by the orchestrator
    pub schedule_deviation: f64,
    /// When this habit was created
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// The schedule is re-validated here since deserialized schedules bypass
    /// `Schedule::new`.
    pub fn new(name: String, habit_type: HabitType, schedule: Schedule) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        schedule.validate()?;

        Ok(Self {
            id: HabitId::new(),
            name: name.trim().to_string(),
            habit_type,
            schedule,
            schedule_deviation: 0.0,
            created_at: Utc::now(),
        })
    }

    /// Create a habit from existing data (used when loading from database)
    pub fn from_existing(
        id: HabitId,
        name: String,
        habit_type: HabitType,
        schedule: Schedule,
        schedule_deviation: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            habit_type,
            schedule,
            schedule_deviation,
            created_at,
        }
    }

    /// Validate habit name according to business rules
    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string(),
            ));
        }

        if trimmed.len() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleKind;
    use chrono::NaiveDate;

    fn every_day() -> Schedule {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Schedule::new(ScheduleKind::EveryDay, start, None, false, false).unwrap()
    }

    #[test]
    fn test_create_valid_habit() {
        let habit = Habit::new("  Morning Run ".to_string(), HabitType::YesNo, every_day());

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Morning Run");
        assert_eq!(habit.schedule_deviation, 0.0);
    }

    #[test]
    fn test_invalid_habit_name() {
        let result = Habit::new("".to_string(), HabitType::YesNo, every_day());
        assert!(matches!(result, Err(DomainError::InvalidHabitName(_))));

        let result = Habit::new("x".repeat(101), HabitType::YesNo, every_day());
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialized_schedule_is_revalidated() {
        let mut schedule = every_day();
        schedule.end_date = NaiveDate::from_ymd_opt(2023, 12, 31);

        let result = Habit::new("Read".to_string(), HabitType::YesNo, schedule);
        assert!(matches!(result, Err(DomainError::InvalidSchedule(_))));
    }
}
