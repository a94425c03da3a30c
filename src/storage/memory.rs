/// In-memory implementation of the store interfaces
///
/// Holds everything in ordered maps. `atomically` snapshots the whole store
/// and restores it when the closure fails.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::NaiveDate;

use crate::domain::{CompletionRecord, Habit, HabitId, HistoricalStatus, Streak, StreakId, Vacation};
use crate::storage::{
    CompletionHistoryStore, Direction, HabitRepository, HabitStore, StorageError, StreakStore,
    VacationStore,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    habits: BTreeMap<HabitId, Habit>,
    history: BTreeMap<HabitId, BTreeMap<NaiveDate, CompletionRecord>>,
    vacations: BTreeMap<HabitId, Vec<Vacation>>,
    streaks: BTreeMap<HabitId, Vec<Streak>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn require_habit(&self, habit_id: &HabitId) -> Result<(), StorageError> {
        if self.habits.contains_key(habit_id) {
            Ok(())
        } else {
            Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })
        }
    }
}

impl HabitStore for InMemoryStorage {
    fn create_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        self.habits.insert(habit.id.clone(), habit.clone());
        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn get_by_id(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        self.habits
            .get(habit_id)
            .cloned()
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })
    }

    fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let mut habits: Vec<Habit> = self.habits.values().cloned().collect();
        habits.sort_by_key(|habit| habit.created_at);
        Ok(habits)
    }

    fn update_deviation(&mut self, habit_id: &HabitId, deviation: f64) -> Result<(), StorageError> {
        let habit = self
            .habits
            .get_mut(habit_id)
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })?;
        habit.schedule_deviation = deviation;
        Ok(())
    }
}

impl CompletionHistoryStore for InMemoryStorage {
    fn get_history(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<CompletionRecord>, StorageError> {
        if range.start() > range.end() {
            return Ok(Vec::new());
        }
        Ok(self
            .history
            .get(habit_id)
            .map(|records| records.range(range).map(|(_, record)| record.clone()).collect())
            .unwrap_or_default())
    }

    fn get_first_or_last_by_status(
        &self,
        habit_id: &HabitId,
        statuses: &[HistoricalStatus],
        bound: NaiveDate,
        direction: Direction,
    ) -> Result<Option<CompletionRecord>, StorageError> {
        let Some(records) = self.history.get(habit_id) else {
            return Ok(None);
        };
        let matches = |record: &&CompletionRecord| statuses.contains(&record.status);

        let found = match direction {
            Direction::First => records.range(bound..).map(|(_, r)| r).find(matches),
            Direction::Last => records.range(..=bound).map(|(_, r)| r).rev().find(matches),
        };
        Ok(found.cloned())
    }

    fn upsert_record(&mut self, habit_id: &HabitId, record: &CompletionRecord) -> Result<(), StorageError> {
        self.require_habit(habit_id)?;
        self.history
            .entry(habit_id.clone())
            .or_default()
            .insert(record.date, record.clone());
        Ok(())
    }

    fn delete_record(&mut self, habit_id: &HabitId, date: NaiveDate) -> Result<(), StorageError> {
        if let Some(records) = self.history.get_mut(habit_id) {
            records.remove(&date);
        }
        Ok(())
    }
}

impl VacationStore for InMemoryStorage {
    fn get_in_period(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<Vacation>, StorageError> {
        let mut vacations: Vec<Vacation> = self
            .vacations
            .get(habit_id)
            .map(|all| {
                all.iter()
                    .filter(|v| v.overlaps(*range.start(), *range.end()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        vacations.sort_by_key(|v| v.start_date);
        Ok(vacations)
    }

    fn insert_vacation(&mut self, vacation: &Vacation) -> Result<(), StorageError> {
        self.require_habit(&vacation.habit_id)?;
        self.vacations
            .entry(vacation.habit_id.clone())
            .or_default()
            .push(vacation.clone());
        Ok(())
    }
}

impl StreakStore for InMemoryStorage {
    fn get_streak_by_date(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<Streak>, StorageError> {
        Ok(self.streaks.get(habit_id).and_then(|streaks| {
            streaks
                .iter()
                .find(|s| s.start_date <= date && s.end_date.map_or(true, |end| date <= end))
                .cloned()
        }))
    }

    fn get_streaks(&self, habit_id: &HabitId) -> Result<Vec<Streak>, StorageError> {
        let mut streaks = self.streaks.get(habit_id).cloned().unwrap_or_default();
        streaks.sort_by_key(|s| s.start_date);
        Ok(streaks)
    }

    fn insert_streak(&mut self, streak: &Streak) -> Result<(), StorageError> {
        self.require_habit(&streak.habit_id)?;
        self.streaks
            .entry(streak.habit_id.clone())
            .or_default()
            .push(streak.clone());
        Ok(())
    }

    fn update_streak(&mut self, streak: &Streak) -> Result<(), StorageError> {
        let stored = self
            .streaks
            .get_mut(&streak.habit_id)
            .and_then(|streaks| streaks.iter_mut().find(|s| s.id == streak.id))
            .ok_or_else(|| StorageError::StreakNotFound {
                streak_id: streak.id.to_string(),
            })?;
        *stored = streak.clone();
        Ok(())
    }

    fn delete_streak(&mut self, streak_id: &StreakId) -> Result<(), StorageError> {
        for streaks in self.streaks.values_mut() {
            streaks.retain(|s| &s.id != streak_id);
        }
        Ok(())
    }
}

impl HabitRepository for InMemoryStorage {
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
            tracing::debug!("Rolled back in-memory changes");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HabitType, Schedule, ScheduleKind};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn storage_with_habit() -> (InMemoryStorage, HabitId) {
        let schedule = Schedule::new(ScheduleKind::EveryDay, date(1), None, false, false).unwrap();
        let habit = Habit::new("Read".to_string(), HabitType::YesNo, schedule).unwrap();
        let mut storage = InMemoryStorage::new();
        storage.create_habit(&habit).unwrap();
        (storage, habit.id)
    }

    fn record(d: u32, status: HistoricalStatus) -> CompletionRecord {
        CompletionRecord::new(date(d), 0.0, status, 0.0).unwrap()
    }

    #[test]
    fn test_first_or_last_by_status() {
        let (mut storage, habit_id) = storage_with_habit();
        for (d, status) in [
            (1, HistoricalStatus::NotCompleted),
            (2, HistoricalStatus::Skipped),
            (4, HistoricalStatus::NotCompleted),
        ] {
            storage.upsert_record(&habit_id, &record(d, status)).unwrap();
        }

        let breakers = [HistoricalStatus::NotCompleted];
        let last = storage
            .get_first_or_last_by_status(&habit_id, &breakers, date(3), Direction::Last)
            .unwrap();
        assert_eq!(last.map(|r| r.date), Some(date(1)));

        let first = storage
            .get_first_or_last_by_status(&habit_id, &breakers, date(2), Direction::First)
            .unwrap();
        assert_eq!(first.map(|r| r.date), Some(date(4)));
    }

    #[test]
    fn test_atomically_restores_on_error() {
        let (mut storage, habit_id) = storage_with_habit();

        let result: Result<(), StorageError> = storage.atomically(|s| {
            s.upsert_record(&habit_id, &record(1, HistoricalStatus::NotCompleted))?;
            s.update_deviation(&habit_id, -1.0)?;
            Err(StorageError::InvalidData("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(storage.get_history(&habit_id, date(1)..=date(31)).unwrap().is_empty());
        assert_eq!(storage.get_by_id(&habit_id).unwrap().schedule_deviation, 0.0);
    }

    #[test]
    fn test_streak_lookup_by_date() {
        let (mut storage, habit_id) = storage_with_habit();
        let closed = Streak::new(habit_id.clone(), date(1), Some(date(3)));
        let open = Streak::new(habit_id.clone(), date(6), None);
        storage.insert_streak(&open).unwrap();
        storage.insert_streak(&closed).unwrap();

        assert_eq!(storage.get_streak_by_date(&habit_id, date(2)).unwrap(), Some(closed.clone()));
        assert_eq!(storage.get_streak_by_date(&habit_id, date(4)).unwrap(), None);
        assert_eq!(storage.get_streak_by_date(&habit_id, date(20)).unwrap(), Some(open.clone()));
        assert_eq!(storage.get_streaks(&habit_id).unwrap(), vec![closed, open]);
    }

    #[test]
    fn test_unknown_habit() {
        let mut storage = InMemoryStorage::new();
        let result = storage.upsert_record(&HabitId::new(), &record(1, HistoricalStatus::Skipped));
        assert!(matches!(result, Err(StorageError::HabitNotFound { .. })));
    }
}
