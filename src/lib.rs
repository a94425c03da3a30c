/// Public library interface for the habit status engine
///
/// This module exports the domain types, the pure status engine, the storage
/// implementations and `HabitEngine`, the facade that ties a repository to
/// the engine for applications and tests.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

pub mod domain;
pub mod engine;
pub mod storage;

// Re-export public modules and types
pub use domain::*;
pub use engine::{
    HabitSnapshot, HabitStatusComputer, HistoryOrchestrator, MutationOutcome, Reconciliation,
    ReconciliationKind, StreakRange,
};
pub use storage::{HabitRepository, InMemoryStorage, SqliteStorage, StorageError};

/// Errors that can occur while evaluating or mutating habit history
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Inconsistent history for habit {habit_id} on {date}: {reason}")]
    InconsistentHistoryState {
        habit_id: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("Cannot toggle {date} ({status}): {reason}")]
    UnsupportedTransition {
        date: NaiveDate,
        status: HabitStatus,
        reason: String,
    },
}

/// Habit engine bound to a repository
///
/// Queries are pure evaluations of a freshly loaded snapshot. Mutations go
/// through `HistoryOrchestrator`, one transaction each.
pub struct HabitEngine<R = SqliteStorage> {
    repo: R,
}

impl HabitEngine<SqliteStorage> {
    /// Open (or create) a SQLite-backed engine at the given path
    ///
    /// This will initialize the database schema if it doesn't already exist.
    pub fn open(db_path: PathBuf) -> Result<Self, EngineError> {
        tracing::info!("Initializing habit status engine with database: {:?}", db_path);
        let storage = SqliteStorage::new(db_path)?;
        Ok(Self::new(storage))
    }
}

impl<R: HabitRepository> HabitEngine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Get a reference to the repository (useful for testing)
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validate and store a new habit
    pub fn create_habit(
        &mut self,
        name: &str,
        habit_type: HabitType,
        schedule: Schedule,
    ) -> Result<Habit, EngineError> {
        let habit = Habit::new(name.to_string(), habit_type, schedule)?;
        self.repo.create_habit(&habit)?;
        tracing::info!("Created habit '{}' ({})", habit.name, habit.id);
        Ok(habit)
    }

    pub fn get_habit(&self, habit_id: &HabitId) -> Result<Habit, EngineError> {
        Ok(self.repo.get_by_id(habit_id)?)
    }

    pub fn habits(&self) -> Result<Vec<Habit>, EngineError> {
        Ok(self.repo.list_habits()?)
    }

    /// Add a vacation and re-settle the dates it covers
    pub fn add_vacation(
        &mut self,
        habit_id: &HabitId,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Vacation, EngineError> {
        let vacation = Vacation::new(habit_id.clone(), start_date, end_date)?;
        HistoryOrchestrator::new(&mut self.repo).add_vacation(&vacation, today)?;
        Ok(vacation)
    }

    /// Load everything needed to evaluate dates up to `through`
    pub fn snapshot(&self, habit_id: &HabitId, through: NaiveDate) -> Result<HabitSnapshot, EngineError> {
        let habit = self.repo.get_by_id(habit_id)?;
        let start = habit.schedule.start_date;
        let through = through.max(start);
        let records = self.repo.get_history(habit_id, start..=through)?;
        let vacations = self.repo.get_in_period(habit_id, start..=through)?;
        Ok(HabitSnapshot::new(habit, &records, vacations))
    }

    /// Status of one date as of `today`
    pub fn status_of(&self, habit_id: &HabitId, date: NaiveDate, today: NaiveDate) -> Result<HabitStatus, EngineError> {
        let snapshot = self.snapshot(habit_id, date.max(today))?;
        Ok(snapshot.status(date, today))
    }

    /// Statuses of every date in `[from, to]` as of `today`
    pub fn statuses_in(
        &self,
        habit_id: &HabitId,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<(NaiveDate, HabitStatus)>, EngineError> {
        let snapshot = self.snapshot(habit_id, to.max(today))?;
        Ok(snapshot.computer(today).statuses(from, to))
    }

    /// Settled records in `[from, to]`
    pub fn history(
        &self,
        habit_id: &HabitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompletionRecord>, EngineError> {
        Ok(self.repo.get_history(habit_id, from..=to)?)
    }

    /// Stored streaks, oldest first
    pub fn streaks(&self, habit_id: &HabitId) -> Result<Vec<Streak>, EngineError> {
        Ok(self.repo.get_streaks(habit_id)?)
    }

    /// The streak still running as of today, if any
    ///
    /// A streak that ended yesterday still counts while today is unresolved.
    pub fn current_streak(&self, habit_id: &HabitId, today: NaiveDate) -> Result<Option<Streak>, EngineError> {
        if let Some(streak) = self.repo.get_streak_by_date(habit_id, today)? {
            return Ok(Some(streak));
        }
        let yesterday = today - chrono::Duration::days(1);
        Ok(self
            .repo
            .get_streak_by_date(habit_id, yesterday)?
            .filter(|streak| streak.end_date.map_or(true, |end| end >= yesterday)))
    }

    pub fn set_completion(
        &mut self,
        habit_id: &HabitId,
        date: NaiveDate,
        times: f64,
        today: NaiveDate,
    ) -> Result<MutationOutcome, EngineError> {
        HistoryOrchestrator::new(&mut self.repo).set_completion(habit_id, date, times, today)
    }

    pub fn toggle(&mut self, habit_id: &HabitId, date: NaiveDate, today: NaiveDate) -> Result<MutationOutcome, EngineError> {
        HistoryOrchestrator::new(&mut self.repo).toggle(habit_id, date, today)
    }

    pub fn settle(&mut self, habit_id: &HabitId, today: NaiveDate) -> Result<MutationOutcome, EngineError> {
        HistoryOrchestrator::new(&mut self.repo).settle(habit_id, today)
    }
}
