/// Storage layer for persisting habit data
///
/// This module defines the store interfaces the orchestrator writes through
/// (habits, completion history, vacations, streaks) and two implementations:
/// SQLite for real use and an in-memory store for tests and embedding.

pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use memory::*;
pub use sqlite::*;

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{CompletionRecord, Habit, HabitId, HistoricalStatus, Streak, StreakId, Vacation};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Streak not found: {streak_id}")]
    StreakNotFound { streak_id: String },

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Which end of a search to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Earliest match on or after the bound
    First,
    /// Latest match on or before the bound
    Last,
}

/// Settled completion records, one per habit and date
pub trait CompletionHistoryStore {
    /// Records in an inclusive date range, ordered by date
    fn get_history(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<CompletionRecord>, StorageError>;

    /// First record on/after or last record on/before `bound` carrying one of
    /// the given statuses
    fn get_first_or_last_by_status(
        &self,
        habit_id: &HabitId,
        statuses: &[HistoricalStatus],
        bound: NaiveDate,
        direction: Direction,
    ) -> Result<Option<CompletionRecord>, StorageError>;

    /// Insert or replace the record for its date
    fn upsert_record(&mut self, habit_id: &HabitId, record: &CompletionRecord) -> Result<(), StorageError>;

    /// Remove the record for a date; missing records are not an error
    fn delete_record(&mut self, habit_id: &HabitId, date: NaiveDate) -> Result<(), StorageError>;
}

pub trait VacationStore {
    /// Vacations overlapping the inclusive range, ordered by start date
    fn get_in_period(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<Vacation>, StorageError>;

    fn insert_vacation(&mut self, vacation: &Vacation) -> Result<(), StorageError>;
}

pub trait HabitStore {
    fn create_habit(&mut self, habit: &Habit) -> Result<(), StorageError>;

    fn get_by_id(&self, habit_id: &HabitId) -> Result<Habit, StorageError>;

    /// Every habit, oldest first
    fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;

    /// Persist the habit's current schedule deviation
    fn update_deviation(&mut self, habit_id: &HabitId, deviation: f64) -> Result<(), StorageError>;
}

pub trait StreakStore {
    /// The streak covering `date`, if any
    fn get_streak_by_date(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<Streak>, StorageError>;

    /// Every streak of a habit, ordered by start date
    fn get_streaks(&self, habit_id: &HabitId) -> Result<Vec<Streak>, StorageError>;

    fn insert_streak(&mut self, streak: &Streak) -> Result<(), StorageError>;

    fn update_streak(&mut self, streak: &Streak) -> Result<(), StorageError>;

    fn delete_streak(&mut self, streak_id: &StreakId) -> Result<(), StorageError>;
}

/// Everything the orchestrator needs, plus all-or-nothing execution
pub trait HabitRepository: HabitStore + CompletionHistoryStore + VacationStore + StreakStore {
    /// Run `f` so that either all of its writes persist or none do
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>;
}
