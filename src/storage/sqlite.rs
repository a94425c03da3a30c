/// SQLite implementation of the store interfaces
///
/// This module provides the concrete SQLite implementation for storing
/// and retrieving habits, completion history, vacations and streaks. It
/// handles all SQL queries and data conversion.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use crate::domain::{
    CompletionRecord, Habit, HabitId, HabitType, HistoricalStatus, Streak, StreakId, Vacation,
    VacationId,
};
use crate::storage::{
    migrations, CompletionHistoryStore, Direction, HabitRepository, HabitStore, StorageError,
    StreakStore, VacationStore,
};

/// SQLite-based storage implementation
///
/// This struct holds a connection to the SQLite database and implements
/// every store trait the orchestrator writes through.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        let storage = Self::initialize(conn)?;

        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self, StorageError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }

    fn rollback(&self) {
        if let Err(rollback_error) = self.conn.execute_batch("ROLLBACK") {
            tracing::error!("Rollback failed: {}", rollback_error);
        }
    }

    fn invalid_text(index: usize, message: &str) -> rusqlite::Error {
        rusqlite::Error::InvalidColumnType(index, message.to_string(), rusqlite::types::Type::Text)
    }

    fn row_to_habit(row: &Row<'_>) -> rusqlite::Result<Habit> {
        let id_str: String = row.get(0)?;
        let id = HabitId::from_string(&id_str).map_err(|_| Self::invalid_text(0, "Invalid UUID"))?;

        let type_str: String = row.get(2)?;
        let habit_type =
            HabitType::from_name(&type_str).ok_or_else(|| Self::invalid_text(2, "Invalid habit type"))?;

        let schedule_json: String = row.get(3)?;
        let schedule = serde_json::from_str(&schedule_json)
            .map_err(|_| Self::invalid_text(3, "Invalid schedule"))?;

        let created_at_str: String = row.get(5)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|_| Self::invalid_text(5, "Invalid datetime"))?
            .with_timezone(&Utc);

        Ok(Habit::from_existing(
            id,
            row.get(1)?, // name
            habit_type,
            schedule,
            row.get(4)?, // schedule_deviation
            created_at,
        ))
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CompletionRecord> {
        let status_str: String = row.get(2)?;
        let status = HistoricalStatus::from_name(&status_str)
            .ok_or_else(|| Self::invalid_text(2, "Invalid status"))?;

        Ok(CompletionRecord {
            date: row.get(0)?,
            num_of_times_completed: row.get(1)?,
            status,
            schedule_deviation: row.get(3)?,
        })
    }

    fn row_to_vacation(row: &Row<'_>) -> rusqlite::Result<Vacation> {
        let id_str: String = row.get(0)?;
        let id = VacationId::from_string(&id_str).map_err(|_| Self::invalid_text(0, "Invalid UUID"))?;
        let habit_id_str: String = row.get(1)?;
        let habit_id =
            HabitId::from_string(&habit_id_str).map_err(|_| Self::invalid_text(1, "Invalid UUID"))?;

        Ok(Vacation {
            id,
            habit_id,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
        })
    }

    fn row_to_streak(row: &Row<'_>) -> rusqlite::Result<Streak> {
        let id_str: String = row.get(0)?;
        let id = StreakId::from_string(&id_str).map_err(|_| Self::invalid_text(0, "Invalid UUID"))?;
        let habit_id_str: String = row.get(1)?;
        let habit_id =
            HabitId::from_string(&habit_id_str).map_err(|_| Self::invalid_text(1, "Invalid UUID"))?;

        Ok(Streak::from_existing(id, habit_id, row.get(2)?, row.get(3)?))
    }

    fn status_placeholders(first_index: usize, count: usize) -> String {
        (first_index..first_index + count)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl HabitStore for SqliteStorage {
    fn create_habit(&mut self, habit: &Habit) -> Result<(), StorageError> {
        let schedule_json = serde_json::to_string(&habit.schedule)?;

        self.conn.execute(
            "INSERT INTO habits (
                id, name, habit_type, schedule_json, schedule_deviation, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.id.to_string(),
                habit.name,
                habit.habit_type.as_str(),
                schedule_json,
                habit.schedule_deviation,
                habit.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn get_by_id(&self, habit_id: &HabitId) -> Result<Habit, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, habit_type, schedule_json, schedule_deviation, created_at
             FROM habits WHERE id = ?1",
        )?;

        match stmt.query_row(params![habit_id.to_string()], Self::row_to_habit) {
            Ok(habit) => Ok(habit),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            }),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, habit_type, schedule_json, schedule_deviation, created_at
             FROM habits ORDER BY created_at ASC",
        )?;
        let habits = stmt
            .query_map([], Self::row_to_habit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    fn update_deviation(&mut self, habit_id: &HabitId, deviation: f64) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE habits SET schedule_deviation = ?2 WHERE id = ?1",
            params![habit_id.to_string(), deviation],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            });
        }

        tracing::debug!("Updated deviation for habit {}: {}", habit_id, deviation);
        Ok(())
    }
}

impl CompletionHistoryStore for SqliteStorage {
    fn get_history(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<CompletionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, times_completed, status, schedule_deviation
             FROM completion_history
             WHERE habit_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date ASC",
        )?;

        let records = stmt
            .query_map(
                params![habit_id.to_string(), range.start(), range.end()],
                Self::row_to_record,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get_first_or_last_by_status(
        &self,
        habit_id: &HabitId,
        statuses: &[HistoricalStatus],
        bound: NaiveDate,
        direction: Direction,
    ) -> Result<Option<CompletionRecord>, StorageError> {
        if statuses.is_empty() {
            return Ok(None);
        }

        let (comparison, order) = match direction {
            Direction::First => (">=", "ASC"),
            Direction::Last => ("<=", "DESC"),
        };
        let sql = format!(
            "SELECT date, times_completed, status, schedule_deviation
             FROM completion_history
             WHERE habit_id = ?1 AND date {} ?2 AND status IN ({})
             ORDER BY date {} LIMIT 1",
            comparison,
            Self::status_placeholders(3, statuses.len()),
            order
        );

        let mut values: Vec<String> = vec![habit_id.to_string(), bound.to_string()];
        values.extend(statuses.iter().map(|s| s.as_str().to_string()));

        let mut stmt = self.conn.prepare(&sql)?;
        match stmt.query_row(rusqlite::params_from_iter(values.iter()), Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    fn upsert_record(&mut self, habit_id: &HabitId, record: &CompletionRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO completion_history (
                habit_id, date, times_completed, status, schedule_deviation
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (habit_id, date) DO UPDATE SET
                times_completed = excluded.times_completed,
                status = excluded.status,
                schedule_deviation = excluded.schedule_deviation",
            params![
                habit_id.to_string(),
                record.date,
                record.num_of_times_completed,
                record.status.as_str(),
                record.schedule_deviation,
            ],
        )?;
        Ok(())
    }

    fn delete_record(&mut self, habit_id: &HabitId, date: NaiveDate) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM completion_history WHERE habit_id = ?1 AND date = ?2",
            params![habit_id.to_string(), date],
        )?;
        Ok(())
    }
}

impl VacationStore for SqliteStorage {
    fn get_in_period(
        &self,
        habit_id: &HabitId,
        range: RangeInclusive<NaiveDate>,
    ) -> Result<Vec<Vacation>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, start_date, end_date
             FROM vacations
             WHERE habit_id = ?1 AND start_date <= ?3 AND (end_date IS NULL OR end_date >= ?2)
             ORDER BY start_date ASC",
        )?;

        let vacations = stmt
            .query_map(
                params![habit_id.to_string(), range.start(), range.end()],
                Self::row_to_vacation,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vacations)
    }

    fn insert_vacation(&mut self, vacation: &Vacation) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO vacations (id, habit_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                vacation.id.to_string(),
                vacation.habit_id.to_string(),
                vacation.start_date,
                vacation.end_date,
            ],
        )?;

        tracing::debug!("Created vacation {} for habit {}", vacation.id, vacation.habit_id);
        Ok(())
    }
}

impl StreakStore for SqliteStorage {
    fn get_streak_by_date(&self, habit_id: &HabitId, date: NaiveDate) -> Result<Option<Streak>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, start_date, end_date
             FROM streaks
             WHERE habit_id = ?1 AND start_date <= ?2 AND (end_date IS NULL OR end_date >= ?2)
             ORDER BY start_date DESC LIMIT 1",
        )?;

        match stmt.query_row(params![habit_id.to_string(), date], Self::row_to_streak) {
            Ok(streak) => Ok(Some(streak)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    fn get_streaks(&self, habit_id: &HabitId) -> Result<Vec<Streak>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, start_date, end_date
             FROM streaks WHERE habit_id = ?1 ORDER BY start_date ASC",
        )?;

        let streaks = stmt
            .query_map(params![habit_id.to_string()], Self::row_to_streak)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(streaks)
    }

    fn insert_streak(&mut self, streak: &Streak) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO streaks (id, habit_id, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                streak.id.to_string(),
                streak.habit_id.to_string(),
                streak.start_date,
                streak.end_date,
            ],
        )?;

        tracing::debug!("Created streak for habit {} from {}", streak.habit_id, streak.start_date);
        Ok(())
    }

    fn update_streak(&mut self, streak: &Streak) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE streaks SET start_date = ?2, end_date = ?3 WHERE id = ?1",
            params![streak.id.to_string(), streak.start_date, streak.end_date],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::StreakNotFound {
                streak_id: streak.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_streak(&mut self, streak_id: &StreakId) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM streaks WHERE id = ?1",
            params![streak_id.to_string()],
        )?;
        Ok(())
    }
}

impl HabitRepository for SqliteStorage {
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StorageError::from)?;

        match f(self) {
            Ok(value) => match self.conn.execute_batch("COMMIT") {
                Ok(()) => Ok(value),
                Err(commit_error) => {
                    // A failed COMMIT leaves the transaction open
                    self.rollback();
                    Err(StorageError::from(commit_error).into())
                }
            },
            Err(error) => {
                self.rollback();
                Err(error)
            }
        }
    }
}
