/// Domain module containing core data types
///
/// This module defines the core entities (Habit, Schedule, CompletionRecord,
/// Vacation, Streak), the status tags and their validation rules.

pub mod entry;
pub mod habit;
pub mod schedule;
pub mod status;
pub mod streak;
pub mod types;
pub mod vacation;

// Re-export public types for easy access
pub use entry::*;
pub use habit::*;
pub use schedule::*;
pub use status::*;
pub use streak::*;
pub use types::*;
pub use vacation::*;

use thiserror::Error;

/// Errors that can occur while constructing domain values
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}
