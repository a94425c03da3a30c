/// Core identifier types and the habit-type capability
///
/// This module defines the ID newtypes shared by habits, vacations and streaks,
/// plus the `HabitType` discriminator the status computer asks for due counts.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a habit
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass a habit ID where a streak ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a habit ID from a string (useful for database loading)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a vacation range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VacationId(pub Uuid);

impl VacationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for VacationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VacationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a streak record
///
/// Streak identity is not stable across recomputation: only the boundaries are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreakId(pub Uuid);

impl StreakId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for StreakId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of habit this is, and therefore how completion is measured
///
/// The status computer never looks at this directly. It only asks the two
/// capability questions below, so new habit types slot in as new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HabitType {
    /// Done or not done, at most once per day
    #[default]
    YesNo,
}

impl HabitType {
    /// How many times the habit must be done on a date with the given due-ness
    pub fn num_of_due_times(&self, is_due: bool) -> f64 {
        match self {
            HabitType::YesNo => {
                if is_due {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// One unit of completion, as recorded when a date is toggled to done
    pub fn unit(&self) -> f64 {
        match self {
            HabitType::YesNo => 1.0,
        }
    }

    /// Stable name used by the storage layer
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitType::YesNo => "yes_no",
        }
    }

    /// Parse the stable storage name back into a habit type
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "yes_no" => Some(HabitType::YesNo),
            _ => None,
        }
    }
}
