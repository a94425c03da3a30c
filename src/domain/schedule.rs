/// Recurrence schedules and their construction rules
///
/// A `Schedule` is the common envelope (bounds, backlog and completing-ahead
/// switches) around a `ScheduleKind` describing when the habit is due.
/// Validation happens here so the engine never sees an ill-formed schedule.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Longest possible period for each periodic granularity, in days
const MAX_DAYS_IN_WEEK: u32 = 7;
const MAX_DAYS_IN_MONTH: u32 = 31;
const MAX_DAYS_IN_YEAR: u32 = 366;

/// How a habit recurs, plus the switches that shape backlog accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schedule {
    /// First date the habit exists; earlier dates are `NotStarted`
    pub start_date: NaiveDate,
    /// Last date the habit exists; later dates are `Finished`
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Whether missed due dates can be made up later
    #[serde(default)]
    pub backlog_enabled: bool,
    /// Whether extra completions can satisfy upcoming due dates
    #[serde(default)]
    pub completing_ahead_enabled: bool,
    /// The recurrence rule itself
    pub kind: ScheduleKind,
}

/// The recurrence rule variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Due every single day
    EveryDay,
    /// Due on fixed days of the week
    WeeklyByDueDaysOfWeek {
        #[schemars(with = "Vec<String>")]
        days: Vec<Weekday>,
    },
    /// Due a number of days per week, counted from the start of each week
    WeeklyByNumOfDueDays {
        rule: PeriodicRule,
        /// Calendar week start; `None` means rolling weeks from the start date
        #[serde(default)]
        #[schemars(with = "Option<String>")]
        start_day_of_week: Option<Weekday>,
    },
    /// Due on fixed day numbers, the last day, or Nth weekdays of each month
    MonthlyByDueDatesIndices {
        #[serde(default)]
        day_indices: Vec<u32>,
        #[serde(default)]
        last_day_of_month: bool,
        #[serde(default)]
        weekday_rules: Vec<NthWeekday>,
    },
    /// Due a number of days per month
    MonthlyByNumOfDueDays {
        rule: PeriodicRule,
        #[serde(default)]
        anchor: PeriodAnchor,
    },
    /// Due on fixed month/day pairs every year
    AnnualByDueDates { dates: Vec<MonthDay> },
    /// Due a number of days per year
    AnnualByNumOfDueDays {
        rule: PeriodicRule,
        #[serde(default)]
        anchor: PeriodAnchor,
    },
    /// Due a number of days in every fixed-length period
    PeriodicCustom {
        rule: PeriodicRule,
        num_of_days_in_period: u32,
    },
    /// Due on an explicit set of dates
    CustomDates { dates: BTreeSet<NaiveDate> },
}

/// Due-count rule shared by every "by number of due days" schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodicRule {
    /// Due days in a regular period
    pub num_of_due_days: u32,
    /// Due days in the first (possibly short) period
    #[serde(default)]
    pub num_of_due_days_in_first_period: Option<u32>,
    /// Whether deviation resets at every period boundary
    #[serde(default)]
    pub period_separation_enabled: bool,
}

impl PeriodicRule {
    pub fn new(num_of_due_days: u32) -> Self {
        Self {
            num_of_due_days,
            num_of_due_days_in_first_period: None,
            period_separation_enabled: false,
        }
    }

    pub fn with_first_period(mut self, num_of_due_days: u32) -> Self {
        self.num_of_due_days_in_first_period = Some(num_of_due_days);
        self
    }

    pub fn with_period_separation(mut self, enabled: bool) -> Self {
        self.period_separation_enabled = enabled;
        self
    }
}

/// Where monthly and annual periods begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeriodAnchor {
    /// Periods roll from the schedule start date
    #[default]
    StartDate,
    /// Periods follow calendar months/years; the first one may be short
    Calendar,
}

/// "The Nth <weekday> of the month", e.g. the 2nd Tuesday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NthWeekday {
    /// 1-based occurrence within the month (1..=5)
    pub nth: u32,
    #[schemars(with = "String")]
    pub weekday: Weekday,
}

impl NthWeekday {
    pub fn matches(&self, date: NaiveDate) -> bool {
        date.weekday() == self.weekday && (date.day() - 1) / 7 + 1 == self.nth
    }
}

/// A month and day without a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    /// Feb 29 only ever matches in leap years since no other date carries it
    pub fn matches(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }
}

impl Schedule {
    /// Build and validate a schedule
    pub fn new(
        kind: ScheduleKind,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        backlog_enabled: bool,
        completing_ahead_enabled: bool,
    ) -> Result<Self, DomainError> {
        let schedule = Self {
            start_date,
            end_date,
            backlog_enabled,
            completing_ahead_enabled,
            kind,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Every-other-day schedule: one due day in every two-day period
    pub fn alternate_days(
        start_date: NaiveDate,
        backlog_enabled: bool,
        completing_ahead_enabled: bool,
    ) -> Result<Self, DomainError> {
        Self::new(
            ScheduleKind::PeriodicCustom {
                rule: PeriodicRule::new(1),
                num_of_days_in_period: 2,
            },
            start_date,
            None,
            backlog_enabled,
            completing_ahead_enabled,
        )
    }

    /// Whether the date lies inside `[start_date, end_date]`
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    /// The due-count rule, for periodic variants only
    pub fn periodic_rule(&self) -> Option<&PeriodicRule> {
        match &self.kind {
            ScheduleKind::WeeklyByNumOfDueDays { rule, .. }
            | ScheduleKind::MonthlyByNumOfDueDays { rule, .. }
            | ScheduleKind::AnnualByNumOfDueDays { rule, .. }
            | ScheduleKind::PeriodicCustom { rule, .. } => Some(rule),
            ScheduleKind::EveryDay
            | ScheduleKind::WeeklyByDueDaysOfWeek { .. }
            | ScheduleKind::MonthlyByDueDatesIndices { .. }
            | ScheduleKind::AnnualByDueDates { .. }
            | ScheduleKind::CustomDates { .. } => None,
        }
    }

    pub fn period_separation_enabled(&self) -> bool {
        self.periodic_rule()
            .map_or(false, |rule| rule.period_separation_enabled)
    }

    /// Check every construction invariant
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(DomainError::InvalidSchedule(format!(
                    "End date {} is before start date {}",
                    end, self.start_date
                )));
            }
        }

        match &self.kind {
            ScheduleKind::EveryDay => {}
            ScheduleKind::WeeklyByDueDaysOfWeek { days } => {
                if days.is_empty() {
                    return Err(DomainError::InvalidSchedule(
                        "Weekly schedule must specify at least one day".to_string(),
                    ));
                }
            }
            ScheduleKind::WeeklyByNumOfDueDays {
                rule,
                start_day_of_week,
            } => {
                let aligned = start_day_of_week
                    .map_or(true, |first_day| self.start_date.weekday() == first_day);
                Self::validate_rule(rule, MAX_DAYS_IN_WEEK, aligned)?;
            }
            ScheduleKind::MonthlyByDueDatesIndices {
                day_indices,
                last_day_of_month,
                weekday_rules,
            } => {
                if day_indices.is_empty() && !last_day_of_month && weekday_rules.is_empty() {
                    return Err(DomainError::InvalidSchedule(
                        "Monthly schedule must specify at least one due date".to_string(),
                    ));
                }
                if let Some(index) = day_indices.iter().find(|i| **i == 0 || **i > 31) {
                    return Err(DomainError::InvalidSchedule(format!(
                        "Day of month must be 1-31, got {}",
                        index
                    )));
                }
                if let Some(rule) = weekday_rules.iter().find(|r| r.nth == 0 || r.nth > 5) {
                    return Err(DomainError::InvalidSchedule(format!(
                        "Weekday occurrence must be 1-5, got {}",
                        rule.nth
                    )));
                }
            }
            ScheduleKind::MonthlyByNumOfDueDays { rule, anchor } => {
                let aligned = *anchor == PeriodAnchor::StartDate || self.start_date.day() == 1;
                Self::validate_rule(rule, MAX_DAYS_IN_MONTH, aligned)?;
            }
            ScheduleKind::AnnualByDueDates { dates } => {
                if dates.is_empty() {
                    return Err(DomainError::InvalidSchedule(
                        "Annual schedule must specify at least one date".to_string(),
                    ));
                }
                // 2000 is a leap year, so Feb 29 is accepted here
                if let Some(date) = dates
                    .iter()
                    .find(|d| NaiveDate::from_ymd_opt(2000, d.month, d.day).is_none())
                {
                    return Err(DomainError::InvalidSchedule(format!(
                        "Invalid month/day pair {}/{}",
                        date.month, date.day
                    )));
                }
            }
            ScheduleKind::AnnualByNumOfDueDays { rule, anchor } => {
                let aligned = *anchor == PeriodAnchor::StartDate
                    || (self.start_date.month() == 1 && self.start_date.day() == 1);
                Self::validate_rule(rule, MAX_DAYS_IN_YEAR, aligned)?;
            }
            ScheduleKind::PeriodicCustom {
                rule,
                num_of_days_in_period,
            } => {
                if *num_of_days_in_period == 0 {
                    return Err(DomainError::InvalidSchedule(
                        "Period must be at least 1 day".to_string(),
                    ));
                }
                Self::validate_rule(rule, *num_of_days_in_period, true)?;
            }
            ScheduleKind::CustomDates { dates } => {
                if dates.is_empty() {
                    return Err(DomainError::InvalidSchedule(
                        "Custom schedule must specify at least one date".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate a due-count rule against the longest period it can apply to
    ///
    /// `aligned` is false when the start date is not a natural period boundary,
    /// in which case the first period is short and needs its own due count.
    fn validate_rule(rule: &PeriodicRule, max_days: u32, aligned: bool) -> Result<(), DomainError> {
        if rule.num_of_due_days == 0 || rule.num_of_due_days > max_days {
            return Err(DomainError::InvalidSchedule(format!(
                "Number of due days must be 1-{}, got {}",
                max_days, rule.num_of_due_days
            )));
        }
        match rule.num_of_due_days_in_first_period {
            Some(first) if first > max_days => Err(DomainError::InvalidSchedule(format!(
                "Number of due days in first period must be 0-{}, got {}",
                max_days, first
            ))),
            None if !aligned => Err(DomainError::InvalidSchedule(
                "Number of due days in first period is required when the schedule \
                 does not start on a period boundary"
                    .to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_before_start_rejected() {
        let result = Schedule::new(
            ScheduleKind::EveryDay,
            date(2024, 1, 10),
            Some(date(2024, 1, 9)),
            false,
            false,
        );
        assert!(matches!(result, Err(DomainError::InvalidSchedule(_))));
    }

    #[test]
    fn test_unaligned_weekly_requires_first_period() {
        // 2023-10-11 is a Wednesday
        let kind = ScheduleKind::WeeklyByNumOfDueDays {
            rule: PeriodicRule::new(5),
            start_day_of_week: Some(Weekday::Mon),
        };
        assert!(Schedule::new(kind, date(2023, 10, 11), None, true, false).is_err());

        let kind = ScheduleKind::WeeklyByNumOfDueDays {
            rule: PeriodicRule::new(5).with_first_period(4),
            start_day_of_week: Some(Weekday::Mon),
        };
        assert!(Schedule::new(kind, date(2023, 10, 11), None, true, false).is_ok());
    }

    #[test]
    fn test_aligned_calendar_month_needs_no_first_period() {
        let kind = ScheduleKind::MonthlyByNumOfDueDays {
            rule: PeriodicRule::new(10),
            anchor: PeriodAnchor::Calendar,
        };
        assert!(Schedule::new(kind.clone(), date(2024, 3, 1), None, false, false).is_ok());
        assert!(Schedule::new(kind, date(2024, 3, 2), None, false, false).is_err());
    }

    #[test]
    fn test_due_days_bounded_by_period() {
        let kind = ScheduleKind::PeriodicCustom {
            rule: PeriodicRule::new(4),
            num_of_days_in_period: 3,
        };
        assert!(Schedule::new(kind, date(2024, 1, 1), None, false, false).is_err());
    }

    #[test]
    fn test_feb_29_is_a_valid_annual_date() {
        let kind = ScheduleKind::AnnualByDueDates {
            dates: vec![MonthDay::new(2, 29)],
        };
        assert!(Schedule::new(kind, date(2023, 1, 1), None, false, false).is_ok());

        let kind = ScheduleKind::AnnualByDueDates {
            dates: vec![MonthDay::new(2, 30)],
        };
        assert!(Schedule::new(kind, date(2023, 1, 1), None, false, false).is_err());
    }

    #[test]
    fn test_nth_weekday_matching() {
        let second_tuesday = NthWeekday {
            nth: 2,
            weekday: Weekday::Tue,
        };
        assert!(second_tuesday.matches(date(2024, 5, 14)));
        assert!(!second_tuesday.matches(date(2024, 5, 7)));
        assert!(!second_tuesday.matches(date(2024, 5, 15)));
    }

    #[test]
    fn test_schedule_json_shape() {
        let schedule = Schedule::alternate_days(date(2023, 11, 1), true, true).unwrap();
        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"type\":\"periodic_custom\""));
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schedule);
    }
}
