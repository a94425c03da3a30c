/// Due-date oracle
///
/// Answers "is this date due by the schedule" and "how many times is it due",
/// folding in vacations and the habit type's due counts.

use chrono::{Datelike, NaiveDate};

use crate::domain::{
    is_on_vacation, last_vacation_end_before, Habit, HabitType, PeriodicRule, Schedule,
    ScheduleKind, Vacation,
};
use crate::engine::period::{last_day_of_month, resolve_period, Period};
use crate::engine::days_between;

/// Whether `date` is due by the schedule alone, ignoring vacations
///
/// Dates outside `[start_date, end_date]` are never due. For periodic
/// schedules a date is due when its position within its period does not
/// exceed the period's due count, so due days are front-loaded.
pub fn is_due_by_schedule(
    schedule: &Schedule,
    date: NaiveDate,
    last_vacation_end: Option<NaiveDate>,
) -> bool {
    if !schedule.contains(date) {
        return false;
    }

    match &schedule.kind {
        ScheduleKind::EveryDay => true,
        ScheduleKind::WeeklyByDueDaysOfWeek { days } => days.contains(&date.weekday()),
        ScheduleKind::MonthlyByDueDatesIndices {
            day_indices,
            last_day_of_month: include_last_day,
            weekday_rules,
        } => {
            day_indices.contains(&date.day())
                || (*include_last_day && last_day_of_month(date) == date)
                || weekday_rules.iter().any(|rule| rule.matches(date))
        }
        ScheduleKind::AnnualByDueDates { dates } => dates.iter().any(|d| d.matches(date)),
        ScheduleKind::CustomDates { dates } => dates.contains(&date),
        ScheduleKind::WeeklyByNumOfDueDays { rule, .. }
        | ScheduleKind::MonthlyByNumOfDueDays { rule, .. }
        | ScheduleKind::AnnualByNumOfDueDays { rule, .. }
        | ScheduleKind::PeriodicCustom { rule, .. } => {
            match resolve_period(schedule, date, last_vacation_end) {
                Some(period) => period.ordinal_of(date) <= due_days_in_period(schedule, rule, &period),
                None => false,
            }
        }
    }
}

/// Due-day count for a period
///
/// The first period (the one starting on the schedule start date) uses its
/// own count when one is set. Counts never exceed the period's length.
pub fn due_days_in_period(schedule: &Schedule, rule: &PeriodicRule, period: &Period) -> u32 {
    let count = if period.start == schedule.start_date {
        rule.num_of_due_days_in_first_period
            .unwrap_or(rule.num_of_due_days)
    } else {
        rule.num_of_due_days
    };
    count.min(period.len_days())
}

/// A habit's schedule paired with its vacations
#[derive(Debug, Clone, Copy)]
pub struct DueCalendar<'a> {
    schedule: &'a Schedule,
    habit_type: HabitType,
    vacations: &'a [Vacation],
}

impl<'a> DueCalendar<'a> {
    pub fn new(habit: &'a Habit, vacations: &'a [Vacation]) -> Self {
        Self::from_parts(&habit.schedule, habit.habit_type, vacations)
    }

    pub fn from_parts(schedule: &'a Schedule, habit_type: HabitType, vacations: &'a [Vacation]) -> Self {
        Self {
            schedule,
            habit_type,
            vacations,
        }
    }

    pub fn schedule(&self) -> &'a Schedule {
        self.schedule
    }

    pub fn habit_type(&self) -> HabitType {
        self.habit_type
    }

    pub fn is_on_vacation(&self, date: NaiveDate) -> bool {
        is_on_vacation(self.vacations, date)
    }

    /// Period enclosing the date, restarted after vacations where applicable
    pub fn period_of(&self, date: NaiveDate) -> Option<Period> {
        resolve_period(self.schedule, date, self.vacation_restart(date))
    }

    pub fn is_due_by_schedule(&self, date: NaiveDate) -> bool {
        is_due_by_schedule(self.schedule, date, self.vacation_restart(date))
    }

    /// Times the habit must be done on `date`; zero on vacation or out of range
    pub fn due_times(&self, date: NaiveDate) -> f64 {
        if self.is_on_vacation(date) {
            return 0.0;
        }
        self.habit_type.num_of_due_times(self.is_due_by_schedule(date))
    }

    /// Capacity of `date` to take a backlog payment
    ///
    /// In-range dates that are not due (vacation days included) can each
    /// absorb one unit of completion.
    pub fn absorbable_times(&self, date: NaiveDate) -> f64 {
        if !self.schedule.contains(date) || self.due_times(date) > 0.0 {
            return 0.0;
        }
        self.habit_type.unit()
    }

    /// Total due times over an inclusive range
    pub fn due_sum(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        days_between(from, to).map(|date| self.due_times(date)).sum()
    }

    /// Total absorbable capacity over an inclusive range
    pub fn absorbable_sum(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        days_between(from, to)
            .map(|date| self.absorbable_times(date))
            .sum()
    }

    fn vacation_restart(&self, date: NaiveDate) -> Option<NaiveDate> {
        if self.schedule.period_separation_enabled() {
            last_vacation_end_before(self.vacations, date)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HabitId, MonthDay, NthWeekday};
    use chrono::Weekday;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(kind: ScheduleKind, start: NaiveDate) -> Schedule {
        Schedule::new(kind, start, None, false, false).unwrap()
    }

    fn due_dates(schedule: &Schedule, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        days_between(from, to)
            .filter(|d| is_due_by_schedule(schedule, *d, None))
            .collect()
    }

    #[test]
    fn test_every_day_respects_bounds() {
        let s = Schedule::new(
            ScheduleKind::EveryDay,
            date(2024, 1, 2),
            Some(date(2024, 1, 4)),
            false,
            false,
        )
        .unwrap();
        assert_eq!(
            due_dates(&s, date(2024, 1, 1), date(2024, 1, 5)),
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]
        );
    }

    #[test]
    fn test_weekly_by_days_of_week() {
        let s = schedule(
            ScheduleKind::WeeklyByDueDaysOfWeek {
                days: vec![Weekday::Mon, Weekday::Fri],
            },
            date(2024, 5, 1),
        );
        assert_eq!(
            due_dates(&s, date(2024, 5, 1), date(2024, 5, 7)),
            vec![date(2024, 5, 3), date(2024, 5, 6)]
        );
    }

    #[test]
    fn test_weekly_by_count_front_loads_due_days() {
        // 2023-10-11 is a Wednesday; the first week runs Wed..Sun
        let s = schedule(
            ScheduleKind::WeeklyByNumOfDueDays {
                rule: PeriodicRule::new(5).with_first_period(4),
                start_day_of_week: Some(Weekday::Mon),
            },
            date(2023, 10, 11),
        );
        assert_eq!(
            due_dates(&s, date(2023, 10, 11), date(2023, 10, 22)),
            vec![
                date(2023, 10, 11),
                date(2023, 10, 12),
                date(2023, 10, 13),
                date(2023, 10, 14),
                date(2023, 10, 16),
                date(2023, 10, 17),
                date(2023, 10, 18),
                date(2023, 10, 19),
                date(2023, 10, 20),
            ]
        );
    }

    #[test]
    fn test_first_period_count_clamped_to_short_period() {
        // Saturday start: the first calendar week is two days long
        let s = schedule(
            ScheduleKind::WeeklyByNumOfDueDays {
                rule: PeriodicRule::new(3).with_first_period(3),
                start_day_of_week: Some(Weekday::Mon),
            },
            date(2024, 6, 1),
        );
        assert_eq!(
            due_dates(&s, date(2024, 6, 1), date(2024, 6, 2)),
            vec![date(2024, 6, 1), date(2024, 6, 2)]
        );
    }

    #[test]
    fn test_monthly_indices_last_day_and_nth_weekday() {
        let s = schedule(
            ScheduleKind::MonthlyByDueDatesIndices {
                day_indices: vec![10],
                last_day_of_month: true,
                weekday_rules: vec![NthWeekday {
                    nth: 1,
                    weekday: Weekday::Mon,
                }],
            },
            date(2024, 2, 1),
        );
        assert_eq!(
            due_dates(&s, date(2024, 2, 1), date(2024, 2, 29)),
            vec![date(2024, 2, 5), date(2024, 2, 10), date(2024, 2, 29)]
        );
    }

    #[test]
    fn test_annual_feb_29_only_in_leap_years() {
        let s = schedule(
            ScheduleKind::AnnualByDueDates {
                dates: vec![MonthDay::new(2, 29)],
            },
            date(2023, 1, 1),
        );
        assert!(!is_due_by_schedule(&s, date(2023, 2, 28), None));
        assert!(!is_due_by_schedule(&s, date(2023, 3, 1), None));
        assert!(is_due_by_schedule(&s, date(2024, 2, 29), None));
    }

    #[test]
    fn test_custom_dates() {
        let dates: BTreeSet<NaiveDate> = [date(2024, 3, 3), date(2024, 3, 9)].into_iter().collect();
        let s = schedule(ScheduleKind::CustomDates { dates }, date(2024, 3, 1));
        assert_eq!(
            due_dates(&s, date(2024, 3, 1), date(2024, 3, 31)),
            vec![date(2024, 3, 3), date(2024, 3, 9)]
        );
    }

    #[test]
    fn test_vacation_zeroes_due_times() {
        let habit = Habit::new(
            "Walk".to_string(),
            HabitType::YesNo,
            schedule(ScheduleKind::EveryDay, date(2024, 1, 1)),
        )
        .unwrap();
        let vacations =
            vec![Vacation::new(HabitId::new(), date(2024, 1, 3), Some(date(2024, 1, 4))).unwrap()];
        let calendar = DueCalendar::new(&habit, &vacations);

        assert_eq!(calendar.due_times(date(2024, 1, 2)), 1.0);
        assert_eq!(calendar.due_times(date(2024, 1, 3)), 0.0);
        assert_eq!(calendar.absorbable_times(date(2024, 1, 3)), 1.0);
        assert_eq!(calendar.absorbable_times(date(2023, 12, 31)), 0.0);
        assert_eq!(calendar.due_sum(date(2024, 1, 1), date(2024, 1, 5)), 3.0);
        assert_eq!(calendar.absorbable_sum(date(2024, 1, 1), date(2024, 1, 5)), 2.0);
    }
}
