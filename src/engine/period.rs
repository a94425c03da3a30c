/// Period boundary resolution for periodic schedules
///
/// Only the "by number of due days" variants have periods. Everything else
/// resolves to `None`, as do dates outside the schedule bounds.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

use crate::domain::{PeriodAnchor, Schedule, ScheduleKind};

/// An inclusive date range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1).max(0) as u32
    }

    /// 1-based position of `date` within the period
    pub fn ordinal_of(&self, date: NaiveDate) -> u32 {
        ((date - self.start).num_days() + 1).max(0) as u32
    }

    fn truncated(self, end_date: Option<NaiveDate>) -> Self {
        match end_date {
            Some(end) if end < self.end => Self::new(self.start, end),
            _ => self,
        }
    }
}

/// Resolve the period enclosing `date`
///
/// `last_vacation_end` restarts fixed-length periods the day after it, for
/// period-separated schedules only. Callers pass the end of the latest
/// vacation that finished strictly before `date`.
pub fn resolve_period(
    schedule: &Schedule,
    date: NaiveDate,
    last_vacation_end: Option<NaiveDate>,
) -> Option<Period> {
    if !schedule.contains(date) {
        return None;
    }
    let start = schedule.start_date;

    let period = match &schedule.kind {
        ScheduleKind::WeeklyByNumOfDueDays {
            start_day_of_week, ..
        } => weekly_period(start, *start_day_of_week, date),
        ScheduleKind::MonthlyByNumOfDueDays { anchor, .. } => monthly_period(start, *anchor, date)?,
        ScheduleKind::AnnualByNumOfDueDays { anchor, .. } => annual_period(start, *anchor, date)?,
        ScheduleKind::PeriodicCustom {
            rule,
            num_of_days_in_period,
        } => {
            let base = match last_vacation_end {
                Some(end) if rule.period_separation_enabled && end >= start && end < date => {
                    end + Duration::days(1)
                }
                _ => start,
            };
            fixed_period(base, *num_of_days_in_period, date)
        }
        ScheduleKind::EveryDay
        | ScheduleKind::WeeklyByDueDaysOfWeek { .. }
        | ScheduleKind::MonthlyByDueDatesIndices { .. }
        | ScheduleKind::AnnualByDueDates { .. }
        | ScheduleKind::CustomDates { .. } => return None,
    };

    Some(period.truncated(schedule.end_date))
}

/// Last calendar day of the month containing `date`
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next_month) => next_month - Duration::days(1),
        None => date,
    }
}

fn weekly_period(start: NaiveDate, start_day_of_week: Option<Weekday>, date: NaiveDate) -> Period {
    match start_day_of_week {
        None => fixed_period(start, 7, date),
        Some(first_day) => {
            let offset = (date.weekday().num_days_from_monday() + 7
                - first_day.num_days_from_monday())
                % 7;
            let week_start = date - Duration::days(i64::from(offset));
            Period::new(week_start.max(start), week_start + Duration::days(6))
        }
    }
}

fn monthly_period(start: NaiveDate, anchor: PeriodAnchor, date: NaiveDate) -> Option<Period> {
    match anchor {
        PeriodAnchor::Calendar => {
            let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
            Some(Period::new(first.max(start), last_day_of_month(date)))
        }
        PeriodAnchor::StartDate => {
            let months = (date.year() - start.year()) * 12 + date.month() as i32
                - start.month() as i32;
            rolling_period(start, months.max(0) as u32, 1, date)
        }
    }
}

fn annual_period(start: NaiveDate, anchor: PeriodAnchor, date: NaiveDate) -> Option<Period> {
    match anchor {
        PeriodAnchor::Calendar => {
            let first = NaiveDate::from_ymd_opt(date.year(), 1, 1)?;
            let last = NaiveDate::from_ymd_opt(date.year(), 12, 31)?;
            Some(Period::new(first.max(start), last))
        }
        PeriodAnchor::StartDate => {
            let years = (date.year() - start.year()).max(0) as u32;
            rolling_period(start, years, 12, date)
        }
    }
}

/// Period `n` of `months_per_period` months, counted from `start`
///
/// Month arithmetic always starts from `start` and clamps to the month end,
/// so a Jan 31 or Feb 29 start never drifts.
fn rolling_period(start: NaiveDate, guess: u32, months_per_period: u32, date: NaiveDate) -> Option<Period> {
    let nth_start = |n: u32| start.checked_add_months(Months::new(n * months_per_period));

    let mut n = guess;
    let mut period_start = nth_start(n)?;
    while period_start > date && n > 0 {
        n -= 1;
        period_start = nth_start(n)?;
    }
    let period_end = nth_start(n + 1)? - Duration::days(1);
    Some(Period::new(period_start, period_end))
}

fn fixed_period(base: NaiveDate, days_in_period: u32, date: NaiveDate) -> Period {
    let days_in_period = i64::from(days_in_period.max(1));
    let index = (date - base).num_days().max(0) / days_in_period;
    let period_start = base + Duration::days(index * days_in_period);
    Period::new(period_start, period_start + Duration::days(days_in_period - 1))
}
