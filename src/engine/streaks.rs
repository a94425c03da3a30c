/// Streak computation over a status sequence
///
/// A streak opens on a success and stays open across neutral days (not due,
/// skipped, on vacation, planned, already completed). A failure closes it on
/// the previous day. Partial completions in the past count as failures.

use chrono::{Duration, NaiveDate};

use crate::domain::HabitStatus;

/// Boundaries of one streak; `end` is `None` while it is still going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakRange {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl StreakRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }
}

/// Turns an ordered status sequence into streak ranges
#[derive(Debug, Clone, Copy)]
pub struct StreakCalculator {
    today: NaiveDate,
    schedule_end: Option<NaiveDate>,
}

impl StreakCalculator {
    pub fn new(today: NaiveDate, schedule_end: Option<NaiveDate>) -> Self {
        Self { today, schedule_end }
    }

    pub fn is_breaker(&self, date: NaiveDate, status: HabitStatus) -> bool {
        match status {
            HabitStatus::Failed | HabitStatus::NotCompleted => true,
            HabitStatus::PartiallyCompleted => date < self.today,
            _ => false,
        }
    }

    /// Compute streaks from statuses sorted by ascending date
    ///
    /// A streak still open once the schedule has ended (before today) is
    /// closed on the schedule's end date.
    pub fn compute<I>(&self, statuses: I) -> Vec<StreakRange>
    where
        I: IntoIterator<Item = (NaiveDate, HabitStatus)>,
    {
        let mut streaks = Vec::new();
        let mut open: Option<NaiveDate> = None;

        for (date, status) in statuses {
            if self.is_breaker(date, status) {
                if let Some(start) = open.take() {
                    streaks.push(StreakRange {
                        start,
                        end: Some(date - Duration::days(1)),
                    });
                }
            } else if status.is_streak_creator() && open.is_none() {
                open = Some(date);
            }
        }

        if let Some(start) = open {
            let end = self.schedule_end.filter(|end| *end < self.today);
            streaks.push(StreakRange { start, end });
        }

        streaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HabitStatus::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn sequence(statuses: &[HabitStatus]) -> Vec<(NaiveDate, HabitStatus)> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| (date(1) + Duration::days(i as i64), *status))
            .collect()
    }

    #[test]
    fn test_neutral_days_never_open_a_streak() {
        let calculator = StreakCalculator::new(date(10), None);
        let streaks = calculator.compute(sequence(&[Skipped, AlreadyCompleted, OnVacation, Planned]));
        assert!(streaks.is_empty());
    }

    #[test]
    fn test_failure_closes_streak_on_previous_day() {
        let calculator = StreakCalculator::new(date(10), None);
        let streaks = calculator.compute(sequence(&[
            Completed, Skipped, CompletedLater, NotCompleted, Skipped, OverCompleted, Planned,
        ]));

        assert_eq!(
            streaks,
            vec![
                StreakRange {
                    start: date(1),
                    end: Some(date(3)),
                },
                StreakRange {
                    start: date(6),
                    end: None,
                },
            ]
        );
    }

    #[test]
    fn test_partial_completion_breaks_only_in_the_past() {
        let calculator = StreakCalculator::new(date(3), None);
        let streaks = calculator.compute(sequence(&[Completed, PartiallyCompleted, PartiallyCompleted]));

        assert_eq!(
            streaks,
            vec![StreakRange {
                start: date(1),
                end: Some(date(1)),
            }]
        );
    }

    #[test]
    fn test_open_streak_closed_by_schedule_end() {
        let calculator = StreakCalculator::new(date(10), Some(date(2)));
        let streaks = calculator.compute(sequence(&[Completed, Completed]));
        assert_eq!(streaks[0].end, Some(date(2)));
        assert!(streaks[0].contains(date(2)));
        assert!(!streaks[0].contains(date(3)));
    }

    #[test]
    fn test_streaks_never_cover_breakers() {
        let statuses = sequence(&[
            Completed, Failed, SortedOutBacklog, NotDue, OverCompletedOnVacation, NotCompleted,
            CompletedLater,
        ]);
        let calculator = StreakCalculator::new(date(20), None);
        let streaks = calculator.compute(statuses.clone());

        for (date, status) in statuses {
            let covered = streaks.iter().any(|streak| streak.contains(date));
            if status.is_streak_creator() {
                assert!(covered, "{} should be covered", date);
            }
            if calculator.is_breaker(date, status) {
                assert!(!covered, "{} should not be covered", date);
            }
        }
        for pair in streaks.windows(2) {
            assert!(pair[0].end.unwrap() < pair[1].start);
        }
    }
}
