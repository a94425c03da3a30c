/// Basic unit tests to verify core functionality
use chrono::{Duration, NaiveDate, Weekday};
use habit_status_engine::engine::{resolve_period, Period};
use habit_status_engine::*;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, times: f64, status: HistoricalStatus) -> CompletionRecord {
        CompletionRecord::new(date, times, status, 0.0).unwrap()
    }

    #[test]
    fn test_habit_creation() {
        let schedule = Schedule::new(ScheduleKind::EveryDay, date(2024, 1, 1), None, false, false).unwrap();
        let habit = Habit::new("  Stretch  ".to_string(), HabitType::YesNo, schedule);

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Stretch");
        assert_eq!(habit.schedule_deviation, 0.0);
    }

    #[test]
    fn test_invalid_schedules_are_rejected() {
        let start = date(2024, 1, 1);

        let no_days = Schedule::new(ScheduleKind::WeeklyByDueDaysOfWeek { days: vec![] }, start, None, false, false);
        assert!(matches!(no_days, Err(DomainError::InvalidSchedule(_))));

        let too_many = Schedule::new(
            ScheduleKind::PeriodicCustom {
                rule: PeriodicRule::new(4),
                num_of_days_in_period: 3,
            },
            start,
            None,
            false,
            false,
        );
        assert!(matches!(too_many, Err(DomainError::InvalidSchedule(_))));

        let backwards = Schedule::new(ScheduleKind::EveryDay, start, Some(start - Duration::days(1)), false, false);
        assert!(matches!(backwards, Err(DomainError::InvalidSchedule(_))));
    }

    #[test]
    fn test_schedule_json_round_trip() {
        let json = r#"{
            "start_date": "2024-03-04",
            "backlog_enabled": true,
            "kind": {
                "type": "weekly_by_num_of_due_days",
                "rule": { "num_of_due_days": 3 },
                "start_day_of_week": "Mon"
            }
        }"#;
        let schedule: Schedule = serde_json::from_str(json).unwrap();

        assert!(schedule.validate().is_ok());
        assert!(schedule.backlog_enabled);
        assert!(!schedule.completing_ahead_enabled);
        assert_eq!(schedule.periodic_rule().map(|rule| rule.num_of_due_days), Some(3));
    }

    #[test]
    fn test_calendar_week_period() {
        let schedule = Schedule::new(
            ScheduleKind::WeeklyByNumOfDueDays {
                rule: PeriodicRule::new(3),
                start_day_of_week: Some(Weekday::Mon),
            },
            date(2024, 3, 4),
            None,
            false,
            false,
        )
        .unwrap();

        // Thursday 2024-03-14 falls in the week starting Monday the 11th
        let period = resolve_period(&schedule, date(2024, 3, 14), None).unwrap();
        assert_eq!(period, Period::new(date(2024, 3, 11), date(2024, 3, 17)));

        let alternate = Schedule::alternate_days(date(2024, 3, 4), false, false).unwrap();
        let period = resolve_period(&alternate, date(2024, 3, 7), None).unwrap();
        assert_eq!(period, Period::new(date(2024, 3, 6), date(2024, 3, 7)));
        assert_eq!(period.len_days(), 2);
    }

    #[test]
    fn test_every_day_snapshot() {
        let start = date(2024, 5, 1);
        let schedule = Schedule::new(ScheduleKind::EveryDay, start, None, false, false).unwrap();
        let habit = Habit::new("Read".to_string(), HabitType::YesNo, schedule).unwrap();
        let records: Vec<CompletionRecord> = (0..3)
            .map(|offset| record(start + Duration::days(offset), 1.0, HistoricalStatus::Completed))
            .collect();
        let snapshot = HabitSnapshot::new(habit, &records, vec![]);
        let today = date(2024, 5, 6);

        assert_eq!(snapshot.status(date(2024, 5, 3), today), HabitStatus::Completed);
        assert_eq!(snapshot.status(date(2024, 5, 4), today), HabitStatus::Failed);
        assert_eq!(snapshot.status(today, today), HabitStatus::Planned);
        assert_eq!(snapshot.status(date(2024, 4, 30), today), HabitStatus::NotStarted);

        assert_eq!(
            snapshot.streaks(today),
            vec![StreakRange {
                start,
                end: Some(date(2024, 5, 3)),
            }]
        );
    }

    #[test]
    fn test_vacation_days_are_neutral() {
        let start = date(2024, 5, 1);
        let schedule = Schedule::new(ScheduleKind::EveryDay, start, None, false, false).unwrap();
        let habit = Habit::new("Walk".to_string(), HabitType::YesNo, schedule).unwrap();
        let vacation = Vacation::new(habit.id.clone(), date(2024, 5, 2), Some(date(2024, 5, 3))).unwrap();
        let records = vec![
            record(date(2024, 5, 1), 1.0, HistoricalStatus::Completed),
            record(date(2024, 5, 4), 1.0, HistoricalStatus::Completed),
        ];
        let snapshot = HabitSnapshot::new(habit, &records, vec![vacation]);
        let today = date(2024, 5, 5);

        assert_eq!(snapshot.status(date(2024, 5, 2), today), HabitStatus::OnVacation);
        assert_eq!(
            snapshot.streaks(today),
            vec![StreakRange { start, end: None }]
        );
    }

    #[test]
    fn test_status_names_are_stable() {
        for status in HistoricalStatus::ALL {
            assert_eq!(HistoricalStatus::from_name(status.as_str()), Some(status));
            assert_eq!(HabitStatus::from(status).as_str(), status.as_str());
        }
        assert_eq!(HabitStatus::Planned.as_str(), "planned");
    }
}
