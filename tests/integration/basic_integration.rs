/// Basic integration tests
use chrono::{Duration, NaiveDate};
use habit_status_engine::storage::VacationStore;
use habit_status_engine::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    fn nov(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, d).unwrap()
    }

    fn open_engine(file: &NamedTempFile) -> HabitEngine {
        HabitEngine::open(file.path().to_path_buf()).expect("Failed to open engine")
    }

    fn every_day(engine: &mut HabitEngine) -> HabitId {
        let schedule = Schedule::new(ScheduleKind::EveryDay, nov(1), None, false, false).unwrap();
        engine
            .create_habit("Meditate", HabitType::YesNo, schedule)
            .expect("Failed to create habit")
            .id
    }

    fn stored_statuses(engine: &HabitEngine, habit_id: &HabitId, from: NaiveDate, to: NaiveDate) -> Vec<HistoricalStatus> {
        engine
            .history(habit_id, from, to)
            .unwrap()
            .into_iter()
            .map(|record| record.status)
            .collect()
    }

    #[test]
    fn test_database_persistence() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");

        let habit_id = {
            let mut engine = open_engine(&temp_file);
            let habit_id = every_day(&mut engine);
            engine.set_completion(&habit_id, nov(1), 1.0, nov(2)).unwrap();
            habit_id
        };

        // Reopen against the same file
        let engine = open_engine(&temp_file);
        let habits = engine.habits().unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, habit_id);
        assert_eq!(habits[0].name, "Meditate");

        assert_eq!(stored_statuses(&engine, &habit_id, nov(1), nov(1)), vec![HistoricalStatus::Completed]);
        assert_eq!(engine.streaks(&habit_id).unwrap().len(), 1);
    }

    #[test]
    fn test_three_weeks_of_alternate_days() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let mut engine = open_engine(&temp_file);

        let schedule = Schedule::alternate_days(nov(1), true, true).unwrap();
        let habit_id = engine.create_habit("Gym", HabitType::YesNo, schedule).unwrap().id;
        engine.add_vacation(&habit_id, nov(9), Some(nov(11)), nov(1)).unwrap();

        let completed = [1, 3, 4, 10, 11, 16, 17];
        for offset in 0..21 {
            let today = nov(1) + Duration::days(offset);
            engine.settle(&habit_id, today).unwrap();
            if completed.contains(&(offset as u32 + 1)) {
                engine.set_completion(&habit_id, today, 1.0, today).unwrap();
            }
        }
        engine.settle(&habit_id, nov(22)).unwrap();

        use HistoricalStatus::*;
        assert_eq!(
            stored_statuses(&engine, &habit_id, nov(1), nov(21)),
            vec![
                Completed,
                Skipped,
                Completed,
                OverCompleted,
                AlreadyCompleted,
                Skipped,
                CompletedLater,
                Skipped,
                NotCompletedOnVacation,
                SortedOutBacklogOnVacation,
                OverCompletedOnVacation,
                Skipped,
                AlreadyCompleted,
                Skipped,
                CompletedLater,
                SortedOutBacklog,
                Completed,
                Skipped,
                NotCompleted,
                Skipped,
                NotCompleted,
            ]
        );

        let streaks: Vec<_> = engine
            .streaks(&habit_id)
            .unwrap()
            .into_iter()
            .map(|streak| (streak.start_date, streak.end_date))
            .collect();
        assert_eq!(streaks, vec![(nov(1), Some(nov(18)))]);
        assert_eq!(engine.get_habit(&habit_id).unwrap().schedule_deviation, -2.0);
        assert_eq!(engine.current_streak(&habit_id, nov(22)).unwrap(), None);
    }

    #[test]
    fn test_retroactive_vacation_resettles_missed_days() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let mut engine = open_engine(&temp_file);
        let habit_id = every_day(&mut engine);

        engine.set_completion(&habit_id, nov(1), 1.0, nov(1)).unwrap();
        engine.set_completion(&habit_id, nov(2), 1.0, nov(2)).unwrap();
        engine.settle(&habit_id, nov(5)).unwrap();

        assert_eq!(
            stored_statuses(&engine, &habit_id, nov(3), nov(4)),
            vec![HistoricalStatus::NotCompleted, HistoricalStatus::NotCompleted]
        );
        assert_eq!(engine.get_habit(&habit_id).unwrap().schedule_deviation, -2.0);
        assert_eq!(engine.current_streak(&habit_id, nov(5)).unwrap(), None);

        engine.add_vacation(&habit_id, nov(3), Some(nov(4)), nov(5)).unwrap();
        let stored = engine.repository().get_in_period(&habit_id, nov(1)..=nov(5)).unwrap();
        assert_eq!(stored.len(), 1);

        assert_eq!(
            stored_statuses(&engine, &habit_id, nov(3), nov(4)),
            vec![
                HistoricalStatus::NotCompletedOnVacation,
                HistoricalStatus::NotCompletedOnVacation
            ]
        );
        assert_eq!(engine.status_of(&habit_id, nov(3), nov(5)).unwrap(), HabitStatus::OnVacation);
        assert_eq!(engine.get_habit(&habit_id).unwrap().schedule_deviation, 0.0);

        let current = engine.current_streak(&habit_id, nov(5)).unwrap().unwrap();
        assert_eq!((current.start_date, current.end_date), (nov(1), None));
    }

    #[test]
    fn test_statuses_in_range() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let mut engine = open_engine(&temp_file);
        let habit_id = every_day(&mut engine);

        engine.set_completion(&habit_id, nov(2), 1.0, nov(3)).unwrap();

        let statuses: Vec<HabitStatus> = engine
            .statuses_in(&habit_id, nov(1) - Duration::days(1), nov(4), nov(3))
            .unwrap()
            .into_iter()
            .map(|(_, status)| status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                HabitStatus::NotStarted,
                HabitStatus::Failed,
                HabitStatus::Completed,
                HabitStatus::Planned,
                HabitStatus::Planned,
            ]
        );
    }

    #[test]
    fn test_unknown_habit() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let mut engine = open_engine(&temp_file);

        let result = engine.toggle(&HabitId::new(), nov(1), nov(1));
        assert!(matches!(
            result,
            Err(EngineError::Database(StorageError::HabitNotFound { .. }))
        ));
        assert!(engine.status_of(&HabitId::new(), nov(1), nov(1)).is_err());
    }
}
