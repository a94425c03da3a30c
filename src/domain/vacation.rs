/// Vacation ranges during which a habit is not due
///
/// Vacations do not overlap per habit by convention; nothing here enforces it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HabitId, VacationId};

/// A break from a habit, open-ended when `end_date` is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: VacationId,
    pub habit_id: HabitId,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Vacation {
    /// Create a vacation with validation
    pub fn new(
        habit_id: HabitId,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, DomainError> {
        if let Some(end) = end_date {
            if end < start_date {
                return Err(DomainError::InvalidDate(format!(
                    "Vacation ends ({}) before it starts ({})",
                    end, start_date
                )));
            }
        }

        Ok(Self {
            id: VacationId::new(),
            habit_id,
            start_date,
            end_date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Whether the vacation touches the inclusive range at all
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date.map_or(true, |end| end >= from)
    }
}

/// Whether any vacation contains the date
pub fn is_on_vacation(vacations: &[Vacation], date: NaiveDate) -> bool {
    vacations.iter().any(|vacation| vacation.contains(date))
}

/// End of the latest vacation that finished strictly before `date`
pub fn last_vacation_end_before(vacations: &[Vacation], date: NaiveDate) -> Option<NaiveDate> {
    vacations
        .iter()
        .filter_map(|vacation| vacation.end_date)
        .filter(|end| *end < date)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, d).unwrap()
    }

    #[test]
    fn test_open_ended_vacation_contains_everything_after_start() {
        let vacation = Vacation::new(HabitId::new(), date(9), None).unwrap();
        assert!(!vacation.contains(date(8)));
        assert!(vacation.contains(date(9)));
        assert!(vacation.contains(date(30)));
    }

    #[test]
    fn test_inverted_vacation_rejected() {
        assert!(Vacation::new(HabitId::new(), date(9), Some(date(8))).is_err());
    }

    #[test]
    fn test_last_vacation_end_is_strictly_before() {
        let habit_id = HabitId::new();
        let vacations = vec![
            Vacation::new(habit_id.clone(), date(2), Some(date(3))).unwrap(),
            Vacation::new(habit_id, date(9), Some(date(11))).unwrap(),
        ];

        assert_eq!(last_vacation_end_before(&vacations, date(11)), Some(date(3)));
        assert_eq!(last_vacation_end_before(&vacations, date(12)), Some(date(11)));
        assert_eq!(last_vacation_end_before(&vacations, date(3)), None);
        assert!(is_on_vacation(&vacations, date(10)));
        assert!(!is_on_vacation(&vacations, date(12)));
    }
}
