/// History orchestration: applying completion changes and settling days
///
/// Every mutation runs inside `HabitRepository::atomically` and follows the
/// same steps:
///
/// 1. Load the habit, its vacations and the stored history for the window.
/// 2. Settle past dates that have no record yet, using the old counts.
/// 3. Reconcile the changed date against its backlog or ahead counterpart.
///    This yields the receipt and checks the stored pairing; its status
///    writes are superseded by step 4.
/// 4. Re-settle every date in the window against the new counts, which
///    rewrites anything the change cascaded into.
/// 5. Write the differences, the habit's deviation and the streak diff.

use chrono::{Duration, NaiveDate};

use crate::domain::{
    CompletionHistory, CompletionRecord, DomainError, Habit, HabitId, HabitStatus,
    HistoricalStatus, Schedule, Streak, Vacation,
};
use crate::engine::due::DueCalendar;
use crate::engine::reconcile::{self, HistoryLedger, Reconciliation};
use crate::engine::status::HabitStatusComputer;
use crate::engine::streaks::{StreakCalculator, StreakRange};
use crate::engine::days_between;
use crate::storage::{Direction, HabitRepository};
use crate::EngineError;

/// What a mutation did
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// The date that was changed, if any
    pub date: Option<NaiveDate>,
    /// Status of the changed date afterwards
    pub status: Option<HabitStatus>,
    /// Completion count recorded for the changed date
    pub times_completed: Option<f64>,
    /// Backlog or ahead pairing made (or undone) for the changed date
    pub reconciliation: Option<Reconciliation>,
    /// Records inserted or rewritten, including cascades
    pub records_written: usize,
    pub records_deleted: usize,
    /// Streak rows inserted, updated or deleted
    pub streaks_changed: usize,
    /// The habit's deviation after the mutation
    pub schedule_deviation: f64,
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Set(f64),
    Toggle,
}

/// Applies completion changes to a repository
pub struct HistoryOrchestrator<'r, R> {
    repo: &'r mut R,
}

impl<'r, R: HabitRepository> HistoryOrchestrator<'r, R> {
    pub fn new(repo: &'r mut R) -> Self {
        Self { repo }
    }

    /// Record `times` completions on `date`, as of `today`
    pub fn set_completion(
        &mut self,
        habit_id: &HabitId,
        date: NaiveDate,
        times: f64,
        today: NaiveDate,
    ) -> Result<MutationOutcome, EngineError> {
        CompletionRecord::validate_times_completed(times)?;
        self.run(habit_id, today, Some((date, Change::Set(times))))
    }

    /// Flip `date` between done and not done
    ///
    /// Done dates drop to zero. Missed due dates get their full due count.
    /// Not-due dates and vacation days get a single unit.
    pub fn toggle(
        &mut self,
        habit_id: &HabitId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<MutationOutcome, EngineError> {
        self.run(habit_id, today, Some((date, Change::Toggle)))
    }

    /// Settle every past date that has no record yet and refresh streaks
    pub fn settle(&mut self, habit_id: &HabitId, today: NaiveDate) -> Result<MutationOutcome, EngineError> {
        self.run(habit_id, today, None)
    }

    /// Store a vacation and re-settle every date it can affect
    pub fn add_vacation(&mut self, vacation: &Vacation, today: NaiveDate) -> Result<MutationOutcome, EngineError> {
        self.repo.atomically(|repo| {
            repo.get_by_id(&vacation.habit_id)?;
            repo.insert_vacation(vacation)?;
            tracing::debug!(
                "Added vacation {} for habit {} from {}",
                vacation.id,
                vacation.habit_id,
                vacation.start_date
            );
            apply(repo, &vacation.habit_id, today, None, Some(vacation.start_date))
        })
    }

    fn run(
        &mut self,
        habit_id: &HabitId,
        today: NaiveDate,
        change: Option<(NaiveDate, Change)>,
    ) -> Result<MutationOutcome, EngineError> {
        self.repo
            .atomically(|repo| apply(repo, habit_id, today, change, None))
    }
}

fn apply<R: HabitRepository>(
    repo: &mut R,
    habit_id: &HabitId,
    today: NaiveDate,
    change: Option<(NaiveDate, Change)>,
    recompute_from: Option<NaiveDate>,
) -> Result<MutationOutcome, EngineError> {
    let habit = repo.get_by_id(habit_id)?;
    let schedule = &habit.schedule;
    let start = schedule.start_date;

    if let Some((date, Change::Set(_))) = change {
        validate_completion_date(schedule, date, today)?;
    }

    let yesterday = today - Duration::days(1);
    let settle_end = schedule.end_date.map_or(yesterday, |end| end.min(yesterday));
    let vacations = repo.get_in_period(habit_id, start..=today.max(start))?;
    let calendar = DueCalendar::new(&habit, &vacations);

    // Recompute window: the habit start, or the start of the earliest
    // affected period when periods are separated
    let last_settled = if settle_end >= start {
        repo.get_first_or_last_by_status(habit_id, &HistoricalStatus::ALL, settle_end, Direction::Last)?
            .map(|record| record.date)
    } else {
        None
    };
    let first_unsettled = last_settled.map_or(start, |date| date + Duration::days(1));
    let mut earliest = first_unsettled.min(today);
    if let Some((date, _)) = change {
        earliest = earliest.min(date);
    }
    if let Some(date) = recompute_from {
        earliest = earliest.min(date.max(start));
    }
    if let Some(end) = schedule.end_date {
        earliest = earliest.min(end);
    }
    let window_start = if schedule.period_separation_enabled() {
        calendar.period_of(earliest).map_or(start, |period| period.start)
    } else {
        start
    };

    // Streaks are recomputed from just after the last breaker that the
    // window cannot change
    let streak_from = if window_start > start {
        repo.get_first_or_last_by_status(
            habit_id,
            &HistoricalStatus::STREAK_BREAKERS,
            window_start - Duration::days(1),
            Direction::Last,
        )?
        .map_or(start, |record| record.date + Duration::days(1))
    } else {
        start
    };

    tracing::debug!(
        "Recomputing habit {} from {} (streaks from {}) as of {}",
        habit_id,
        window_start,
        streak_from,
        today
    );

    let stored_records = repo.get_history(habit_id, streak_from..=today.max(streak_from))?;
    let stored = HistoryLedger::from_records(habit_id.clone(), stored_records.iter().cloned());
    let before_counts = CompletionHistory::from_records(&stored_records);
    let before = HabitStatusComputer::new(&habit, &before_counts, &vacations, today);

    let target = match change {
        Some((date, Change::Set(times))) => Some((date, times)),
        Some((date, Change::Toggle)) => Some((date, toggle_target(&before, &stored, date, today)?)),
        None => None,
    };

    let mut after_counts = before_counts.clone();
    if let Some((date, times)) = target {
        after_counts.set(date, times);
    }
    let after = HabitStatusComputer::new(&habit, &after_counts, &vacations, today);

    let mut working = stored.clone();
    for date in days_between(window_start, settle_end) {
        if working.get(date).is_none() {
            if let Some(record) = before.settled_record(date) {
                working.insert(record);
            }
        }
    }

    let mut reconciliation = None;
    if let Some((date, _)) = target {
        let (scope_start, scope_end) = reconcile_scope(&calendar, date);
        reconciliation = reconcile_change(
            &mut working,
            schedule,
            date,
            record_for(&after, date, today),
            scope_start,
            scope_end,
        )?;
        if let Some(receipt) = &reconciliation {
            tracing::debug!(
                "Reconciled {:?}: {} paid for {}",
                receipt.kind,
                receipt.payer,
                receipt.borrowed
            );
        }
    }

    let mut cascaded = 0usize;
    for date in days_between(window_start, settle_end) {
        if let Some(record) = after.settled_record(date) {
            if working.get(date) != Some(&record) {
                if target.map_or(true, |(changed, _)| changed != date) {
                    cascaded += 1;
                }
                working.insert(record);
            }
        }
    }
    if schedule.contains(today) {
        match record_for(&after, today, today) {
            Some(record) => working.insert(record),
            None => {
                working.remove(today);
            }
        }
    }
    if cascaded > 0 {
        tracing::debug!("Cascaded into {} other dates of habit {}", cascaded, habit_id);
    }

    let mut records_written = 0usize;
    for record in working.iter() {
        if stored.get(record.date) != Some(record) {
            repo.upsert_record(habit_id, record)?;
            records_written += 1;
        }
    }
    let mut records_deleted = 0usize;
    for record in stored.iter() {
        if working.get(record.date).is_none() {
            repo.delete_record(habit_id, record.date)?;
            records_deleted += 1;
        }
    }

    let schedule_deviation = after.accumulator().current();
    if schedule_deviation != habit.schedule_deviation {
        repo.update_deviation(habit_id, schedule_deviation)?;
    }

    let streak_end = schedule.end_date.map_or(today, |end| end.min(today));
    let statuses = days_between(streak_from, streak_end).map(|date| {
        let status = match working.status_of(date) {
            Some(status) if date < today => HabitStatus::from(status),
            _ => after.status(date),
        };
        (date, status)
    });
    let computed = StreakCalculator::new(today, schedule.end_date).compute(statuses);
    let streaks_changed = sync_streaks(repo, &habit, streak_from, &computed)?;

    let outcome = MutationOutcome {
        date: target.map(|(date, _)| date),
        status: target.map(|(date, _)| after.status(date)),
        times_completed: target.map(|(_, times)| times),
        reconciliation,
        records_written,
        records_deleted,
        streaks_changed,
        schedule_deviation,
    };

    tracing::debug!(
        "Habit {}: {} records written, {} deleted, {} streak changes",
        habit_id,
        outcome.records_written,
        outcome.records_deleted,
        outcome.streaks_changed
    );
    Ok(outcome)
}

fn validate_completion_date(schedule: &Schedule, date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if date > today {
        return Err(DomainError::InvalidDate(format!(
            "Cannot record completions for future date {}",
            date
        )));
    }
    if !schedule.contains(date) {
        return Err(DomainError::InvalidDate(format!(
            "Date {} is outside the habit's schedule",
            date
        )));
    }
    Ok(())
}

/// The record `date` should carry: settled for past dates, and for today
/// only once something has been completed
fn record_for(computer: &HabitStatusComputer<'_>, date: NaiveDate, today: NaiveDate) -> Option<CompletionRecord> {
    if date >= today && !computer.history().is_completed(date) {
        return None;
    }
    computer.settled_record(date)
}

/// Bounds within which a date's backlog or ahead counterpart can live
fn reconcile_scope(calendar: &DueCalendar<'_>, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let schedule = calendar.schedule();
    if schedule.period_separation_enabled() {
        if let Some(period) = calendar.period_of(date) {
            return (period.start, period.end);
        }
    }
    (schedule.start_date, schedule.end_date.unwrap_or(NaiveDate::MAX))
}

/// Move the changed date's pairing to match its new record
///
/// Undoing a stored sorted-out backlog must find its counterpart whenever a
/// `CompletedLater` date precedes it in scope. A payment that only made up
/// partial completions has no such date and nothing to undo. The other steps
/// apply only when a counterpart exists. The re-settle pass that follows is
/// authoritative for every status written here.
fn reconcile_change(
    working: &mut HistoryLedger,
    schedule: &Schedule,
    date: NaiveDate,
    new_record: Option<CompletionRecord>,
    scope_start: NaiveDate,
    scope_end: NaiveDate,
) -> Result<Option<Reconciliation>, EngineError> {
    let old = working.status_of(date);
    let new = new_record.as_ref().map(|record| record.status);

    let was_sorted = old.map_or(false, |s| s.is_sorted_out_backlog());
    let is_sorted = new.map_or(false, |s| s.is_sorted_out_backlog());
    let was_over = old.map_or(false, |s| s.is_over_completion());
    let is_over = new.map_or(false, |s| s.is_over_completion());

    let before_date = date.pred_opt().unwrap_or(date);
    let after_date = date.succ_opt().unwrap_or(date);

    let mut receipt = None;

    if was_sorted && !is_sorted {
        let paid_for_missed = before_date < date
            && working
                .latest_with_status(HistoricalStatus::CompletedLater, scope_start..=before_date)
                .is_some();
        if paid_for_missed {
            let located = reconcile::locate_sorted_out_backlog(working, date, scope_start)?;
            reconcile::undo_sorting_out_backlog(working, &located)?;
            receipt = Some(located);
        } else {
            tracing::debug!("Sorted-out backlog on {} covered partial completions only", date);
        }
    }

    if was_over && !is_over && schedule.completing_ahead_enabled {
        if let Some(located) = reconcile::locate_completed_ahead(working, date, scope_end) {
            reconcile::undo_completing_ahead(working, &located)?;
            receipt = Some(located);
        }
    }

    let Some(record) = new_record else {
        working.remove(date);
        return Ok(receipt);
    };

    if is_sorted && !was_sorted {
        let has_missed = before_date < date
            && working
                .latest_with_status(HistoricalStatus::NotCompleted, scope_start..=before_date)
                .is_some();
        if has_missed {
            // sort_out_backlog expects the payer as a plain over-completion
            let payer_status = if record.status == HistoricalStatus::SortedOutBacklogOnVacation {
                HistoricalStatus::OverCompletedOnVacation
            } else {
                HistoricalStatus::OverCompleted
            };
            working.insert(CompletionRecord {
                status: payer_status,
                ..record
            });
            receipt = Some(reconcile::sort_out_backlog(working, date, scope_start)?);
        } else {
            working.insert(record);
        }
        return Ok(receipt);
    }

    working.insert(record);

    if is_over && !was_over && schedule.completing_ahead_enabled {
        let has_ahead = after_date > date
            && working
                .earliest_with_status(HistoricalStatus::NotCompleted, after_date..=scope_end)
                .is_some();
        if has_ahead {
            receipt = Some(reconcile::complete_ahead(working, date, scope_end)?);
        }
    }

    Ok(receipt)
}

/// Completion count a toggle moves `date` to
fn toggle_target(
    before: &HabitStatusComputer<'_>,
    stored: &HistoryLedger,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<f64, EngineError> {
    let unsupported = |status: HabitStatus, reason: String| EngineError::UnsupportedTransition {
        date,
        status,
        reason,
    };

    if date > today {
        return Err(unsupported(
            before.status(date),
            "future dates cannot be toggled".to_string(),
        ));
    }

    let current = stored
        .status_of(date)
        .map(HabitStatus::from)
        .unwrap_or_else(|| before.status(date));
    let unit = before.habit().habit_type.unit();

    match current {
        HabitStatus::Completed
        | HabitStatus::PartiallyCompleted
        | HabitStatus::OverCompleted
        | HabitStatus::SortedOutBacklog
        | HabitStatus::OverCompletedOnVacation
        | HabitStatus::SortedOutBacklogOnVacation => Ok(0.0),
        HabitStatus::NotCompleted
        | HabitStatus::Failed
        | HabitStatus::CompletedLater
        | HabitStatus::AlreadyCompleted
        | HabitStatus::Planned => {
            let due = before.num_of_due_times(date);
            if due > 0.0 {
                Ok(due)
            } else {
                Err(unsupported(current, "date is no longer due".to_string()))
            }
        }
        HabitStatus::Skipped | HabitStatus::NotDue | HabitStatus::Backlog => {
            match before.status(date) {
                HabitStatus::NotDue | HabitStatus::Backlog => Ok(unit),
                planning => Err(unsupported(
                    current,
                    format!("date now evaluates to {}", planning),
                )),
            }
        }
        HabitStatus::OnVacation | HabitStatus::NotCompletedOnVacation => Ok(unit),
        HabitStatus::NotStarted | HabitStatus::Finished => Err(unsupported(
            current,
            "date is outside the habit's schedule".to_string(),
        )),
    }
}

/// Bring stored streaks starting at or after `from` in line with `computed`
///
/// Streaks are matched by start date: matching ones keep their identity and
/// get their end updated, the rest are deleted or inserted.
fn sync_streaks<R: HabitRepository>(
    repo: &mut R,
    habit: &Habit,
    from: NaiveDate,
    computed: &[StreakRange],
) -> Result<usize, EngineError> {
    let existing: Vec<Streak> = repo
        .get_streaks(&habit.id)?
        .into_iter()
        .filter(|streak| streak.start_date >= from)
        .collect();

    let mut changed = 0usize;

    for stale in existing
        .iter()
        .filter(|streak| !computed.iter().any(|range| range.start == streak.start_date))
    {
        repo.delete_streak(&stale.id)?;
        changed += 1;
    }

    for range in computed {
        match existing.iter().find(|streak| streak.start_date == range.start) {
            Some(streak) if streak.end_date == range.end => {}
            Some(streak) => {
                let mut updated = streak.clone();
                updated.end_date = range.end;
                repo.update_streak(&updated)?;
                changed += 1;
            }
            None => {
                repo.insert_streak(&Streak::new(habit.id.clone(), range.start, range.end))?;
                changed += 1;
            }
        }
    }

    Ok(changed)
}
