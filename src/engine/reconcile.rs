/// Backlog and completing-ahead reconciliation between settled records
///
/// An over-completion can pay for a missed date before it (sorting out
/// backlog) or cover a due date after it (completing ahead). Each operation
/// rewrites exactly two records and returns a receipt naming them, so the
/// inverse can restore the pair without guessing.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{Duration, NaiveDate};

use crate::domain::{CompletionRecord, HabitId, HistoricalStatus};
use crate::EngineError;

/// Settled records of one habit, keyed by date
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLedger {
    habit_id: HabitId,
    records: BTreeMap<NaiveDate, CompletionRecord>,
}

impl HistoryLedger {
    pub fn new(habit_id: HabitId) -> Self {
        Self {
            habit_id,
            records: BTreeMap::new(),
        }
    }

    pub fn from_records(habit_id: HabitId, records: impl IntoIterator<Item = CompletionRecord>) -> Self {
        Self {
            habit_id,
            records: records.into_iter().map(|record| (record.date, record)).collect(),
        }
    }

    pub fn habit_id(&self) -> &HabitId {
        &self.habit_id
    }

    pub fn get(&self, date: NaiveDate) -> Option<&CompletionRecord> {
        self.records.get(&date)
    }

    pub fn status_of(&self, date: NaiveDate) -> Option<HistoricalStatus> {
        self.records.get(&date).map(|record| record.status)
    }

    pub fn insert(&mut self, record: CompletionRecord) {
        self.records.insert(record.date, record);
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<CompletionRecord> {
        self.records.remove(&date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.records.values()
    }

    /// Latest date in the range whose record carries `status`
    pub fn latest_with_status(
        &self,
        status: HistoricalStatus,
        range: RangeInclusive<NaiveDate>,
    ) -> Option<NaiveDate> {
        if range.start() > range.end() {
            return None;
        }
        self.records
            .range(range)
            .rev()
            .find(|(_, record)| record.status == status)
            .map(|(date, _)| *date)
    }

    /// Earliest date in the range whose record carries `status`
    pub fn earliest_with_status(
        &self,
        status: HistoricalStatus,
        range: RangeInclusive<NaiveDate>,
    ) -> Option<NaiveDate> {
        if range.start() > range.end() {
            return None;
        }
        self.records
            .range(range)
            .find(|(_, record)| record.status == status)
            .map(|(date, _)| *date)
    }

    fn require(&self, date: NaiveDate) -> Result<&CompletionRecord, EngineError> {
        self.records
            .get(&date)
            .ok_or_else(|| self.inconsistent(date, "no record for this date"))
    }

    fn set_status(&mut self, date: NaiveDate, status: HistoricalStatus) {
        if let Some(record) = self.records.get_mut(&date) {
            record.status = status;
        }
    }

    fn inconsistent(&self, date: NaiveDate, reason: impl Into<String>) -> EngineError {
        EngineError::InconsistentHistoryState {
            habit_id: self.habit_id.to_string(),
            date,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationKind {
    SortedOutBacklog,
    CompletedAhead,
}

/// Receipt for one reconciliation: who paid and which date was covered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub kind: ReconciliationKind,
    pub payer: NaiveDate,
    pub borrowed: NaiveDate,
}

/// Pay off the most recent missed date before `date` with its over-completion
///
/// The missed date becomes `CompletedLater` and the payer becomes
/// `SortedOutBacklog` (or its vacation variant). `scope_start` bounds the
/// search, typically the start of the enclosing period.
pub fn sort_out_backlog(
    ledger: &mut HistoryLedger,
    date: NaiveDate,
    scope_start: NaiveDate,
) -> Result<Reconciliation, EngineError> {
    let payer = ledger.require(date)?.status;
    if !payer.is_over_completion() {
        return Err(ledger.inconsistent(
            date,
            format!("cannot sort out backlog from a {} record", payer),
        ));
    }

    let borrowed = ledger
        .latest_with_status(HistoricalStatus::NotCompleted, scope_start..=date - Duration::days(1))
        .ok_or_else(|| ledger.inconsistent(date, "no missed date to sort out"))?;

    ledger.set_status(borrowed, HistoricalStatus::CompletedLater);
    ledger.set_status(date, sorted_out_variant(payer));

    Ok(Reconciliation {
        kind: ReconciliationKind::SortedOutBacklog,
        payer: date,
        borrowed,
    })
}

/// Exact inverse of [`sort_out_backlog`]
pub fn undo_sorting_out_backlog(
    ledger: &mut HistoryLedger,
    receipt: &Reconciliation,
) -> Result<(), EngineError> {
    if receipt.kind != ReconciliationKind::SortedOutBacklog {
        return Err(ledger.inconsistent(receipt.payer, "receipt is not for a sorted-out backlog"));
    }
    let payer = ledger.require(receipt.payer)?.status;
    if !payer.is_sorted_out_backlog() {
        return Err(ledger.inconsistent(
            receipt.payer,
            format!("expected a sorted-out backlog, found {}", payer),
        ));
    }
    let borrowed = ledger.require(receipt.borrowed)?.status;
    if borrowed != HistoricalStatus::CompletedLater {
        return Err(ledger.inconsistent(
            receipt.borrowed,
            format!("expected completed_later, found {}", borrowed),
        ));
    }

    ledger.set_status(receipt.borrowed, HistoricalStatus::NotCompleted);
    ledger.set_status(receipt.payer, over_completed_variant(payer));
    Ok(())
}

/// Cover the nearest missed due date after `date` with its over-completion
///
/// The covered date becomes `AlreadyCompleted`; the payer keeps its status.
pub fn complete_ahead(
    ledger: &mut HistoryLedger,
    date: NaiveDate,
    scope_end: NaiveDate,
) -> Result<Reconciliation, EngineError> {
    let payer = ledger.require(date)?.status;
    if !payer.is_over_completion() {
        return Err(ledger.inconsistent(
            date,
            format!("cannot complete ahead from a {} record", payer),
        ));
    }

    let borrowed = ledger
        .earliest_with_status(HistoricalStatus::NotCompleted, date + Duration::days(1)..=scope_end)
        .ok_or_else(|| ledger.inconsistent(date, "no due date ahead to complete"))?;

    ledger.set_status(borrowed, HistoricalStatus::AlreadyCompleted);

    Ok(Reconciliation {
        kind: ReconciliationKind::CompletedAhead,
        payer: date,
        borrowed,
    })
}

/// Exact inverse of [`complete_ahead`]
pub fn undo_completing_ahead(
    ledger: &mut HistoryLedger,
    receipt: &Reconciliation,
) -> Result<(), EngineError> {
    if receipt.kind != ReconciliationKind::CompletedAhead {
        return Err(ledger.inconsistent(receipt.payer, "receipt is not for a completed-ahead date"));
    }
    let borrowed = ledger.require(receipt.borrowed)?.status;
    if borrowed != HistoricalStatus::AlreadyCompleted {
        return Err(ledger.inconsistent(
            receipt.borrowed,
            format!("expected already_completed, found {}", borrowed),
        ));
    }

    ledger.set_status(receipt.borrowed, HistoricalStatus::NotCompleted);
    Ok(())
}

/// Find the missed date a stored sorted-out backlog paid for
///
/// Walks backward from the payer. Payments are matched last-in first-out:
/// every other sorted-out backlog passed on the way claims the next
/// `CompletedLater` date before this one can.
pub fn locate_sorted_out_backlog(
    ledger: &HistoryLedger,
    payer: NaiveDate,
    scope_start: NaiveDate,
) -> Result<Reconciliation, EngineError> {
    let status = ledger.require(payer)?.status;
    if !status.is_sorted_out_backlog() {
        return Err(ledger.inconsistent(
            payer,
            format!("expected a sorted-out backlog, found {}", status),
        ));
    }

    let mut pending = 0usize;
    if scope_start < payer {
        for (date, record) in ledger.records.range(scope_start..payer).rev() {
            if record.status.is_sorted_out_backlog() {
                pending += 1;
            } else if record.status == HistoricalStatus::CompletedLater {
                if pending == 0 {
                    return Ok(Reconciliation {
                        kind: ReconciliationKind::SortedOutBacklog,
                        payer,
                        borrowed: *date,
                    });
                }
                pending -= 1;
            }
        }
    }

    Err(ledger.inconsistent(payer, "no completed_later date matches this payment"))
}

/// Find the due date a stored over-completion covered ahead of time, if any
pub fn locate_completed_ahead(
    ledger: &HistoryLedger,
    payer: NaiveDate,
    scope_end: NaiveDate,
) -> Option<Reconciliation> {
    let is_payer = ledger
        .status_of(payer)
        .map_or(false, |status| status.is_over_completion());
    if !is_payer || scope_end <= payer {
        return None;
    }

    let mut pending = 0usize;
    for (date, record) in ledger.records.range(payer + Duration::days(1)..=scope_end) {
        if record.status.is_over_completion() {
            pending += 1;
        } else if record.status == HistoricalStatus::AlreadyCompleted {
            if pending == 0 {
                return Some(Reconciliation {
                    kind: ReconciliationKind::CompletedAhead,
                    payer,
                    borrowed: *date,
                });
            }
            pending -= 1;
        }
    }
    None
}

fn sorted_out_variant(status: HistoricalStatus) -> HistoricalStatus {
    match status {
        HistoricalStatus::OverCompletedOnVacation => HistoricalStatus::SortedOutBacklogOnVacation,
        _ => HistoricalStatus::SortedOutBacklog,
    }
}

fn over_completed_variant(status: HistoricalStatus) -> HistoricalStatus {
    match status {
        HistoricalStatus::SortedOutBacklogOnVacation => HistoricalStatus::OverCompletedOnVacation,
        _ => HistoricalStatus::OverCompleted,
    }
}
