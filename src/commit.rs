//! Optimistic expense commits.
//!
//! DESIGN
//! ======
//! A commit is split in two halves around the durable write. [`CommitCoordinator::begin`]
//! validates the template, synthesizes today's expense, inserts it into the
//! visible list under a fresh provisional id, and returns the [`WriteRequest`]
//! the caller must issue. [`CommitCoordinator::reconcile`] later applies the
//! write's result to exactly the entry it was issued for, keyed by provisional
//! id. Commits never lock each other; any number can be in flight.
//!
//! ERROR HANDLING
//! ==============
//! A failed write removes its own optimistic entry and nothing else. A second
//! result for the same provisional id finds no `PendingCommit` and is dropped,
//! so a duplicated response can never add a second row.
//!
//! Expense loads are numbered when issued. A load older than the newest one
//! already applied is dropped. Loads are held back while any commit is in
//! flight and merged once the pending set drains. A confirmed record stays
//! visible until a load issued after its confirmation is applied.

#[cfg(test)]
#[path = "commit_test.rs"]
mod commit_test;

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::consts::UNCATEGORIZED;
use crate::error::ErrorCode;
use crate::model::{Amount, ExpenseRecord, InvalidTemplate, NewExpense, OwnerId, QuickAddTemplate, RecordId};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] InvalidTemplate),
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("not authenticated")]
    NotAuthenticated,
}

impl From<BackendError> for CommitError {
    fn from(e: BackendError) -> Self {
        if e.is_not_authenticated() {
            Self::NotAuthenticated
        } else {
            Self::PersistenceFailure(e.to_string())
        }
    }
}

impl ErrorCode for CommitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTemplate(_) => "E_INVALID_TEMPLATE",
            Self::PersistenceFailure(_) => "E_PERSISTENCE",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
        }
    }
}

/// An optimistic write awaiting its durable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    pub provisional_id: Uuid,
    pub template: QuickAddTemplate,
    pub created_at: DateTime<Utc>,
}

/// The durable write the caller must issue for an optimistic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub provisional_id: Uuid,
    pub expense: NewExpense,
}

/// What a reconciliation did to the visible list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The optimistic entry now carries the stored id and fields.
    Confirmed { record: ExpenseRecord, template: QuickAddTemplate },
    /// The optimistic entry was removed.
    RolledBack { template: QuickAddTemplate, error: CommitError },
    /// No pending commit had this id; nothing changed.
    Ignored,
}

// =============================================================================
// COORDINATOR
// =============================================================================

#[derive(Debug, Default)]
pub struct CommitCoordinator {
    /// Visible expenses, newest first.
    expenses: Vec<ExpenseRecord>,
    pending: HashMap<Uuid, PendingCommit>,
    /// Sequence number of the newest load handed out.
    loads_issued: u64,
    /// Sequence number of the newest load applied.
    loads_applied: u64,
    /// A loaded list waiting for the pending set to drain.
    deferred_load: Option<(u64, Vec<ExpenseRecord>)>,
    /// Confirmed records, tagged with `loads_issued` at confirmation.
    confirmed: Vec<(u64, ExpenseRecord)>,
}

/// Build today's expense for `template`.
#[must_use]
pub fn synthesize(template: &QuickAddTemplate, owner_id: OwnerId, today: NaiveDate) -> NewExpense {
    let category = match template.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => UNCATEGORIZED.to_string(),
    };
    NewExpense {
        owner_id,
        amount: template.amount,
        description: template.name.clone(),
        category,
        date: today,
        source_template_id: Some(template.id.clone()),
    }
}

impl CommitCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, synthesize, and optimistically apply a commit of `template`.
    ///
    /// The entry is visible when this returns. The caller must issue the
    /// returned write and feed its result to [`Self::reconcile`].
    ///
    /// # Errors
    ///
    /// `InvalidTemplate` for a blank name or non-positive amount,
    /// `NotAuthenticated` when `owner_id` is `None`. No state changes on error.
    pub fn begin(
        &mut self,
        template: &QuickAddTemplate,
        owner_id: Option<OwnerId>,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<WriteRequest, CommitError> {
        template.validate()?;
        let owner_id = owner_id.ok_or(CommitError::NotAuthenticated)?;
        let expense = synthesize(template, owner_id, today);

        let provisional_id = Uuid::new_v4();
        self.pending.insert(
            provisional_id,
            PendingCommit { provisional_id, template: template.clone(), created_at: now },
        );
        self.expenses
            .insert(0, expense.clone().into_record(RecordId::Provisional(provisional_id)));

        info!(
            %provisional_id,
            template_id = %template.id,
            amount_cents = template.amount.cents(),
            in_flight = self.pending.len(),
            "optimistic expense applied"
        );
        Ok(WriteRequest { provisional_id, expense })
    }

    /// Apply the durable write result for `provisional_id`.
    pub fn reconcile(&mut self, provisional_id: Uuid, result: Result<ExpenseRecord, BackendError>) -> Reconciled {
        let Some(pending) = self.pending.remove(&provisional_id) else {
            debug!(%provisional_id, "no pending commit for result; ignoring");
            return Reconciled::Ignored;
        };
        let local_id = RecordId::Provisional(provisional_id);
        let slot = self.expenses.iter().position(|e| e.id == local_id);

        let outcome = match result {
            Ok(record) => {
                let already_visible = self.expenses.iter().any(|e| e.id == record.id);
                match slot {
                    Some(i) if already_visible => {
                        self.expenses.remove(i);
                    }
                    Some(i) => self.expenses[i] = record.clone(),
                    None if already_visible => {}
                    None => self.expenses.insert(0, record.clone()),
                }
                self.confirmed.push((self.loads_issued, record.clone()));
                info!(%provisional_id, expense_id = %record.id, "expense committed");
                Reconciled::Confirmed { record, template: pending.template }
            }
            Err(e) => {
                if let Some(i) = slot {
                    self.expenses.remove(i);
                }
                let error = CommitError::from(e);
                warn!(%provisional_id, error = %error, code = error.error_code(), "expense commit rolled back");
                Reconciled::RolledBack { template: pending.template, error }
            }
        };

        if self.pending.is_empty() {
            if let Some((seq, records)) = self.deferred_load.take() {
                self.apply_load(seq, records);
            }
        }
        outcome
    }

    /// Number the next expense load. Pass the result back to [`Self::hydrate`].
    pub fn begin_load(&mut self) -> u64 {
        self.loads_issued += 1;
        self.loads_issued
    }

    /// Replace the visible list with `records` from load `seq`.
    ///
    /// Deferred while commits are in flight. Ignored if a newer load has
    /// already been applied or deferred.
    pub fn hydrate(&mut self, seq: u64, records: Vec<ExpenseRecord>) {
        let newest_seen = match &self.deferred_load {
            Some((deferred, _)) => self.loads_applied.max(*deferred),
            None => self.loads_applied,
        };
        if seq <= newest_seen {
            debug!(seq, newest_seen, "stale expense load; ignoring");
            return;
        }
        if self.pending.is_empty() {
            self.apply_load(seq, records);
        } else {
            debug!(seq, in_flight = self.pending.len(), "deferring expense load until commits settle");
            self.deferred_load = Some((seq, records));
        }
    }

    fn apply_load(&mut self, seq: u64, mut records: Vec<ExpenseRecord>) {
        self.loads_applied = seq;
        // A load issued after a confirmation already reflects it.
        self.confirmed.retain(|(issued, _)| *issued >= seq);
        for (_, record) in &self.confirmed {
            if !records.iter().any(|r| r.id == record.id) {
                records.insert(0, record.clone());
            }
        }
        self.expenses = records;
    }

    /// Visible expenses, newest first.
    #[must_use]
    pub fn expenses(&self) -> &[ExpenseRecord] {
        &self.expenses
    }

    #[must_use]
    pub fn pending(&self, provisional_id: &Uuid) -> Option<&PendingCommit> {
        self.pending.get(provisional_id)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Sum of visible expenses dated `today`.
    #[must_use]
    pub fn day_total(&self, today: NaiveDate) -> Amount {
        self.expenses.iter().filter(|e| e.date == today).map(|e| e.amount).sum()
    }

    /// Sum of visible expenses from the first of `today`'s month through `today`.
    #[must_use]
    pub fn month_to_date_total(&self, today: NaiveDate) -> Amount {
        let first = today.with_day(1).unwrap_or(today);
        self.expenses
            .iter()
            .filter(|e| e.date >= first && e.date <= today)
            .map(|e| e.amount)
            .sum()
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Feedback text for a confirmed commit.
#[must_use]
pub fn success_message(template: &QuickAddTemplate, symbol: &str) -> String {
    format!("{} added to today's expenses", template.amount.display(symbol))
}

/// Feedback text for a rejected or rolled-back commit.
#[must_use]
pub fn failure_message(template: &QuickAddTemplate, error: &CommitError, symbol: &str) -> String {
    let amount = template.amount.display(symbol);
    match error {
        CommitError::InvalidTemplate(reason) => {
            format!("Could not add {} ({amount}): {reason}", display_name(template))
        }
        CommitError::NotAuthenticated => format!("Sign in to add {} ({amount})", display_name(template)),
        CommitError::PersistenceFailure(_) => {
            format!("Could not add {} ({amount}) to today's expenses", display_name(template))
        }
    }
}

fn display_name(template: &QuickAddTemplate) -> &str {
    let name = template.name.trim();
    if name.is_empty() { "expense card" } else { name }
}
