use chrono::TimeZone;

use super::*;
use crate::model::TemplateId;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
}

fn template(id: &str, name: &str, cents: i64, category: Option<&str>) -> QuickAddTemplate {
    QuickAddTemplate {
        id: TemplateId::new(id),
        owner_id: "u1".into(),
        name: name.into(),
        amount: Amount::from_cents(cents),
        category: category.map(Into::into),
        is_favorite: false,
    }
}

fn coffee() -> QuickAddTemplate {
    template("t1", "Coffee", 450, Some("Food"))
}

fn owner() -> Option<OwnerId> {
    Some("u1".into())
}

fn stored(req: &WriteRequest, id: &str) -> ExpenseRecord {
    req.expense.clone().into_record(RecordId::Durable(id.into()))
}

fn durable(id: &str, cents: i64, date: NaiveDate) -> ExpenseRecord {
    ExpenseRecord {
        id: RecordId::Durable(id.into()),
        owner_id: "u1".into(),
        amount: Amount::from_cents(cents),
        description: "Loaded".into(),
        category: "Food".into(),
        date,
        source_template_id: None,
    }
}

/// Issue a load and apply its result immediately.
fn load(c: &mut CommitCoordinator, records: Vec<ExpenseRecord>) {
    let seq = c.begin_load();
    c.hydrate(seq, records);
}

fn ids(c: &CommitCoordinator) -> Vec<String> {
    c.expenses().iter().map(|e| e.id.to_string()).collect()
}

// =============================================================
// Synthesis
// =============================================================

#[test]
fn synthesize_copies_template_fields() {
    let expense = synthesize(&coffee(), "u1".into(), today());
    assert_eq!(expense.owner_id, "u1");
    assert_eq!(expense.amount, Amount::from_cents(450));
    assert_eq!(expense.description, "Coffee");
    assert_eq!(expense.category, "Food");
    assert_eq!(expense.date, today());
    assert_eq!(expense.source_template_id, Some(TemplateId::new("t1")));
}

#[test]
fn synthesize_defaults_missing_category() {
    let expense = synthesize(&template("t2", "Bus", 275, None), "u1".into(), today());
    assert_eq!(expense.category, "Uncategorized");
    let expense = synthesize(&template("t2", "Bus", 275, Some("  ")), "u1".into(), today());
    assert_eq!(expense.category, "Uncategorized");
}

// =============================================================
// begin
// =============================================================

#[test]
fn begin_applies_optimistic_entry_first() {
    let mut c = CommitCoordinator::new();
    load(&mut c, vec![durable("e0", 100, today())]);
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();

    assert_eq!(c.expenses().len(), 2);
    assert_eq!(c.expenses()[0].id, RecordId::Provisional(req.provisional_id));
    assert_eq!(c.expenses()[0].amount, Amount::from_cents(450));
    assert_eq!(c.in_flight(), 1);
    let pending = c.pending(&req.provisional_id).unwrap();
    assert_eq!(pending.template, coffee());
    assert_eq!(pending.created_at, now());
}

#[test]
fn begin_rejects_invalid_template_without_state() {
    let mut c = CommitCoordinator::new();
    let err = c.begin(&template("t1", "Free", 0, None), owner(), today(), now()).unwrap_err();
    assert_eq!(err, CommitError::InvalidTemplate(InvalidTemplate::NonPositiveAmount));
    let err = c.begin(&template("t1", " ", 100, None), owner(), today(), now()).unwrap_err();
    assert_eq!(err, CommitError::InvalidTemplate(InvalidTemplate::EmptyName));
    assert!(c.expenses().is_empty());
    assert_eq!(c.in_flight(), 0);
}

#[test]
fn begin_without_owner_is_not_authenticated() {
    let mut c = CommitCoordinator::new();
    let err = c.begin(&coffee(), None, today(), now()).unwrap_err();
    assert_eq!(err, CommitError::NotAuthenticated);
    assert_eq!(err.error_code(), "E_NOT_AUTHENTICATED");
    assert!(c.expenses().is_empty());
}

#[test]
fn concurrent_commits_get_distinct_ids() {
    let mut c = CommitCoordinator::new();
    let a = c.begin(&coffee(), owner(), today(), now()).unwrap();
    let b = c.begin(&coffee(), owner(), today(), now()).unwrap();
    assert_ne!(a.provisional_id, b.provisional_id);
    assert_eq!(c.expenses().len(), 2);
    assert_eq!(c.in_flight(), 2);
}

// =============================================================
// reconcile
// =============================================================

#[test]
fn success_replaces_optimistic_entry_in_place() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    let outcome = c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));

    assert!(matches!(outcome, Reconciled::Confirmed { ref record, .. } if record.id == RecordId::Durable("e1".into())));
    assert_eq!(ids(&c), ["e1"]);
    assert_eq!(c.in_flight(), 0);
}

#[test]
fn failure_removes_only_its_own_entry() {
    let mut c = CommitCoordinator::new();
    load(&mut c, vec![durable("e0", 100, today())]);
    let a = c.begin(&coffee(), owner(), today(), now()).unwrap();
    let b = c.begin(&template("t2", "Bus", 275, None), owner(), today(), now()).unwrap();

    let outcome = c.reconcile(a.provisional_id, Err(BackendError::Request("timeout".into())));
    let Reconciled::RolledBack { template, error } = outcome else {
        panic!("expected rollback, got {outcome:?}");
    };
    assert_eq!(template.name, "Coffee");
    assert!(matches!(error, CommitError::PersistenceFailure(_)));

    assert_eq!(c.expenses().len(), 2);
    assert_eq!(c.expenses()[0].id, RecordId::Provisional(b.provisional_id));
    assert_eq!(c.expenses()[1].id, RecordId::Durable("e0".into()));
}

#[test]
fn out_of_order_results_reconcile_independently() {
    let mut c = CommitCoordinator::new();
    let a = c.begin(&coffee(), owner(), today(), now()).unwrap();
    let b = c.begin(&coffee(), owner(), today(), now()).unwrap();

    c.reconcile(b.provisional_id, Err(BackendError::Status { status: 500, body: String::new() }));
    c.reconcile(a.provisional_id, Ok(stored(&a, "e1")));

    assert_eq!(ids(&c), ["e1"]);
}

#[test]
fn duplicate_result_is_ignored() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    let again = c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    assert_eq!(again, Reconciled::Ignored);
    assert_eq!(ids(&c), ["e1"]);

    let late_failure = c.reconcile(req.provisional_id, Err(BackendError::NotAuthenticated));
    assert_eq!(late_failure, Reconciled::Ignored);
    assert_eq!(ids(&c), ["e1"]);
}

#[test]
fn success_for_already_visible_row_drops_duplicate() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    // Another commit's result or a load already surfaced e1.
    let other = c.begin(&coffee(), owner(), today(), now()).unwrap();
    c.reconcile(other.provisional_id, Ok(stored(&other, "e1")));

    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    assert_eq!(ids(&c), ["e1"]);
}

#[test]
fn backend_auth_failure_rolls_back_as_not_authenticated() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    let outcome = c.reconcile(req.provisional_id, Err(BackendError::NotAuthenticated));
    assert!(matches!(outcome, Reconciled::RolledBack { error: CommitError::NotAuthenticated, .. }));
    assert!(c.expenses().is_empty());
}

// =============================================================
// hydrate
// =============================================================

#[test]
fn hydrate_replaces_list_when_idle() {
    let mut c = CommitCoordinator::new();
    load(&mut c, vec![durable("e1", 100, today()), durable("e2", 200, today())]);
    assert_eq!(ids(&c), ["e1", "e2"]);
    load(&mut c, vec![durable("e3", 300, today())]);
    assert_eq!(ids(&c), ["e3"]);
}

#[test]
fn hydrate_waits_for_pending_commits() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    load(&mut c, vec![durable("e0", 100, today())]);

    // The optimistic entry is still visible and the load is held back.
    assert_eq!(c.expenses().len(), 1);
    assert!(c.expenses()[0].id.is_provisional());

    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    assert_eq!(ids(&c), ["e1", "e0"]);
}

#[test]
fn deferred_load_containing_commit_is_not_duplicated() {
    let mut c = CommitCoordinator::new();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    load(&mut c, vec![stored(&req, "e1"), durable("e0", 100, today())]);
    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    assert_eq!(ids(&c), ["e1", "e0"]);
}

#[test]
fn load_issued_before_confirmation_keeps_it() {
    let mut c = CommitCoordinator::new();
    let seq = c.begin_load();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));

    c.hydrate(seq, vec![durable("e0", 100, today())]);
    assert_eq!(ids(&c), ["e1", "e0"]);

    // A load issued after the confirmation is authoritative.
    load(&mut c, vec![durable("e5", 100, today())]);
    assert_eq!(ids(&c), ["e5"]);
}

#[test]
fn older_load_finishing_last_is_ignored() {
    let mut c = CommitCoordinator::new();
    let first = c.begin_load();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();
    c.reconcile(req.provisional_id, Ok(stored(&req, "e1")));
    let second = c.begin_load();

    c.hydrate(second, vec![stored(&req, "e1")]);
    assert_eq!(ids(&c), ["e1"]);
    c.hydrate(first, vec![]);
    assert_eq!(ids(&c), ["e1"]);
}

#[test]
fn newer_deferred_load_wins_over_older_one() {
    let mut c = CommitCoordinator::new();
    let first = c.begin_load();
    let second = c.begin_load();
    let req = c.begin(&coffee(), owner(), today(), now()).unwrap();

    c.hydrate(second, vec![durable("e2", 200, today())]);
    c.hydrate(first, vec![durable("e1", 100, today())]);
    c.reconcile(req.provisional_id, Err(BackendError::Request("offline".into())));

    assert_eq!(ids(&c), ["e2"]);
}

// =============================================================
// Totals
// =============================================================

#[test]
fn totals_split_day_and_month() {
    let mut c = CommitCoordinator::new();
    let earlier = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
    let last_month = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
    load(&mut c, vec![
        durable("e1", 1000, today()),
        durable("e2", 250, earlier),
        durable("e3", 9999, last_month),
    ]);
    c.begin(&coffee(), owner(), today(), now()).unwrap();

    assert_eq!(c.day_total(today()), Amount::from_cents(1450));
    assert_eq!(c.month_to_date_total(today()), Amount::from_cents(1700));
}

#[test]
fn totals_of_empty_list_are_zero() {
    let c = CommitCoordinator::new();
    assert_eq!(c.day_total(today()), Amount::ZERO);
    assert_eq!(c.month_to_date_total(today()), Amount::ZERO);
}

// =============================================================
// Messages
// =============================================================

#[test]
fn success_message_shows_amount() {
    assert_eq!(success_message(&coffee(), "$"), "$4.50 added to today's expenses");
}

#[test]
fn failure_messages_name_template_and_amount() {
    let failed = failure_message(&coffee(), &CommitError::PersistenceFailure("500".into()), "$");
    assert_eq!(failed, "Could not add Coffee ($4.50) to today's expenses");

    let auth = failure_message(&coffee(), &CommitError::NotAuthenticated, "$");
    assert_eq!(auth, "Sign in to add Coffee ($4.50)");

    let invalid = failure_message(
        &template("t1", "", 450, None),
        &CommitError::InvalidTemplate(InvalidTemplate::EmptyName),
        "$",
    );
    assert!(invalid.contains("expense card"));
    assert!(invalid.contains("$4.50"));
}
