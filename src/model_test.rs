use super::*;

fn coffee() -> QuickAddTemplate {
    QuickAddTemplate {
        id: TemplateId::new("tpl-1"),
        owner_id: "owner-1".into(),
        name: "Coffee".into(),
        amount: Amount::from_cents(450),
        category: Some("Food".into()),
        is_favorite: false,
    }
}

// =============================================================
// Amount
// =============================================================

#[test]
fn amount_from_major_rounds_to_cents() {
    assert_eq!(Amount::from_major(4.5), Some(Amount::from_cents(450)));
    assert_eq!(Amount::from_major(0.1 + 0.2), Some(Amount::from_cents(30)));
    assert_eq!(Amount::from_major(19.999), Some(Amount::from_cents(2000)));
}

#[test]
fn amount_from_major_rejects_non_finite() {
    assert_eq!(Amount::from_major(f64::NAN), None);
    assert_eq!(Amount::from_major(f64::INFINITY), None);
    assert_eq!(Amount::from_major(f64::NEG_INFINITY), None);
}

#[test]
fn amount_display_pads_cents() {
    assert_eq!(Amount::from_cents(450).display("$"), "$4.50");
    assert_eq!(Amount::from_cents(5).display("$"), "$0.05");
    assert_eq!(Amount::from_cents(120_000).display("€"), "€1200.00");
    assert_eq!(Amount::from_cents(-250).display("$"), "-$2.50");
}

#[test]
fn amount_sum_is_exact() {
    let total: Amount = [10, 20, 70].into_iter().map(Amount::from_cents).sum();
    assert_eq!(total, Amount::from_cents(100));
}

#[test]
fn amount_deserializes_numbers_and_strings() {
    let a: Amount = serde_json::from_str("4.5").unwrap();
    let b: Amount = serde_json::from_str("\"4.50\"").unwrap();
    let c: Amount = serde_json::from_str("12").unwrap();
    assert_eq!(a, Amount::from_cents(450));
    assert_eq!(b, Amount::from_cents(450));
    assert_eq!(c, Amount::from_cents(1200));
}

#[test]
fn amount_rejects_non_numeric_string() {
    let result: Result<Amount, _> = serde_json::from_str("\"four fifty\"");
    assert!(result.is_err());
}

#[test]
fn amount_serializes_as_decimal_number() {
    let json = serde_json::to_value(Amount::from_cents(450)).unwrap();
    assert_eq!(json, serde_json::json!(4.5));
}

// =============================================================
// Template validation
// =============================================================

#[test]
fn valid_template_passes() {
    assert_eq!(coffee().validate(), Ok(()));
}

#[test]
fn blank_name_is_rejected() {
    let mut t = coffee();
    t.name = "   ".into();
    assert_eq!(t.validate(), Err(InvalidTemplate::EmptyName));
}

#[test]
fn zero_and_negative_amounts_are_rejected() {
    let mut t = coffee();
    t.amount = Amount::ZERO;
    assert_eq!(t.validate(), Err(InvalidTemplate::NonPositiveAmount));
    t.amount = Amount::from_cents(-1);
    assert_eq!(t.validate(), Err(InvalidTemplate::NonPositiveAmount));
}

#[test]
fn patch_validates_only_present_fields() {
    assert_eq!(TemplatePatch::default().validate(), Ok(()));
    let bad = TemplatePatch { amount: Some(Amount::ZERO), ..Default::default() };
    assert_eq!(bad.validate(), Err(InvalidTemplate::NonPositiveAmount));
    let blank = TemplatePatch { name: Some(String::new()), ..Default::default() };
    assert_eq!(blank.validate(), Err(InvalidTemplate::EmptyName));
}

#[test]
fn patch_applies_present_fields_and_keeps_the_rest() {
    let mut t = coffee();
    let patch = TemplatePatch { amount: Some(Amount::from_cents(500)), ..Default::default() };
    patch.apply_to(&mut t);
    assert_eq!(t.amount, Amount::from_cents(500));
    assert_eq!(t.name, "Coffee");
    assert_eq!(t.category.as_deref(), Some("Food"));
    assert_eq!(t.id, TemplateId::new("tpl-1"));
}

#[test]
fn patch_serializes_without_absent_fields() {
    let patch = TemplatePatch { name: Some("Tea".into()), ..Default::default() };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({ "name": "Tea" }));
}

// =============================================================
// Expense records
// =============================================================

#[test]
fn new_expense_into_record_keeps_fields() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let new = NewExpense {
        owner_id: "owner-1".into(),
        amount: Amount::from_cents(450),
        description: "Coffee".into(),
        category: "Food".into(),
        date,
        source_template_id: Some(TemplateId::new("tpl-1")),
    };
    let record = new.into_record(RecordId::Durable("exp-9".into()));
    assert_eq!(record.id, RecordId::Durable("exp-9".into()));
    assert_eq!(record.description, "Coffee");
    assert_eq!(record.date, date);
    assert!(!record.id.is_provisional());
}

#[test]
fn record_id_display_marks_provisional_ids() {
    let id = Uuid::nil();
    assert_eq!(RecordId::Provisional(id).to_string(), format!("local-{id}"));
    assert_eq!(RecordId::Durable("abc".into()).to_string(), "abc");
}
