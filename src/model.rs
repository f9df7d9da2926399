//! Data model: quick-add templates, expense records, amounts, and ids.
//!
//! Templates and expenses arrive from the remote service as JSON and flow out
//! to the host UI through the view stream, so every type here is serde-ready.
//! Money is held as integer minor units (`Amount`) so totals and equality are
//! exact; the wire form is a plain decimal number.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::NaiveDate;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identity of the signed-in user that owns templates and expenses.
pub type OwnerId = String;

/// Opaque template id assigned by the backing store. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

impl TemplateId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// AMOUNT
// =============================================================================

/// A money amount in minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a decimal major-unit value (e.g. `4.50`) to an amount.
    ///
    /// Returns `None` for NaN, infinities, and values outside the `i64` cent range.
    #[must_use]
    pub fn from_major(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        #[allow(clippy::cast_precision_loss)]
        let in_range = cents >= i64::MIN as f64 && cents <= i64::MAX as f64;
        if !in_range {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        Some(Self(cents as i64))
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Render with a currency symbol and two decimals, e.g. `"$4.50"`.
    #[must_use]
    pub fn display(self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{symbol}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a finite decimal number or numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_major(v).ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        v.checked_mul(100)
            .map(Amount)
            .ok_or_else(|| E::custom(format!("amount out of range: {v}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format!("amount out of range: {v}")))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        let parsed: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid amount: {v:?}")))?;
        self.visit_f64(parsed)
    }
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Why a template payload was rejected before reaching the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTemplate {
    #[error("template name is empty")]
    EmptyName,
    #[error("template amount must be greater than zero")]
    NonPositiveAmount,
}

/// Check the fields every stored or committed template must satisfy.
///
/// # Errors
///
/// Returns the first rule the fields break.
pub fn validate_template_fields(name: &str, amount: Amount) -> Result<(), InvalidTemplate> {
    if name.trim().is_empty() {
        return Err(InvalidTemplate::EmptyName);
    }
    if !amount.is_positive() {
        return Err(InvalidTemplate::NonPositiveAmount);
    }
    Ok(())
}

/// A saved quick-add card the user can drag onto today's expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAddTemplate {
    pub id: TemplateId,
    pub owner_id: OwnerId,
    pub name: String,
    pub amount: Amount,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl QuickAddTemplate {
    /// # Errors
    ///
    /// Returns `InvalidTemplate` when the name is blank or the amount is not positive.
    pub fn validate(&self) -> Result<(), InvalidTemplate> {
        validate_template_fields(&self.name, self.amount)
    }
}

/// Payload for creating a template. The store assigns the id and owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub amount: Amount,
    #[serde(default)]
    pub category: Option<String>,
}

impl NewTemplate {
    /// # Errors
    ///
    /// Returns `InvalidTemplate` when the name is blank or the amount is not positive.
    pub fn validate(&self) -> Result<(), InvalidTemplate> {
        validate_template_fields(&self.name, self.amount)
    }
}

/// Sparse edit for a template. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TemplatePatch {
    /// # Errors
    ///
    /// Returns `InvalidTemplate` when a present field breaks a template rule.
    pub fn validate(&self) -> Result<(), InvalidTemplate> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(InvalidTemplate::EmptyName);
            }
        }
        if let Some(amount) = self.amount {
            if !amount.is_positive() {
                return Err(InvalidTemplate::NonPositiveAmount);
            }
        }
        Ok(())
    }

    /// Overwrite the present fields on `template`.
    pub fn apply_to(&self, template: &mut QuickAddTemplate) {
        if let Some(name) = &self.name {
            template.name.clone_from(name);
        }
        if let Some(amount) = self.amount {
            template.amount = amount;
        }
        if let Some(category) = &self.category {
            template.category = Some(category.clone());
        }
    }
}

// =============================================================================
// EXPENSES
// =============================================================================

/// Id of a visible expense: provisional until the service acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordId {
    /// Locally generated for an optimistic entry.
    Provisional(Uuid),
    /// Assigned by the backing store.
    Durable(String),
}

impl RecordId {
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisional(id) => write!(f, "local-{id}"),
            Self::Durable(id) => f.write_str(id),
        }
    }
}

/// An expense as shown in the dashboard list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub amount: Amount,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub source_template_id: Option<TemplateId>,
}

/// Payload for the durable expense write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub owner_id: OwnerId,
    pub amount: Amount,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub source_template_id: Option<TemplateId>,
}

impl NewExpense {
    #[must_use]
    pub fn into_record(self, id: RecordId) -> ExpenseRecord {
        ExpenseRecord {
            id,
            owner_id: self.owner_id,
            amount: self.amount,
            description: self.description,
            category: self.category,
            date: self.date,
            source_template_id: self.source_template_id,
        }
    }
}
