//! Supabase (PostgREST) backend for templates and expenses.
//!
//! Thin HTTP wrapper over `/rest/v1/expense_cards` and `/rest/v1/expenses`.
//! Every query is filtered by `user_id` so rows stay scoped to the signed-in
//! owner. Wire rows use the service's snake_case column names; conversion to
//! the crate's model types happens in the pure `parse_*` functions.

#[cfg(test)]
#[path = "supabase_test.rs"]
mod supabase_test;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendError, ExpenseBackend, TemplateBackend};
use crate::model::{
    Amount, ExpenseRecord, NewExpense, NewTemplate, OwnerId, QuickAddTemplate, RecordId, TemplateId, TemplatePatch,
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

const CARDS_TABLE: &str = "expense_cards";
const EXPENSES_TABLE: &str = "expenses";

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupabaseConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`, without trailing slash.
    pub url: String,
    /// Public anon key sent as `apikey`.
    pub anon_key: String,
    /// User session token; the anon key is used as bearer when absent.
    pub access_token: Option<String>,
    /// Owner id of the signed-in user.
    pub owner_id: Option<OwnerId>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl SupabaseConfig {
    /// Build config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `SUPABASE_ACCESS_TOKEN`
    /// - `QUICKADD_OWNER_ID`
    /// - `SUPABASE_REQUEST_TIMEOUT_SECS`: default 15
    /// - `SUPABASE_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns `Missing` when a required variable is unset or blank.
    pub fn from_env() -> Result<Self, SupabaseConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `Missing` when a required key is absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SupabaseConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let url = non_blank("SUPABASE_URL").ok_or(SupabaseConfigError::Missing { var: "SUPABASE_URL" })?;
        let anon_key = non_blank("SUPABASE_ANON_KEY").ok_or(SupabaseConfigError::Missing { var: "SUPABASE_ANON_KEY" })?;
        let secs = |key: &str, default: u64| match non_blank(key).map(|v| v.parse::<u64>()) {
            Some(Ok(v)) => v,
            _ => default,
        };
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            access_token: non_blank("SUPABASE_ACCESS_TOKEN"),
            owner_id: non_blank("QUICKADD_OWNER_ID"),
            request_timeout_secs: secs("SUPABASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout_secs: secs("SUPABASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseBackend {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseBackend {
    /// # Errors
    ///
    /// Returns `Request` if the HTTP client cannot be built.
    pub fn new(config: SupabaseConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        let bearer = self.config.access_token.as_deref().unwrap_or(&self.config.anon_key);
        self.http
            .request(method, self.config.rest_url(table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// Send `builder` and return the body of a successful response.
    async fn send(builder: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        check_status(status, text)
    }
}

fn owner_filter(owner: &OwnerId) -> (&'static str, String) {
    ("user_id", format!("eq.{owner}"))
}

fn id_filter(id: &TemplateId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

#[async_trait]
impl TemplateBackend for SupabaseBackend {
    async fn list_templates(&self, owner: &OwnerId) -> Result<Vec<QuickAddTemplate>, BackendError> {
        let body = Self::send(
            self.request(reqwest::Method::GET, CARDS_TABLE)
                .query(&[owner_filter(owner), ("order", "created_at.desc".into()), ("select", "*".into())]),
        )
        .await?;
        parse_cards(&body)
    }

    async fn create_template(&self, owner: &OwnerId, data: &NewTemplate) -> Result<QuickAddTemplate, BackendError> {
        let row = CardInsert {
            user_id: owner,
            name: data.name.trim(),
            amount: data.amount,
            category: data.category.as_deref(),
            is_favorite: false,
        };
        let body = Self::send(
            self.request(reqwest::Method::POST, CARDS_TABLE)
                .header("Prefer", "return=representation")
                .json(&[row]),
        )
        .await?;
        first_card(&body, "created card")
    }

    async fn update_template(
        &self,
        owner: &OwnerId,
        id: &TemplateId,
        patch: &TemplatePatch,
    ) -> Result<QuickAddTemplate, BackendError> {
        let body = Self::send(
            self.request(reqwest::Method::PATCH, CARDS_TABLE)
                .query(&[id_filter(id), owner_filter(owner)])
                .header("Prefer", "return=representation")
                .json(patch),
        )
        .await?;
        first_card(&body, id.as_str())
    }

    async fn delete_template(&self, owner: &OwnerId, id: &TemplateId) -> Result<(), BackendError> {
        Self::send(
            self.request(reqwest::Method::DELETE, CARDS_TABLE)
                .query(&[id_filter(id), owner_filter(owner)]),
        )
        .await?;
        Ok(())
    }

    async fn set_favorite(&self, owner: &OwnerId, id: &TemplateId, value: bool) -> Result<(), BackendError> {
        Self::send(
            self.request(reqwest::Method::PATCH, CARDS_TABLE)
                .query(&[id_filter(id), owner_filter(owner)])
                .json(&serde_json::json!({ "is_favorite": value })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ExpenseBackend for SupabaseBackend {
    async fn list_expenses(&self, owner: &OwnerId) -> Result<Vec<ExpenseRecord>, BackendError> {
        let body = Self::send(
            self.request(reqwest::Method::GET, EXPENSES_TABLE)
                .query(&[owner_filter(owner), ("order", "date.desc".into()), ("select", "*".into())]),
        )
        .await?;
        parse_expenses(&body)
    }

    async fn create_expense(&self, data: &NewExpense) -> Result<ExpenseRecord, BackendError> {
        let row = ExpenseInsert {
            user_id: &data.owner_id,
            amount: data.amount,
            description: &data.description,
            category: &data.category,
            date: data.date,
            expense_card_id: data.source_template_id.as_ref().map(TemplateId::as_str),
        };
        let body = Self::send(
            self.request(reqwest::Method::POST, EXPENSES_TABLE)
                .header("Prefer", "return=representation")
                .json(&[row]),
        )
        .await?;
        let mut rows = parse_expenses(&body)?;
        if rows.is_empty() {
            return Err(BackendError::Parse("insert returned no rows".into()));
        }
        let record = rows.swap_remove(0);
        debug!(expense_id = %record.id, "expense stored");
        Ok(record)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CardInsert<'a> {
    user_id: &'a str,
    name: &'a str,
    amount: Amount,
    category: Option<&'a str>,
    is_favorite: bool,
}

#[derive(Serialize)]
struct ExpenseInsert<'a> {
    user_id: &'a str,
    amount: Amount,
    description: &'a str,
    category: &'a str,
    date: NaiveDate,
    expense_card_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct CardRow {
    id: WireId,
    user_id: String,
    name: String,
    amount: Amount,
    category: Option<String>,
    #[serde(default)]
    is_favorite: bool,
}

#[derive(Deserialize)]
struct ExpenseRow {
    id: WireId,
    user_id: String,
    amount: Amount,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    date: NaiveDate,
    #[serde(default)]
    expense_card_id: Option<WireId>,
}

/// Row ids may be uuids (strings) or bigint keys (numbers).
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> String {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

impl From<CardRow> for QuickAddTemplate {
    fn from(row: CardRow) -> Self {
        Self {
            id: TemplateId(row.id.into()),
            owner_id: row.user_id,
            name: row.name,
            amount: row.amount,
            category: row.category.filter(|c| !c.is_empty()),
            is_favorite: row.is_favorite,
        }
    }
}

impl From<ExpenseRow> for ExpenseRecord {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: RecordId::Durable(row.id.into()),
            owner_id: row.user_id,
            amount: row.amount,
            description: row.description.unwrap_or_default(),
            category: row
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| crate::consts::UNCATEGORIZED.to_string()),
            date: row.date,
            source_template_id: row.expense_card_id.map(|id| TemplateId(id.into())),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn check_status(status: u16, body: String) -> Result<String, BackendError> {
    match status {
        200..=299 => Ok(body),
        401 | 403 => Err(BackendError::NotAuthenticated),
        _ => Err(BackendError::Status { status, body }),
    }
}

fn parse_cards(json: &str) -> Result<Vec<QuickAddTemplate>, BackendError> {
    let rows: Vec<CardRow> = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(rows.into_iter().map(QuickAddTemplate::from).collect())
}

fn first_card(json: &str, what: &str) -> Result<QuickAddTemplate, BackendError> {
    parse_cards(json)?
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::NotFound(what.to_string()))
}

fn parse_expenses(json: &str) -> Result<Vec<ExpenseRecord>, BackendError> {
    let rows: Vec<ExpenseRow> = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(rows.into_iter().map(ExpenseRecord::from).collect())
}
