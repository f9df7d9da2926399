//! Remote persistence and identity seams.
//!
//! DESIGN
//! ======
//! The dashboard never talks to the network directly. Template CRUD and the
//! durable expense write go through the async traits below, which are called
//! only from spawned write tasks. Identity is a plain synchronous accessor so
//! a commit can check it before creating any optimistic state.
//!
//! Two implementations ship with the crate: [`supabase::SupabaseBackend`] for
//! the hosted PostgREST service and [`memory::MemoryBackend`] for the headless
//! driver and tests.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;

use crate::error::ErrorCode;
use crate::model::{ExpenseRecord, NewExpense, NewTemplate, OwnerId, QuickAddTemplate, TemplateId, TemplatePatch};

// =============================================================================
// ERROR
// =============================================================================

/// Failures reported by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The service rejected the caller's credentials.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("service returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The addressed row does not exist for this owner.
    #[error("not found: {0}")]
    NotFound(String),
}

impl BackendError {
    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::Request(_) => "E_REQUEST",
            Self::Status { .. } => "E_STATUS",
            Self::Parse(_) => "E_PARSE",
            Self::NotFound(_) => "E_NOT_FOUND",
        }
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Template persistence, scoped to the authenticated owner.
#[async_trait]
pub trait TemplateBackend: Send + Sync {
    async fn list_templates(&self, owner: &OwnerId) -> Result<Vec<QuickAddTemplate>, BackendError>;

    async fn create_template(&self, owner: &OwnerId, data: &NewTemplate) -> Result<QuickAddTemplate, BackendError>;

    async fn update_template(
        &self,
        owner: &OwnerId,
        id: &TemplateId,
        patch: &TemplatePatch,
    ) -> Result<QuickAddTemplate, BackendError>;

    async fn delete_template(&self, owner: &OwnerId, id: &TemplateId) -> Result<(), BackendError>;

    async fn set_favorite(&self, owner: &OwnerId, id: &TemplateId, value: bool) -> Result<(), BackendError>;
}

/// Expense persistence.
#[async_trait]
pub trait ExpenseBackend: Send + Sync {
    /// Load the owner's expenses, newest first.
    async fn list_expenses(&self, owner: &OwnerId) -> Result<Vec<ExpenseRecord>, BackendError>;

    /// Durably create an expense and return the stored row.
    async fn create_expense(&self, data: &NewExpense) -> Result<ExpenseRecord, BackendError>;
}

/// Who is signed in. `None` means nobody.
pub trait Identity: Send + Sync {
    fn current_owner_id(&self) -> Option<OwnerId>;
}

/// An identity fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<OwnerId>);

impl Identity for StaticIdentity {
    fn current_owner_id(&self) -> Option<OwnerId> {
        self.0.clone()
    }
}
