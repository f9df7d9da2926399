//! Quick-add templates and the template command set.
//!
//! DESIGN
//! ======
//! The card menu (favorite, edit, delete, add to today) is a fixed set of
//! [`TemplateCommand`]s. The store validates a command against its local list
//! and turns it into either a remote [`TemplateRequest`] or a direct commit of
//! a template snapshot. Remote requests run on write tasks; their outcomes
//! come back through the event loop and are applied with [`TemplateStore::apply`].
//!
//! List requests are numbered when routed. A list older than the newest one
//! applied is dropped. Changes applied while a list is in flight are replayed
//! on top of it, so a list that was read before a create or delete landed
//! cannot undo it.
//!
//! ERROR HANDLING
//! ==============
//! Local rejections (bad payload, unknown id) happen before any request is
//! issued. Remote failures leave the local list untouched. Both end up as a
//! feedback message; none of them interrupt a drag in progress because the
//! session holds its own snapshot.

#[cfg(test)]
#[path = "templates_test.rs"]
mod templates_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{BackendError, TemplateBackend};
use crate::error::ErrorCode;
use crate::model::{InvalidTemplate, NewTemplate, OwnerId, QuickAddTemplate, TemplateId, TemplatePatch};

// =============================================================================
// TYPES
// =============================================================================

/// Commands issued from a template card or the template editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TemplateCommand {
    Create(NewTemplate),
    Edit { id: TemplateId, patch: TemplatePatch },
    Delete { id: TemplateId },
    ToggleFavorite { id: TemplateId },
    AddToToday { id: TemplateId },
    Refresh,
}

/// A remote template operation ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRequest {
    List { seq: u64 },
    Create(NewTemplate),
    Update { id: TemplateId, patch: TemplatePatch },
    Delete { id: TemplateId },
    SetFavorite { id: TemplateId, value: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRequestKind {
    List,
    Create,
    Update,
    Delete,
    SetFavorite,
}

/// Result of a successful [`TemplateRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOutcome {
    Listed { seq: u64, templates: Vec<QuickAddTemplate> },
    Created(QuickAddTemplate),
    Updated(QuickAddTemplate),
    Deleted(TemplateId),
    FavoriteSet { id: TemplateId, value: bool },
}

/// Where a command goes after local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Send to the template service.
    Remote(TemplateRequest),
    /// Commit this snapshot as an expense for today.
    Commit(QuickAddTemplate),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] InvalidTemplate),
    #[error("template not found: {0}")]
    NotFound(TemplateId),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<BackendError> for TemplateError {
    fn from(e: BackendError) -> Self {
        if e.is_not_authenticated() {
            Self::NotAuthenticated
        } else {
            Self::PersistenceFailure(e.to_string())
        }
    }
}

impl ErrorCode for TemplateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTemplate(_) => "E_INVALID_TEMPLATE",
            Self::NotFound(_) => "E_TEMPLATE_NOT_FOUND",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::PersistenceFailure(_) => "E_PERSISTENCE",
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

impl TemplateRequest {
    #[must_use]
    pub fn kind(&self) -> TemplateRequestKind {
        match self {
            Self::List { .. } => TemplateRequestKind::List,
            Self::Create(_) => TemplateRequestKind::Create,
            Self::Update { .. } => TemplateRequestKind::Update,
            Self::Delete { .. } => TemplateRequestKind::Delete,
            Self::SetFavorite { .. } => TemplateRequestKind::SetFavorite,
        }
    }

    /// Run the request against the service on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// Propagates the backend failure unchanged.
    pub async fn execute(self, owner: OwnerId, backend: Arc<dyn TemplateBackend>) -> Result<TemplateOutcome, BackendError> {
        match self {
            Self::List { seq } => backend
                .list_templates(&owner)
                .await
                .map(|templates| TemplateOutcome::Listed { seq, templates }),
            Self::Create(data) => backend
                .create_template(&owner, &data)
                .await
                .map(TemplateOutcome::Created),
            Self::Update { id, patch } => backend
                .update_template(&owner, &id, &patch)
                .await
                .map(TemplateOutcome::Updated),
            Self::Delete { id } => {
                backend.delete_template(&owner, &id).await?;
                Ok(TemplateOutcome::Deleted(id))
            }
            Self::SetFavorite { id, value } => {
                backend.set_favorite(&owner, &id, value).await?;
                Ok(TemplateOutcome::FavoriteSet { id, value })
            }
        }
    }
}

impl TemplateRequestKind {
    /// User-facing text for a failed request of this kind.
    #[must_use]
    pub fn failure_message(self, error: &TemplateError) -> &'static str {
        if matches!(error, TemplateError::NotAuthenticated) {
            return "Sign in to manage expense cards.";
        }
        match self {
            Self::List => "Could not load expense cards.",
            Self::Create => "Could not save expense card. Please try again.",
            Self::Update => "Could not update expense card. Please try again.",
            Self::Delete => "Could not delete expense card. Please try again.",
            Self::SetFavorite => "Could not update favorite status. Please try again.",
        }
    }
}

/// User-facing text for a command rejected before reaching the service.
#[must_use]
pub fn rejection_message(error: &TemplateError) -> &'static str {
    match error {
        TemplateError::InvalidTemplate(InvalidTemplate::EmptyName) => "Please enter a name for the expense card.",
        TemplateError::InvalidTemplate(InvalidTemplate::NonPositiveAmount) => "Please enter a valid positive amount.",
        TemplateError::NotFound(_) => "That expense card no longer exists.",
        TemplateError::NotAuthenticated => "Sign in to manage expense cards.",
        TemplateError::PersistenceFailure(_) => "Could not reach the server. Please try again.",
    }
}

// =============================================================================
// STORE
// =============================================================================

/// The signed-in user's templates, newest first.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<QuickAddTemplate>,
    lists_issued: u64,
    lists_applied: u64,
    /// Changes applied while a list was in flight, tagged with `lists_issued`.
    recent: Vec<(u64, TemplateOutcome)>,
}

impl TemplateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_templates(templates: Vec<QuickAddTemplate>) -> Self {
        Self { templates, ..Self::default() }
    }

    #[must_use]
    pub fn get(&self, id: &TemplateId) -> Option<&QuickAddTemplate> {
        self.templates.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn templates(&self) -> &[QuickAddTemplate] {
        &self.templates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Validate `command` against the local list and decide where it goes.
    ///
    /// # Errors
    ///
    /// `InvalidTemplate` for bad payloads, `NotFound` for ids the store does not hold.
    pub fn route(&mut self, command: TemplateCommand) -> Result<Routed, TemplateError> {
        match command {
            TemplateCommand::Refresh => {
                self.lists_issued += 1;
                Ok(Routed::Remote(TemplateRequest::List { seq: self.lists_issued }))
            }
            TemplateCommand::Create(data) => {
                data.validate()?;
                Ok(Routed::Remote(TemplateRequest::Create(data)))
            }
            TemplateCommand::Edit { id, patch } => {
                self.require(&id)?;
                patch.validate()?;
                Ok(Routed::Remote(TemplateRequest::Update { id, patch }))
            }
            TemplateCommand::Delete { id } => {
                self.require(&id)?;
                Ok(Routed::Remote(TemplateRequest::Delete { id }))
            }
            TemplateCommand::ToggleFavorite { id } => {
                let value = !self.require(&id)?.is_favorite;
                Ok(Routed::Remote(TemplateRequest::SetFavorite { id, value }))
            }
            TemplateCommand::AddToToday { id } => Ok(Routed::Commit(self.require(&id)?.clone())),
        }
    }

    /// Apply the outcome of a completed request.
    pub fn apply(&mut self, outcome: TemplateOutcome) {
        match outcome {
            TemplateOutcome::Listed { seq, templates } => self.apply_list(seq, templates),
            change => {
                self.merge(&change);
                if self.lists_issued > self.lists_applied {
                    self.recent.push((self.lists_issued, change));
                }
            }
        }
    }

    fn apply_list(&mut self, seq: u64, templates: Vec<QuickAddTemplate>) {
        if seq <= self.lists_applied {
            debug!(seq, lists_applied = self.lists_applied, "stale template list; ignoring");
            return;
        }
        self.lists_applied = seq;
        self.templates = templates;
        // A list issued after a change already reflects it.
        self.recent.retain(|(issued, _)| *issued >= seq);
        let recent = std::mem::take(&mut self.recent);
        for (_, change) in &recent {
            self.merge(change);
        }
        self.recent = recent;
    }

    fn merge(&mut self, change: &TemplateOutcome) {
        match change {
            TemplateOutcome::Listed { .. } => {}
            TemplateOutcome::Created(template) => {
                self.templates.retain(|t| t.id != template.id);
                self.templates.insert(0, template.clone());
            }
            TemplateOutcome::Updated(template) => {
                if let Some(slot) = self.templates.iter_mut().find(|t| t.id == template.id) {
                    *slot = template.clone();
                } else {
                    debug!(template_id = %template.id, "update for template no longer held; ignoring");
                }
            }
            TemplateOutcome::Deleted(id) => {
                self.templates.retain(|t| &t.id != id);
            }
            TemplateOutcome::FavoriteSet { id, value } => {
                if let Some(slot) = self.templates.iter_mut().find(|t| &t.id == id) {
                    slot.is_favorite = *value;
                }
            }
        }
    }

    fn require(&self, id: &TemplateId) -> Result<&QuickAddTemplate, TemplateError> {
        self.get(id).ok_or_else(|| TemplateError::NotFound(id.clone()))
    }
}
