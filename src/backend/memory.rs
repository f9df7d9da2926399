//! In-process backend for the headless driver and tests.
//!
//! Rows live behind a mutex and ids come from a counter. Writes can be made
//! to fail on demand and can be delayed to imitate network latency.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, ExpenseBackend, TemplateBackend};
use crate::model::{
    ExpenseRecord, NewExpense, NewTemplate, OwnerId, QuickAddTemplate, RecordId, TemplateId, TemplatePatch,
};

#[derive(Default)]
struct MemoryState {
    templates: Vec<QuickAddTemplate>,
    expenses: Vec<ExpenseRecord>,
    next_id: u64,
    expense_failures: VecDeque<BackendError>,
    template_failures: VecDeque<BackendError>,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed a template for `owner` and return it with its assigned id.
    pub fn seed_template(&self, owner: &OwnerId, data: NewTemplate) -> QuickAddTemplate {
        let mut state = self.lock();
        let template = QuickAddTemplate {
            id: TemplateId(state.next_id("tpl")),
            owner_id: owner.clone(),
            name: data.name,
            amount: data.amount,
            category: data.category,
            is_favorite: false,
        };
        state.templates.insert(0, template.clone());
        template
    }

    /// Make the next expense write fail with `error`. Calls queue up.
    pub fn fail_next_expense_write(&self, error: BackendError) {
        self.lock().expense_failures.push_back(error);
    }

    /// Make the next template call fail with `error`. Calls queue up.
    pub fn fail_next_template_call(&self, error: BackendError) {
        self.lock().template_failures.push_back(error);
    }

    /// Every stored expense, newest first.
    #[must_use]
    pub fn stored_expenses(&self) -> Vec<ExpenseRecord> {
        self.lock().expenses.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn template_failure(&self) -> Result<(), BackendError> {
        match self.lock().template_failures.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TemplateBackend for MemoryBackend {
    async fn list_templates(&self, owner: &OwnerId) -> Result<Vec<QuickAddTemplate>, BackendError> {
        self.delay().await;
        self.template_failure()?;
        Ok(self
            .lock()
            .templates
            .iter()
            .filter(|t| &t.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn create_template(&self, owner: &OwnerId, data: &NewTemplate) -> Result<QuickAddTemplate, BackendError> {
        self.delay().await;
        self.template_failure()?;
        Ok(self.seed_template(owner, data.clone()))
    }

    async fn update_template(
        &self,
        owner: &OwnerId,
        id: &TemplateId,
        patch: &TemplatePatch,
    ) -> Result<QuickAddTemplate, BackendError> {
        self.delay().await;
        self.template_failure()?;
        let mut state = self.lock();
        let template = state
            .templates
            .iter_mut()
            .find(|t| &t.id == id && &t.owner_id == owner)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        patch.apply_to(template);
        Ok(template.clone())
    }

    async fn delete_template(&self, owner: &OwnerId, id: &TemplateId) -> Result<(), BackendError> {
        self.delay().await;
        self.template_failure()?;
        self.lock()
            .templates
            .retain(|t| !(&t.id == id && &t.owner_id == owner));
        Ok(())
    }

    async fn set_favorite(&self, owner: &OwnerId, id: &TemplateId, value: bool) -> Result<(), BackendError> {
        self.delay().await;
        self.template_failure()?;
        let mut state = self.lock();
        let template = state
            .templates
            .iter_mut()
            .find(|t| &t.id == id && &t.owner_id == owner)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        template.is_favorite = value;
        Ok(())
    }
}

#[async_trait]
impl ExpenseBackend for MemoryBackend {
    async fn list_expenses(&self, owner: &OwnerId) -> Result<Vec<ExpenseRecord>, BackendError> {
        self.delay().await;
        Ok(self
            .lock()
            .expenses
            .iter()
            .filter(|e| &e.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn create_expense(&self, data: &NewExpense) -> Result<ExpenseRecord, BackendError> {
        self.delay().await;
        let mut state = self.lock();
        if let Some(e) = state.expense_failures.pop_front() {
            return Err(e);
        }
        let id = state.next_id("exp");
        let record = data.clone().into_record(RecordId::Durable(id));
        state.expenses.insert(0, record.clone());
        Ok(record)
    }
}
