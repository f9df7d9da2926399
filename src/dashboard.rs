//! Dashboard event loop and the API exposed to the host UI.
//!
//! DESIGN
//! ======
//! `Dashboard` is the single writer for every piece of quick-add state. The
//! host drives it with [`UiEvent`]s, either by calling the methods directly
//! or by feeding a channel into [`Dashboard::run`]. Remote calls never run on
//! the loop: each one is spawned as a task that sends a [`Completion`] back
//! through a bounded channel, and the loop applies completions in the order
//! the writes actually finish. After every mutation the loop publishes a fresh
//! [`ViewState`] on a `watch` channel.
//!
//! ERROR HANDLING
//! ==============
//! Session protocol violations and measurement failures are logged and
//! otherwise ignored. Commit and template failures become feedback messages.
//! Nothing here returns the loop to a broken state: every path ends with the
//! session idle and the dashboard usable.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod dashboard_test;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, ExpenseBackend, Identity, TemplateBackend};
use crate::clock::{Clock, SystemClock};
use crate::collision::{self, Collision};
use crate::commit::{self, CommitCoordinator, CommitError, Reconciled};
use crate::config::QuickAddConfig;
use crate::dropzone::{DropZoneTracker, LayoutProbe, MeasureError};
use crate::error::ErrorCode;
use crate::feedback::{FeedbackChannel, FeedbackKind, FeedbackMessage};
use crate::geometry::{DropZoneGeometry, Point};
use crate::gesture::{GestureError, GestureSession};
use crate::model::{Amount, ExpenseRecord, QuickAddTemplate, TemplateId};
use crate::templates::{
    rejection_message, Routed, TemplateCommand, TemplateError, TemplateOutcome, TemplateRequest, TemplateRequestKind,
    TemplateStore,
};

const EXPENSE_LOAD_FAILED: &str = "Could not load expenses.";

// =============================================================================
// TYPES
// =============================================================================

/// External collaborators the dashboard calls out to.
#[derive(Clone)]
pub struct Services {
    pub templates: Arc<dyn TemplateBackend>,
    pub expenses: Arc<dyn ExpenseBackend>,
    pub identity: Arc<dyn Identity>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Services on the system clock.
    #[must_use]
    pub fn new(
        templates: Arc<dyn TemplateBackend>,
        expenses: Arc<dyn ExpenseBackend>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self { templates, expenses, identity, clock: Arc::new(SystemClock) }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Input from the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    BeginDrag { template_id: TemplateId },
    UpdateDragPosition { x: f64, y: f64 },
    EndDrag,
    Remeasure,
    Command(TemplateCommand),
    DismissFeedback,
    /// Reload templates and expenses from the service.
    Refresh,
}

/// Result of a spawned remote call, delivered back to the loop.
#[derive(Debug)]
pub enum Completion {
    ExpenseWrite { provisional_id: Uuid, result: Result<ExpenseRecord, BackendError> },
    Template { kind: TemplateRequestKind, result: Result<TemplateOutcome, BackendError> },
    ExpensesLoaded { seq: u64, result: Result<Vec<ExpenseRecord>, BackendError> },
}

/// Everything the host needs to render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub expenses: Vec<ExpenseRecord>,
    pub templates: Vec<QuickAddTemplate>,
    pub feedback: Vec<FeedbackMessage>,
    /// A card is being dragged; the host highlights the drop zone.
    pub drag_active: bool,
    pub today_total: Amount,
    pub month_total: Amount,
}

/// What happened when a drag ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A hit; the optimistic entry is visible and its write is in flight.
    Committed { provisional_id: Uuid },
    /// A hit whose commit was refused before any state changed.
    Rejected(CommitError),
    /// The release point missed the drop zone.
    Missed,
    /// No drag was in progress.
    NotDragging,
}

enum Step {
    Ui(UiEvent),
    Completion(Completion),
    Tick,
}

// =============================================================================
// DASHBOARD
// =============================================================================

pub struct Dashboard {
    config: QuickAddConfig,
    services: Services,
    templates: TemplateStore,
    session: GestureSession,
    dropzone: DropZoneTracker,
    commits: CommitCoordinator,
    feedback: FeedbackChannel,
    /// Spawned remote calls whose completion has not been handled.
    outstanding: usize,
    completions_tx: mpsc::Sender<Completion>,
    completions_rx: mpsc::Receiver<Completion>,
    view_tx: watch::Sender<ViewState>,
}

impl Dashboard {
    #[must_use]
    pub fn new(config: QuickAddConfig, services: Services, probe: Box<dyn LayoutProbe>) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel(config.completion_queue_capacity.max(1));
        let (view_tx, _) = watch::channel(ViewState::default());
        let dropzone = DropZoneTracker::new(probe, services.clock.clone());
        let dashboard = Self {
            config,
            services,
            templates: TemplateStore::new(),
            session: GestureSession::new(),
            dropzone,
            commits: CommitCoordinator::new(),
            feedback: FeedbackChannel::new(),
            outstanding: 0,
            completions_tx,
            completions_rx,
            view_tx,
        };
        dashboard.publish();
        dashboard
    }

    /// Subscribe to the view stream. The receiver starts at the current view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Snapshot of what the host should render now.
    #[must_use]
    pub fn view(&self) -> ViewState {
        let today = self.services.clock.today();
        ViewState {
            expenses: self.commits.expenses().to_vec(),
            templates: self.templates.templates().to_vec(),
            feedback: self.feedback.messages().cloned().collect(),
            drag_active: self.session.is_dragging(),
            today_total: self.commits.day_total(today),
            month_total: self.commits.month_to_date_total(today),
        }
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    #[must_use]
    pub fn current_geometry(&self) -> Option<&DropZoneGeometry> {
        self.dropzone.current_geometry()
    }

    /// Remote calls spawned but not yet handled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    // -------------------------------------------------------------------------
    // Gesture
    // -------------------------------------------------------------------------

    /// Start dragging a template card.
    ///
    /// # Errors
    ///
    /// `InvalidState` while another drag is running, `UnknownTemplate` for an
    /// id the store does not hold. Both are logged and change nothing.
    pub fn begin_drag(&mut self, template_id: &TemplateId) -> Result<(), GestureError> {
        if let Err(e) = self.session.begin(template_id, &self.templates) {
            warn!(%template_id, error = %e, code = e.error_code(), "begin drag rejected");
            self.report(&e, e.to_string());
            return Err(e);
        }
        debug!(%template_id, "drag started");
        self.publish();
        Ok(())
    }

    /// Record the pointer's latest absolute position.
    pub fn update_drag_position(&mut self, x: f64, y: f64) -> bool {
        self.session.update_position(Point::new(x, y))
    }

    /// Finish the drag: resolve the release point and commit on a hit.
    pub fn end_drag(&mut self) -> DropOutcome {
        let release = match self.session.end() {
            Ok(release) => release,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "end drag rejected");
                self.report(&e, e.to_string());
                return DropOutcome::NotDragging;
            }
        };

        let collision = match release.point {
            Some(point) => collision::resolve(point, self.dropzone.current_geometry()),
            None => Collision::Miss,
        };
        debug!(
            template_id = %release.template.id,
            point = ?release.point,
            geometry_age_ms = ?self.dropzone.age_ms(),
            hit = collision.is_hit(),
            "drop resolved"
        );

        match collision {
            Collision::Hit => self.commit(&release.template),
            Collision::Miss => {
                self.publish();
                DropOutcome::Missed
            }
        }
    }

    /// Re-read the drop zone's layout.
    ///
    /// # Errors
    ///
    /// Returns the measurement failure; the previous geometry stays in use.
    pub fn remeasure(&mut self) -> Result<DropZoneGeometry, MeasureError> {
        self.dropzone.remeasure()
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Run a template card command.
    pub fn dispatch(&mut self, command: TemplateCommand) {
        match self.templates.route(command) {
            Ok(Routed::Remote(request)) => self.spawn_template_request(request),
            Ok(Routed::Commit(template)) => {
                self.commit(&template);
            }
            Err(e) => {
                info!(error = %e, code = e.error_code(), "template command rejected");
                self.report(&e, rejection_message(&e));
                self.publish();
            }
        }
    }

    /// Reload templates and expenses.
    pub fn refresh(&mut self) {
        self.dispatch(TemplateCommand::Refresh);
        self.load_expenses();
    }

    /// Dismiss the on-screen message.
    pub fn dismiss_feedback(&mut self) {
        if self.feedback.dismiss().is_some() {
            self.publish();
        }
    }

    /// Drop the on-screen message if its display time is over.
    pub fn expire_feedback(&mut self, now: Instant) {
        if self.feedback.expire(now).is_some() {
            self.publish();
        }
    }

    /// Apply one host input.
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::BeginDrag { template_id } => {
                // Logged inside; a rejected begin is a no-op.
                if self.begin_drag(&template_id).is_err() {
                    debug!(%template_id, "drag not started");
                }
            }
            UiEvent::UpdateDragPosition { x, y } => {
                self.update_drag_position(x, y);
            }
            UiEvent::EndDrag => {
                self.end_drag();
            }
            UiEvent::Remeasure => {
                if self.remeasure().is_err() {
                    debug!("keeping previous drop zone geometry");
                }
            }
            UiEvent::Command(command) => self.dispatch(command),
            UiEvent::DismissFeedback => self.dismiss_feedback(),
            UiEvent::Refresh => self.refresh(),
        }
    }

    // -------------------------------------------------------------------------
    // Commit pipeline
    // -------------------------------------------------------------------------

    fn commit(&mut self, template: &QuickAddTemplate) -> DropOutcome {
        let owner = self.services.identity.current_owner_id();
        let today = self.services.clock.today();
        let now = self.services.clock.now();

        let request = match self.commits.begin(template, owner, today, now) {
            Ok(request) => request,
            Err(e) => {
                warn!(template_id = %template.id, error = %e, code = e.error_code(), "commit refused");
                let text = commit::failure_message(template, &e, &self.config.currency_symbol);
                self.report(&e, text);
                self.publish();
                return DropOutcome::Rejected(e);
            }
        };

        let provisional_id = request.provisional_id;
        let backend = self.services.expenses.clone();
        self.spawn_remote(async move {
            let result = backend.create_expense(&request.expense).await;
            Completion::ExpenseWrite { provisional_id, result }
        });
        self.publish();
        DropOutcome::Committed { provisional_id }
    }

    fn spawn_template_request(&mut self, request: TemplateRequest) {
        let kind = request.kind();
        let Some(owner) = self.services.identity.current_owner_id() else {
            warn!(?kind, "template request without identity");
            let error = TemplateError::NotAuthenticated;
            self.report(&error, kind.failure_message(&error));
            self.publish();
            return;
        };
        let backend = self.services.templates.clone();
        self.spawn_remote(async move {
            let result = request.execute(owner, backend).await;
            Completion::Template { kind, result }
        });
    }

    fn load_expenses(&mut self) {
        let Some(owner) = self.services.identity.current_owner_id() else {
            debug!("expense load skipped without identity");
            return;
        };
        let seq = self.commits.begin_load();
        let backend = self.services.expenses.clone();
        self.spawn_remote(async move {
            let result = backend.list_expenses(&owner).await;
            Completion::ExpensesLoaded { seq, result }
        });
    }

    fn spawn_remote<F>(&mut self, call: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.outstanding += 1;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let completion = call.await;
            if tx.send(completion).await.is_err() {
                warn!("dashboard gone; dropping completion");
            }
        });
    }

    fn notify(&mut self, kind: FeedbackKind, text: impl Into<String>) {
        self.feedback.push(kind, text, self.config.feedback_duration_ms);
    }

    /// Show `text` as an error message unless `error` is log-only.
    fn report(&mut self, error: &dyn ErrorCode, text: impl Into<String>) {
        if error.user_visible() {
            self.notify(FeedbackKind::Error, text);
        } else {
            debug!(code = error.error_code(), "error kept out of feedback");
        }
    }

    // -------------------------------------------------------------------------
    // Completions
    // -------------------------------------------------------------------------

    /// Apply the result of a spawned remote call.
    pub fn handle(&mut self, completion: Completion) {
        self.outstanding = self.outstanding.saturating_sub(1);
        match completion {
            Completion::ExpenseWrite { provisional_id, result } => {
                match self.commits.reconcile(provisional_id, result) {
                    Reconciled::Confirmed { template, .. } => {
                        let text = commit::success_message(&template, &self.config.currency_symbol);
                        self.notify(FeedbackKind::Info, text);
                    }
                    Reconciled::RolledBack { template, error } => {
                        let text = commit::failure_message(&template, &error, &self.config.currency_symbol);
                        self.report(&error, text);
                    }
                    Reconciled::Ignored => {}
                }
            }
            Completion::Template { kind, result } => match result {
                Ok(outcome) => self.templates.apply(outcome),
                Err(e) => {
                    let error = TemplateError::from(e);
                    warn!(?kind, error = %error, code = error.error_code(), "template request failed");
                    self.report(&error, kind.failure_message(&error));
                }
            },
            Completion::ExpensesLoaded { seq, result } => match result {
                Ok(records) => {
                    debug!(seq, count = records.len(), "expenses loaded");
                    self.commits.hydrate(seq, records);
                }
                Err(e) => {
                    warn!(seq, error = %e, code = e.error_code(), "expense load failed");
                    self.report(&e, EXPENSE_LOAD_FAILED);
                }
            },
        }
        self.publish();
    }

    /// Wait for the next completion.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Wait for one completion and apply it. Returns `false` if nothing is outstanding.
    pub async fn pump(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }
        match self.next_completion().await {
            Some(completion) => {
                self.handle(completion);
                true
            }
            None => false,
        }
    }

    /// Drive the dashboard until `events` closes, then settle outstanding calls.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) {
        let mut ticker = tokio::time::interval(self.config.feedback_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            feedback_duration_ms = self.config.feedback_duration_ms,
            completion_queue_capacity = self.config.completion_queue_capacity,
            "dashboard loop started"
        );

        loop {
            let step = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => Step::Ui(event),
                    None => break,
                },
                Some(completion) = self.completions_rx.recv() => Step::Completion(completion),
                _ = ticker.tick() => Step::Tick,
            };
            match step {
                Step::Ui(event) => self.apply(event),
                Step::Completion(completion) => self.handle(completion),
                Step::Tick => self.expire_feedback(Instant::now()),
            }
        }

        // In-flight commits always reconcile, even after the host goes away.
        while self.pump().await {}
        info!(in_flight = self.commits.in_flight(), "dashboard loop stopped");
    }
}
