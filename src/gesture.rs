//! Drag session state machine.
//!
//! One `GestureSession` exists per dashboard. It moves `Idle -> Dragging` on
//! `begin` and back to `Idle` on `end`, whatever the outcome of the drop.
//! `begin` copies the template out of the store, so edits or deletes that land
//! mid-drag never change what gets committed. Only the latest pointer position
//! is kept.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::error::ErrorCode;
use crate::geometry::Point;
use crate::model::{QuickAddTemplate, TemplateId};
use crate::templates::TemplateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
}

/// Session protocol violations. Never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    #[error("cannot {op} while {phase:?}")]
    InvalidState { op: &'static str, phase: GesturePhase },
    #[error("unknown template: {0}")]
    UnknownTemplate(TemplateId),
}

impl ErrorCode for GestureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "E_INVALID_STATE",
            Self::UnknownTemplate(_) => "E_UNKNOWN_TEMPLATE",
        }
    }

    fn user_visible(&self) -> bool {
        false
    }
}

/// What a finished drag hands downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct DragRelease {
    /// The template as it was when the drag began.
    pub template: QuickAddTemplate,
    /// Last reported pointer position; `None` if the pointer never moved.
    pub point: Option<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureSession {
    /// No drag in progress.
    #[default]
    Idle,
    /// A template card is being dragged.
    Dragging {
        /// Immutable copy of the dragged template.
        template: QuickAddTemplate,
        /// Most recent absolute pointer position.
        last: Option<Point>,
    },
}

impl GestureSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> GesturePhase {
        match self {
            Self::Idle => GesturePhase::Idle,
            Self::Dragging { .. } => GesturePhase::Dragging,
        }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.phase() == GesturePhase::Dragging
    }

    /// The template being dragged, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&QuickAddTemplate> {
        match self {
            Self::Idle => None,
            Self::Dragging { template, .. } => Some(template),
        }
    }

    /// Start dragging `template_id`, snapshotting it from `store`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a drag is already in progress, `UnknownTemplate` if
    /// the store has no such template. The session is unchanged on error.
    pub fn begin(&mut self, template_id: &TemplateId, store: &TemplateStore) -> Result<(), GestureError> {
        if self.is_dragging() {
            return Err(GestureError::InvalidState { op: "begin", phase: GesturePhase::Dragging });
        }
        let template = store
            .get(template_id)
            .cloned()
            .ok_or_else(|| GestureError::UnknownTemplate(template_id.clone()))?;
        *self = Self::Dragging { template, last: None };
        Ok(())
    }

    /// Record the latest pointer position. Returns whether it was recorded.
    ///
    /// No-op while idle or for non-finite coordinates.
    pub fn update_position(&mut self, point: Point) -> bool {
        match self {
            Self::Dragging { last, .. } if point.is_finite() => {
                *last = Some(point);
                true
            }
            _ => false,
        }
    }

    /// Finish the drag and return to idle.
    ///
    /// # Errors
    ///
    /// `InvalidState` if no drag is in progress.
    pub fn end(&mut self) -> Result<DragRelease, GestureError> {
        match std::mem::take(self) {
            Self::Dragging { template, last } => Ok(DragRelease { template, point: last }),
            Self::Idle => Err(GestureError::InvalidState { op: "end", phase: GesturePhase::Idle }),
        }
    }
}
