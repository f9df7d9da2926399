//! Drop-zone measurement cache.
//!
//! The host calls [`DropZoneTracker::remeasure`] whenever the drop target's
//! layout may have changed (mount, resize, scroll, rotation). The tracker asks
//! the host's [`LayoutProbe`] for the absolute bounding box and keeps the last
//! good answer. Nothing is measured during a drag; a release is resolved
//! against whatever was last measured, so geometry can lag a layout change
//! that has not yet been reported. The age of the measurement is logged at
//! resolve time.

#[cfg(test)]
#[path = "dropzone_test.rs"]
mod dropzone_test;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::ErrorCode;
use crate::geometry::{DropZoneGeometry, Rect};

/// Host callback returning the drop target's absolute bounding box.
///
/// `None` means the target is not mounted.
pub trait LayoutProbe: Send + Sync {
    fn measure(&self) -> Option<Rect>;
}

impl<F> LayoutProbe for F
where
    F: Fn() -> Option<Rect> + Send + Sync,
{
    fn measure(&self) -> Option<Rect> {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MeasureError {
    #[error("drop target is not mounted")]
    NotMounted,
    #[error("drop target has non-finite bounds")]
    NonFinite,
    #[error("drop target has empty size {width}x{height}")]
    Empty { width: f64, height: f64 },
}

impl ErrorCode for MeasureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotMounted => "E_MEASURE_NOT_MOUNTED",
            Self::NonFinite => "E_MEASURE_NON_FINITE",
            Self::Empty { .. } => "E_MEASURE_EMPTY",
        }
    }

    fn user_visible(&self) -> bool {
        false
    }
}

pub struct DropZoneTracker {
    probe: Box<dyn LayoutProbe>,
    clock: Arc<dyn Clock>,
    current: Option<DropZoneGeometry>,
}

impl DropZoneTracker {
    #[must_use]
    pub fn new(probe: Box<dyn LayoutProbe>, clock: Arc<dyn Clock>) -> Self {
        Self { probe, clock, current: None }
    }

    /// Measure the drop target and replace the cached geometry.
    ///
    /// On failure the previous geometry is kept.
    ///
    /// # Errors
    ///
    /// Returns a `MeasureError` when the probe has no usable box.
    pub fn remeasure(&mut self) -> Result<DropZoneGeometry, MeasureError> {
        match self.probe.measure().ok_or(MeasureError::NotMounted).and_then(validate) {
            Ok(rect) => {
                let geometry = DropZoneGeometry { rect, measured_at: self.clock.now() };
                debug!(
                    x = rect.x,
                    y = rect.y,
                    width = rect.width,
                    height = rect.height,
                    "drop zone measured"
                );
                self.current = Some(geometry);
                Ok(geometry)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), kept_previous = self.current.is_some(), "drop zone measurement failed");
                Err(e)
            }
        }
    }

    /// The latest successful measurement, if any.
    #[must_use]
    pub fn current_geometry(&self) -> Option<&DropZoneGeometry> {
        self.current.as_ref()
    }

    /// Milliseconds since the latest successful measurement.
    #[must_use]
    pub fn age_ms(&self) -> Option<i64> {
        self.current
            .map(|g| (self.clock.now() - g.measured_at).num_milliseconds())
    }
}

fn validate(rect: Rect) -> Result<Rect, MeasureError> {
    let finite = rect.x.is_finite() && rect.y.is_finite() && rect.width.is_finite() && rect.height.is_finite();
    if !finite {
        return Err(MeasureError::NonFinite);
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(MeasureError::Empty { width: rect.width, height: rect.height });
    }
    Ok(rect)
}
