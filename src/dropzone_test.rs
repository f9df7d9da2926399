#![allow(clippy::float_cmp)]

use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Utc};

use super::*;
use crate::clock::FixedClock;

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock {
        now: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        today: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
    })
}

/// A probe whose answer the test can change between measurements.
fn scripted(initial: Option<Rect>) -> (Arc<Mutex<Option<Rect>>>, Box<dyn LayoutProbe>) {
    let cell = Arc::new(Mutex::new(initial));
    let reader = Arc::clone(&cell);
    let probe: Box<dyn LayoutProbe> = Box::new(move || *reader.lock().unwrap());
    (cell, probe)
}

#[test]
fn never_measured_has_no_geometry() {
    let (_, probe) = scripted(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    let tracker = DropZoneTracker::new(probe, clock());
    assert!(tracker.current_geometry().is_none());
    assert!(tracker.age_ms().is_none());
}

#[test]
fn remeasure_caches_rect_and_timestamp() {
    let (_, probe) = scripted(Some(Rect::new(16.0, 300.0, 360.0, 140.0)));
    let mut tracker = DropZoneTracker::new(probe, clock());
    let g = tracker.remeasure().unwrap();
    assert_eq!(g.rect, Rect::new(16.0, 300.0, 360.0, 140.0));
    assert_eq!(g.measured_at, Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap());
    assert_eq!(tracker.current_geometry(), Some(&g));
    assert_eq!(tracker.age_ms(), Some(0));
}

#[test]
fn remeasure_replaces_previous_geometry() {
    let (cell, probe) = scripted(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    let mut tracker = DropZoneTracker::new(probe, clock());
    tracker.remeasure().unwrap();
    *cell.lock().unwrap() = Some(Rect::new(0.0, 500.0, 100.0, 100.0));
    tracker.remeasure().unwrap();
    assert_eq!(tracker.current_geometry().unwrap().rect.y, 500.0);
}

#[test]
fn unmounted_target_keeps_previous_geometry() {
    let (cell, probe) = scripted(Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
    let mut tracker = DropZoneTracker::new(probe, clock());
    tracker.remeasure().unwrap();
    *cell.lock().unwrap() = None;
    assert_eq!(tracker.remeasure(), Err(MeasureError::NotMounted));
    assert_eq!(tracker.current_geometry().unwrap().rect, Rect::new(0.0, 0.0, 100.0, 100.0));
}

#[test]
fn first_measurement_failure_leaves_none() {
    let (_, probe) = scripted(None);
    let mut tracker = DropZoneTracker::new(probe, clock());
    assert!(tracker.remeasure().is_err());
    assert!(tracker.current_geometry().is_none());
}

#[test]
fn empty_and_non_finite_boxes_are_rejected() {
    let (cell, probe) = scripted(Some(Rect::new(0.0, 0.0, 0.0, 50.0)));
    let mut tracker = DropZoneTracker::new(probe, clock());
    assert!(matches!(tracker.remeasure(), Err(MeasureError::Empty { .. })));

    *cell.lock().unwrap() = Some(Rect::new(f64::NAN, 0.0, 10.0, 10.0));
    assert_eq!(tracker.remeasure(), Err(MeasureError::NonFinite));
    assert!(tracker.current_geometry().is_none());
}

#[test]
fn measure_errors_are_not_user_visible() {
    assert!(!MeasureError::NotMounted.user_visible());
    assert_eq!(MeasureError::NotMounted.error_code(), "E_MEASURE_NOT_MOUNTED");
}
