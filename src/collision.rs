#[cfg(test)]
#[path = "collision_test.rs"]
mod collision_test;

use crate::geometry::{DropZoneGeometry, Point};

/// Outcome of testing a release point against the drop zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Hit,
    Miss,
}

impl Collision {
    #[must_use]
    pub fn is_hit(self) -> bool {
        self == Self::Hit
    }
}

/// Test `point` against the latest known drop-zone rectangle.
///
/// Bounds are inclusive. With no geometry every point misses.
#[must_use]
pub fn resolve(point: Point, geometry: Option<&DropZoneGeometry>) -> Collision {
    match geometry {
        Some(g) if g.rect.contains(point) => Collision::Hit,
        _ => Collision::Miss,
    }
}
