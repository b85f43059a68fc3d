//! Axis-aligned bounding box.

use super::Vector3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box defined by its minimum and maximum corners.
///
/// Starts inverted (min = +inf, max = -inf) so any expansion produces a
/// valid box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    /// Smallest corner.
    pub min: Vector3,
    /// Largest corner.
    pub max: Vector3,
}

impl Default for Box3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Box3 {
    /// The inverted box containing nothing.
    pub const EMPTY: Self = Self {
        min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Build a box from explicit corners.
    #[inline]
    pub const fn new(min: Vector3, max: Vector3) -> Self {
        Self { min, max }
    }

    /// The tightest box around a set of points.
    pub fn from_points(points: &[Vector3]) -> Self {
        points.iter().fold(Self::EMPTY, |mut b, p| {
            b.expand_by_point(p);
            b
        })
    }

    /// Reset to the inverted empty state.
    #[inline]
    pub fn make_empty(&mut self) -> &mut Self {
        *self = Self::EMPTY;
        self
    }

    /// Whether the box contains nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Midpoint of the box, or the origin when empty.
    #[inline]
    pub fn center(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Edge lengths of the box, or zero when empty.
    #[inline]
    pub fn size(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Grow the box to contain a point.
    #[inline]
    pub fn expand_by_point(&mut self, point: &Vector3) -> &mut Self {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self
    }
}
