//! 2D vector type.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A two-component f32 vector.
///
/// The shadow subsystem mainly uses this as a (min, max) depth-range pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Vector2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vector2 {
    /// All components zero.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Build a vector from components.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Build a vector from an `[x, y]` array.
    #[inline]
    pub const fn from_array(a: [f32; 2]) -> Self {
        Self::new(a[0], a[1])
    }

    /// The components as an `[x, y]` array.
    #[inline]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }

    /// Whether every component is within `epsilon` of the other vector's.
    #[inline]
    pub fn approx_eq(&self, rhs: &Vector2, epsilon: f32) -> bool {
        (self.x - rhs.x).abs() < epsilon && (self.y - rhs.y).abs() < epsilon
    }
}

impl From<[f32; 2]> for Vector2 {
    fn from(a: [f32; 2]) -> Self {
        Self::from_array(a)
    }
}

impl From<Vector2> for [f32; 2] {
    fn from(v: Vector2) -> Self {
        v.to_array()
    }
}

impl From<glam::Vec2> for Vector2 {
    fn from(v: glam::Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Vector2> for glam::Vec2 {
    fn from(v: Vector2) -> Self {
        glam::Vec2::new(v.x, v.y)
    }
}
