//! Math types for the shadow subsystem.
//!
//! A small three.js-flavored kernel: vectors, a column-major 4x4 matrix, an
//! AABB, and an RGB color, with `glam` interop through `From` conversions.

mod box3;
mod color;
mod matrix4;
mod vector2;
mod vector3;

pub use box3::Box3;
pub use color::Color;
pub use matrix4::Matrix4;
pub use vector2::Vector2;
pub use vector3::Vector3;

/// Linear interpolation between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
