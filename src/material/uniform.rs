//! Editable uniform values.

use crate::math::{Matrix4, Vector2, Vector3};
use std::cell::RefCell;
use std::rc::Rc;

/// A uniform value a material exposes to its shading program.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// A single float.
    Float(f32),
    /// A signed integer.
    Int(i32),
    /// A 2-component vector.
    Vec2(Vector2),
    /// A 3-component vector.
    Vec3(Vector3),
    /// An array of 2-component vectors.
    Vec2Array(Vec<Vector2>),
    /// A 4x4 matrix.
    Mat4(Matrix4),
}

impl UniformValue {
    /// Read as a float, if this is one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Read as a vec2 array, if this is one.
    pub fn as_vec2_array(&self) -> Option<&[Vector2]> {
        match self {
            Self::Vec2Array(v) => Some(v),
            _ => None,
        }
    }
}

/// A shared, editable uniform cell.
///
/// Programs resolved from a material alias the same cells the material owns,
/// so writing a cell updates every program it was injected into without
/// recompilation.
pub type UniformRef = Rc<RefCell<UniformValue>>;

/// Create a new uniform cell.
pub fn uniform_ref(value: UniformValue) -> UniformRef {
    Rc::new(RefCell::new(value))
}
