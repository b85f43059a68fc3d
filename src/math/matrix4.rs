//! 4x4 matrix type.

use super::Vector3;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A column-major 4x4 f32 matrix for view, projection, and light-space
/// transforms.
///
/// Projections target the wgpu/Vulkan convention: NDC depth runs from 0 at
/// the near plane to 1 at the far plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix4 {
    /// Elements in column-major order: `elements[col * 4 + row]`.
    pub elements: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Create from column-major array.
    #[inline]
    pub const fn from_cols_array(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    /// Create a translation matrix.
    pub fn from_translation(v: &Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.elements[12] = v.x;
        m.elements[13] = v.y;
        m.elements[14] = v.z;
        m
    }

    /// Build a right-handed view matrix for an eye looking at a target.
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Self {
        let forward = (*target - *eye).normalized();
        let right = forward.cross(up).normalized();
        let true_up = right.cross(&forward);

        // The basis is orthonormal, so the rotation inverts by transposition
        // and the translation is the negated eye projected onto each axis.
        Self {
            elements: [
                right.x, true_up.x, -forward.x, 0.0,
                right.y, true_up.y, -forward.y, 0.0,
                right.z, true_up.z, -forward.z, 0.0,
                -right.dot(eye), -true_up.dot(eye), forward.dot(eye), 1.0,
            ],
        }
    }

    /// Build a perspective projection with a 0-1 depth range.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();

        Self {
            elements: [
                f / aspect, 0.0, 0.0, 0.0,
                0.0, f, 0.0, 0.0,
                0.0, 0.0, far / (near - far), -1.0,
                0.0, 0.0, (near * far) / (near - far), 0.0,
            ],
        }
    }

    /// Build an orthographic projection with a 0-1 depth range.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let w = 1.0 / (right - left);
        let h = 1.0 / (top - bottom);
        let d = 1.0 / (far - near);

        Self {
            elements: [
                2.0 * w, 0.0, 0.0, 0.0,
                0.0, 2.0 * h, 0.0, 0.0,
                0.0, 0.0, -d, 0.0,
                -(right + left) * w, -(top + bottom) * h, -near * d, 1.0,
            ],
        }
    }

    /// Multiply this matrix by another (`self * other`).
    pub fn multiply(&self, other: &Matrix4) -> Self {
        let a = &self.elements;
        let b = &other.elements;
        let mut out = [0.0f32; 16];

        for c in 0..4 {
            for r in 0..4 {
                out[c * 4 + r] = a[r] * b[c * 4]
                    + a[4 + r] * b[c * 4 + 1]
                    + a[8 + r] * b[c * 4 + 2]
                    + a[12 + r] * b[c * 4 + 3];
            }
        }

        Self { elements: out }
    }

    /// Pre-multiply this matrix by another (`other * self`).
    #[inline]
    pub fn premultiply(&self, other: &Matrix4) -> Self {
        other.multiply(self)
    }

    /// Return the inverse of this matrix.
    /// A singular matrix inverts to identity.
    pub fn inverse(&self) -> Self {
        let m = glam::Mat4::from_cols_array(&self.elements);
        if m.determinant() == 0.0 {
            return Self::IDENTITY;
        }
        m.inverse().into()
    }

    /// Return the transpose of this matrix.
    pub fn transposed(&self) -> Self {
        let e = &self.elements;
        let mut out = [0.0f32; 16];
        for c in 0..4 {
            for r in 0..4 {
                out[r * 4 + c] = e[c * 4 + r];
            }
        }
        Self { elements: out }
    }

    /// Transform a point, applying the perspective divide.
    pub fn transform_point(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        let x = e[0] * v.x + e[4] * v.y + e[8] * v.z + e[12];
        let y = e[1] * v.x + e[5] * v.y + e[9] * v.z + e[13];
        let z = e[2] * v.x + e[6] * v.y + e[10] * v.z + e[14];
        let w = e[3] * v.x + e[7] * v.y + e[11] * v.z + e[15];
        Vector3::new(x, y, z) * (1.0 / w)
    }

    /// Transform a direction, ignoring translation.
    pub fn transform_direction(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        Vector3::new(
            e[0] * v.x + e[4] * v.y + e[8] * v.z,
            e[1] * v.x + e[5] * v.y + e[9] * v.z,
            e[2] * v.x + e[6] * v.y + e[10] * v.z,
        )
    }

    /// Check if approximately equal to another matrix.
    pub fn approx_eq(&self, other: &Matrix4, epsilon: f32) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() < epsilon)
    }

    /// Convert to column-major 2D array (for GPU uniform buffers).
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        let e = &self.elements;
        [
            [e[0], e[1], e[2], e[3]],
            [e[4], e[5], e[6], e[7]],
            [e[8], e[9], e[10], e[11]],
            [e[12], e[13], e[14], e[15]],
        ]
    }
}

impl std::ops::Mul for Matrix4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

impl std::ops::Mul<Vector3> for Matrix4 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.transform_point(&rhs)
    }
}

impl From<glam::Mat4> for Matrix4 {
    fn from(m: glam::Mat4) -> Self {
        Self {
            elements: m.to_cols_array(),
        }
    }
}

impl From<Matrix4> for glam::Mat4 {
    fn from(m: Matrix4) -> Self {
        glam::Mat4::from_cols_array(&m.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_roundtrip() {
        let m = Matrix4::look_at(
            &Vector3::new(3.0, 4.0, 5.0),
            &Vector3::ZERO,
            &Vector3::UP,
        );
        let product = m.multiply(&m.inverse());
        assert!(product.approx_eq(&Matrix4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_look_at_maps_target_to_negative_z() {
        let eye = Vector3::new(0.0, 0.0, 10.0);
        let target = Vector3::ZERO;
        let view = Matrix4::look_at(&eye, &target, &Vector3::UP);
        let p = view.transform_point(&target);
        assert!(p.approx_eq(&Vector3::new(0.0, 0.0, -10.0), 1e-5));
    }

    #[test]
    fn test_orthographic_unprojects_corners() {
        let proj = Matrix4::orthographic(-2.0, 2.0, -1.0, 1.0, 0.0, 10.0);
        let inv = proj.inverse();
        // wgpu NDC near plane sits at z = 0.
        let corner = inv.transform_point(&Vector3::new(1.0, 1.0, 0.0));
        assert!(corner.approx_eq(&Vector3::new(2.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_perspective_divide() {
        let proj = Matrix4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        let inv = proj.inverse();
        // Far-plane corner of a 90 degree frustum lands at |x| == |z|.
        let corner = inv.transform_point(&Vector3::new(1.0, 1.0, 1.0));
        assert!((corner.x.abs() - corner.z.abs()).abs() < 1e-2);
    }
}
