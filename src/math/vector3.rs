//! 3D vector type.

use super::Matrix4;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// A three-component f32 vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// All components zero.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// The +x axis.
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    /// The +y axis.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    /// The +z axis.
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);
    /// World up (+y).
    pub const UP: Self = Self::UNIT_Y;

    /// Build a vector from components.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Build a vector from an `[x, y, z]` array.
    #[inline]
    pub const fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// The components as an `[x, y, z]` array.
    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean length.
    #[inline]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Squared euclidean length.
    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    /// Scale to unit length in place. A zero vector is left unchanged.
    pub fn normalize(&mut self) -> &mut Self {
        let len = self.length();
        if len > 0.0 {
            *self *= 1.0 / len;
        }
        self
    }

    /// A unit-length copy of this vector.
    #[inline]
    pub fn normalized(&self) -> Self {
        let mut out = *self;
        out.normalize();
        out
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, rhs: &Vector3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(&self, rhs: &Vector3) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Distance to another point.
    #[inline]
    pub fn distance_to(&self, rhs: &Vector3) -> f32 {
        (*self - *rhs).length()
    }

    /// Interpolate toward `rhs` by `t` (0 returns self, 1 returns `rhs`).
    #[inline]
    pub fn lerp(&self, rhs: &Vector3, t: f32) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
            self.z + (rhs.z - self.z) * t,
        )
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(&self, rhs: &Vector3) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(&self, rhs: &Vector3) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    /// Transform as a point through a matrix, with perspective divide.
    #[inline]
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        m.transform_point(self)
    }

    /// Whether every component is within `epsilon` of the other vector's.
    #[inline]
    pub fn approx_eq(&self, rhs: &Vector3, epsilon: f32) -> bool {
        (self.x - rhs.x).abs() < epsilon
            && (self.y - rhs.y).abs() < epsilon
            && (self.z - rhs.z).abs() < epsilon
    }
}

impl Add for Vector3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl MulAssign<f32> for Vector3 {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl Div<f32> for Vector3 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f32) -> Self {
        self * (1.0 / rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(a: [f32; 3]) -> Self {
        Self::from_array(a)
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

impl From<glam::Vec3> for Vector3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for glam::Vec3 {
    fn from(v: Vector3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_right_hand_rule() {
        let z = Vector3::UNIT_X.cross(&Vector3::UNIT_Y);
        assert!(z.approx_eq(&Vector3::UNIT_Z, 1e-6));
    }

    #[test]
    fn test_lerp_endpoints_are_exact() {
        let a = Vector3::new(-1.0, 2.0, 7.5);
        let b = Vector3::new(3.0, -4.0, 0.5);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert!(a.lerp(&b, 0.5).approx_eq(&Vector3::new(1.0, -1.0, 4.0), 1e-6));
    }

    #[test]
    fn test_normalize_handles_zero() {
        assert_eq!(Vector3::ZERO.normalized(), Vector3::ZERO);
        let v = Vector3::new(0.0, 3.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
    }
}
