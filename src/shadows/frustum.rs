//! Frustum corner geometry for cascade computation.

use crate::camera::Camera;
use crate::math::{Matrix4, Vector3};

/// The eight corners of a camera frustum, four per plane.
///
/// Corner order is clockwise starting top-right, identical on both planes:
///
/// ```text
/// 3 --- 0
/// |     |
/// 2 --- 1
/// ```
///
/// The order is load-bearing: splitting, transforming, and bounds code index
/// corners pairwise across copies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CsmFrustum {
    /// Near-plane corners.
    pub near: [Vector3; 4],
    /// Far-plane corners.
    pub far: [Vector3; 4],
}

/// NDC x/y signs in corner order (clockwise from top-right).
const CORNER_SIGNS: [(f32, f32); 4] = [(1.0, 1.0), (1.0, -1.0), (-1.0, -1.0), (-1.0, 1.0)];

impl CsmFrustum {
    /// Create a frustum with all corners at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the corners of another frustum.
    pub fn copy_from(&mut self, other: &CsmFrustum) {
        *self = *other;
    }

    /// Compute the corners from a camera's cached projection matrices,
    /// limiting the far plane to `max_far`.
    pub fn set_from_camera(&mut self, camera: &dyn Camera, max_far: f32) {
        let projection = *camera.projection_matrix();
        let inverse = *camera.projection_matrix_inverse();
        self.set_from_projection(&projection, &inverse, max_far);
    }

    /// Compute the corners in camera-local (view) space by un-projecting the
    /// NDC cube through the inverse projection, limiting the far plane to
    /// `max_far`.
    ///
    /// wgpu NDC places the near plane at z = 0 and the far plane at z = 1.
    /// Orthographic projections (detected from the projection matrix) clamp
    /// only the z component, keeping corners axis-parallel; perspective
    /// projections scale the whole corner vector so it stays on its view ray.
    pub fn set_from_projection(&mut self, projection: &Matrix4, inverse: &Matrix4, max_far: f32) {
        // A perspective projection writes -1 into the w row of the z column.
        let is_orthographic = projection.elements[11] == 0.0;

        for (i, (x, y)) in CORNER_SIGNS.iter().enumerate() {
            self.near[i] = inverse.transform_point(&Vector3::new(*x, *y, 0.0));

            let mut corner = inverse.transform_point(&Vector3::new(*x, *y, 1.0));
            let abs_z = corner.z.abs();
            if is_orthographic {
                corner.z *= (max_far / abs_z).min(1.0);
            } else {
                corner *= (max_far / abs_z).min(1.0);
            }
            self.far[i] = corner;
        }
    }

    /// Split into sub-frusta at the given ascending normalized depths.
    ///
    /// Sub-frustum `k` spans `depths[k-1]..depths[k]` (with an implicit
    /// leading 0). Boundary corners are computed once per depth, so adjacent
    /// sub-frusta share bit-identical corners, and the outermost planes are
    /// copied rather than interpolated: the union reproduces this frustum
    /// exactly.
    pub fn split(&self, depths: &[f32], target: &mut Vec<CsmFrustum>) {
        target.resize(depths.len(), CsmFrustum::default());

        for (k, frustum) in target.iter_mut().enumerate() {
            if k == 0 {
                frustum.near = self.near;
            } else {
                let t = depths[k - 1];
                for j in 0..4 {
                    frustum.near[j] = self.near[j].lerp(&self.far[j], t);
                }
            }

            if k == depths.len() - 1 {
                frustum.far = self.far;
            } else {
                let t = depths[k];
                for j in 0..4 {
                    frustum.far[j] = self.near[j].lerp(&self.far[j], t);
                }
            }
        }
    }

    /// Transform all eight corners in place.
    pub fn apply_matrix(&mut self, m: &Matrix4) {
        for corner in self.near.iter_mut().chain(self.far.iter_mut()) {
            *corner = m.transform_point(corner);
        }
    }
}
