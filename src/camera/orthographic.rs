//! Orthographic camera.

use super::Camera;
use crate::core::Id;
use crate::math::{Matrix4, Vector3};

/// An orthographic projection camera.
///
/// Also serves as the shadow projection camera on directional lights, where
/// the bounds are driven by the cascade solver.
pub struct OrthographicCamera {
    id: Id,
    /// Left frustum plane.
    pub left: f32,
    /// Right frustum plane.
    pub right: f32,
    /// Top frustum plane.
    pub top: f32,
    /// Bottom frustum plane.
    pub bottom: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// Eye position.
    pub position: Vector3,
    /// Point the camera looks at.
    pub target: Vector3,
    /// Up reference for the view basis.
    pub up: Vector3,
    view_matrix: Matrix4,
    world_matrix: Matrix4,
    projection_matrix: Matrix4,
    projection_matrix_inverse: Matrix4,
    needs_update: bool,
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        Self::new(-1.0, 1.0, 1.0, -1.0, 0.0, 100.0)
    }
}

impl OrthographicCamera {
    /// Create a new orthographic camera.
    pub fn new(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            id: Id::new(),
            left,
            right,
            top,
            bottom,
            near,
            far,
            position: Vector3::new(0.0, 0.0, 5.0),
            target: Vector3::ZERO,
            up: Vector3::UP,
            view_matrix: Matrix4::IDENTITY,
            world_matrix: Matrix4::IDENTITY,
            projection_matrix: Matrix4::IDENTITY,
            projection_matrix_inverse: Matrix4::IDENTITY,
            needs_update: true,
        };
        camera.update_matrices();
        camera
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Set all six frustum bounds at once.
    pub fn set_bounds(&mut self, left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) {
        self.left = left;
        self.right = right;
        self.top = top;
        self.bottom = bottom;
        self.near = near;
        self.far = far;
        self.needs_update = true;
    }

    /// Set the camera position.
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.needs_update = true;
    }

    /// Look at a target from the current position.
    pub fn look_at(&mut self, target: Vector3) {
        self.target = target;
        self.needs_update = true;
    }

    /// Frustum width.
    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Frustum height.
    #[inline]
    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// Get the view matrix.
    pub fn view_matrix(&mut self) -> &Matrix4 {
        if self.needs_update {
            self.update_matrices();
        }
        &self.view_matrix
    }
}

impl Camera for OrthographicCamera {
    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }

    fn update_matrices(&mut self) {
        if !self.needs_update {
            return;
        }
        self.view_matrix = Matrix4::look_at(&self.position, &self.target, &self.up);
        self.world_matrix = self.view_matrix.inverse();
        self.projection_matrix = Matrix4::orthographic(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        );
        self.projection_matrix_inverse = self.projection_matrix.inverse();
        self.needs_update = false;
    }

    fn projection_matrix(&self) -> &Matrix4 {
        &self.projection_matrix
    }

    fn projection_matrix_inverse(&self) -> &Matrix4 {
        &self.projection_matrix_inverse
    }

    fn world_matrix(&self) -> &Matrix4 {
        &self.world_matrix
    }
}

impl Clone for OrthographicCamera {
    /// Clones the camera parameters under a fresh ID.
    fn clone(&self) -> Self {
        let mut camera = Self::new(
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.near,
            self.far,
        );
        camera.position = self.position;
        camera.target = self.target;
        camera.up = self.up;
        camera.needs_update = true;
        camera.update_matrices();
        camera
    }
}
