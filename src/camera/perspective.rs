//! Perspective camera.

use super::Camera;
use crate::core::Id;
use crate::math::{Matrix4, Vector3};

/// A perspective projection camera, the usual viewer for cascaded shadows.
pub struct PerspectiveCamera {
    id: Id,
    /// Vertical field of view, in degrees.
    pub fov: f32,
    /// Viewport aspect ratio (width over height).
    pub aspect: f32,
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

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl PerspectiveCamera {
    /// Build a camera and compute its initial matrices.
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            id: Id::new(),
            fov,
            aspect,
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

    /// The camera's unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Move the eye.
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.needs_update = true;
    }

    /// Aim at a target point.
    pub fn look_at(&mut self, target: Vector3) {
        self.target = target;
        self.needs_update = true;
    }

    /// Change the viewport aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.needs_update = true;
    }

    /// Change both clip planes.
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.needs_update = true;
    }

    /// The world-to-camera transform.
    pub fn view_matrix(&mut self) -> &Matrix4 {
        if self.needs_update {
            self.update_matrices();
        }
        &self.view_matrix
    }
}

impl Camera for PerspectiveCamera {
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
        self.projection_matrix =
            Matrix4::perspective(self.fov.to_radians(), self.aspect, self.near, self.far);
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
