//! Camera module for view and projection.

mod orthographic;
mod perspective;

pub use orthographic::OrthographicCamera;
pub use perspective::PerspectiveCamera;

use crate::math::Matrix4;

/// The camera surface consumed by the shadow subsystem.
///
/// Matrices are cached and recomputed lazily; call [`Camera::update_matrices`]
/// after mutating the camera and before reading any matrix.
pub trait Camera {
    /// Near clipping plane distance.
    fn near(&self) -> f32;

    /// Far clipping plane distance.
    fn far(&self) -> f32;

    /// Recompute cached matrices if any camera parameter changed.
    fn update_matrices(&mut self);

    /// The projection matrix.
    fn projection_matrix(&self) -> &Matrix4;

    /// The inverse of the projection matrix.
    fn projection_matrix_inverse(&self) -> &Matrix4;

    /// The camera-to-world transform (inverse of the view matrix).
    fn world_matrix(&self) -> &Matrix4;
}
