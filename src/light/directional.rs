//! Directional light (sun-like parallel rays).

use super::ShadowMap;
use crate::camera::OrthographicCamera;
use crate::core::Id;
use crate::math::{Color, Vector3};

/// Shadow state owned by a directional light.
///
/// The orthographic camera defines the light-space projection bounds; the
/// cascade solver rewrites them whenever the frusta change.
pub struct DirectionalShadow {
    /// Shadow projection camera.
    pub camera: OrthographicCamera,
    /// Shadow map resolution (width == height).
    pub map_size: u32,
    /// Depth bias to prevent shadow acne.
    pub bias: f32,
    /// Normal-offset bias.
    pub normal_bias: f32,
    /// Blur radius in texels.
    pub radius: f32,
    /// Host-allocated shadow map, if any.
    pub map: Option<ShadowMap>,
}

impl Default for DirectionalShadow {
    fn default() -> Self {
        Self {
            camera: OrthographicCamera::new(-5.0, 5.0, 5.0, -5.0, 0.0, 500.0),
            map_size: 2048,
            bias: 0.005,
            normal_bias: 0.02,
            radius: 1.0,
            map: None,
        }
    }
}

impl DirectionalShadow {
    /// Copy the quality parameters (not the map) into a new shadow.
    pub fn clone_without_map(&self) -> Self {
        Self {
            camera: self.camera.clone(),
            map_size: self.map_size,
            bias: self.bias,
            normal_bias: self.normal_bias,
            radius: self.radius,
            map: None,
        }
    }

    /// Release the shadow map.
    pub fn dispose(&mut self) {
        self.map = None;
    }
}

/// Directional light emitting parallel rays (like the sun).
pub struct DirectionalLight {
    /// Unique ID.
    id: Id,
    /// Light color.
    pub color: Color,
    /// Light intensity.
    pub intensity: f32,
    /// Light position.
    pub position: Vector3,
    /// Point the light looks at.
    pub target: Vector3,
    /// Whether this light casts shadows.
    pub cast_shadow: bool,
    /// Shadow state.
    pub shadow: DirectionalShadow,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Color::WHITE, 1.0)
    }
}

impl DirectionalLight {
    /// Create a new directional light.
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            id: Id::new(),
            color,
            intensity,
            position: Vector3::new(0.0, 10.0, 0.0),
            target: Vector3::ZERO,
            cast_shadow: true,
            shadow: DirectionalShadow::default(),
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The direction the light shines in.
    #[inline]
    pub fn direction(&self) -> Vector3 {
        (self.target - self.position).normalized()
    }

    /// Clone this light as a structural template: same color, intensity, and
    /// shadow quality parameters, but a fresh ID and no shadow map.
    pub fn clone_from_template(&self) -> Self {
        Self {
            id: Id::new(),
            color: self.color,
            intensity: self.intensity,
            position: self.position,
            target: self.target,
            cast_shadow: self.cast_shadow,
            shadow: self.shadow.clone_without_map(),
        }
    }

    /// Release owned shadow resources.
    pub fn dispose(&mut self) {
        self.shadow.dispose();
    }
}
