//! The set of directional lights backing the cascades.

use super::settings::ShadowQualitySettings;
use crate::light::DirectionalLight;
use crate::math::{Color, Vector3};

/// Owns one directional light per cascade.
///
/// All lights share one logical direction; light 0 is the structural template
/// the others are cloned from when the set grows. Shadow projection bounds
/// stay per-light.
pub struct CascadeLights {
    lights: Vec<DirectionalLight>,
    direction: Vector3,
}

impl CascadeLights {
    /// Create `count` lights sharing a direction and quality settings.
    pub fn new(count: usize, direction: Vector3, quality: &ShadowQualitySettings) -> Self {
        let mut main = DirectionalLight::new(Color::WHITE, quality.intensity);
        quality.apply_to(&mut main);

        let mut set = Self {
            lights: vec![main],
            direction: direction.normalized(),
        };
        set.set_count(count);
        set
    }

    /// Number of owned lights.
    #[inline]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether the set is empty (only after disposal).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// The owned lights, cascade-ordered.
    #[inline]
    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    /// Mutable access to the owned lights.
    #[inline]
    pub fn lights_mut(&mut self) -> &mut [DirectionalLight] {
        &mut self.lights
    }

    /// The shared light direction (normalized).
    #[inline]
    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    /// Set the shared light direction.
    pub fn set_direction(&mut self, direction: Vector3) {
        self.direction = direction.normalized();
    }

    /// Grow or shrink the set to `count` lights.
    ///
    /// Growing clones light 0 (shadow quality included, maps excluded);
    /// shrinking disposes the removed tail lights and leaves the survivors
    /// untouched.
    pub fn set_count(&mut self, count: usize) {
        debug_assert!(count >= 1);
        if count == self.lights.len() {
            return;
        }

        log::debug!("resizing cascade light set {} -> {}", self.lights.len(), count);
        while self.lights.len() < count {
            let clone = self.lights[0].clone_from_template();
            self.lights.push(clone);
        }
        for mut light in self.lights.drain(count..) {
            light.dispose();
        }
    }

    /// Broadcast quality settings to every owned light.
    pub fn apply_quality(&mut self, quality: &ShadowQualitySettings) {
        for light in &mut self.lights {
            quality.apply_to(light);
        }
    }

    /// Dispose every light and empty the set.
    pub fn dispose(&mut self) {
        for mut light in self.lights.drain(..) {
            light.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(map_size: u32) -> ShadowQualitySettings {
        ShadowQualitySettings {
            map_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_grow_clones_template_quality() {
        let mut set = CascadeLights::new(1, Vector3::new(1.0, -1.0, 1.0), &quality(1024));
        set.set_count(4);

        assert_eq!(set.len(), 4);
        for light in set.lights() {
            assert_eq!(light.shadow.map_size, 1024);
            assert_eq!(light.shadow.bias, set.lights()[0].shadow.bias);
        }
        // Clones are distinct objects.
        let ids: Vec<_> = set.lights().iter().map(|l| l.id()).collect();
        for (i, id) in ids.iter().enumerate() {
            assert!(!ids[i + 1..].contains(id));
        }
    }

    #[test]
    fn test_shrink_keeps_leading_lights() {
        let mut set = CascadeLights::new(4, Vector3::new(0.0, -1.0, 0.0), &quality(2048));
        let kept: Vec<_> = set.lights()[..2].iter().map(|l| l.id()).collect();

        set.set_count(2);
        assert_eq!(set.len(), 2);
        let after: Vec<_> = set.lights().iter().map(|l| l.id()).collect();
        assert_eq!(kept, after);
    }

    #[test]
    fn test_set_count_same_is_noop() {
        let mut set = CascadeLights::new(3, Vector3::new(0.0, -1.0, 0.0), &quality(2048));
        let ids: Vec<_> = set.lights().iter().map(|l| l.id()).collect();
        set.set_count(3);
        let after: Vec<_> = set.lights().iter().map(|l| l.id()).collect();
        assert_eq!(ids, after);
    }

    #[test]
    fn test_direction_is_normalized() {
        let set = CascadeLights::new(1, Vector3::new(0.0, -2.0, 0.0), &quality(512));
        assert!(set.direction().approx_eq(&Vector3::new(0.0, -1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_quality_broadcast() {
        let mut set = CascadeLights::new(3, Vector3::new(1.0, -1.0, 0.0), &quality(2048));
        let mut updated = quality(512);
        updated.bias = 0.01;
        set.apply_quality(&updated);
        for light in set.lights() {
            assert_eq!(light.shadow.map_size, 512);
            assert_eq!(light.shadow.bias, 0.01);
        }
    }
}
