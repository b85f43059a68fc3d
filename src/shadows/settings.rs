//! Shadow quality configuration.

use crate::light::DirectionalLight;
use serde::{Deserialize, Serialize};

/// Shadow quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadowQuality {
    /// 512x512 resolution.
    Low,
    /// 1024x1024 resolution.
    Medium,
    /// 2048x2048 resolution (default).
    #[default]
    High,
    /// 4096x4096 resolution.
    Ultra,
}

impl ShadowQuality {
    /// Get the shadow map resolution for this quality level.
    pub fn resolution(&self) -> u32 {
        match self {
            Self::Low => 512,
            Self::Medium => 1024,
            Self::High => 2048,
            Self::Ultra => 4096,
        }
    }
}

/// Per-light shadow quality parameters shared by every cascade light.
///
/// This struct is the single source of truth: writes are broadcast to all
/// owned lights, never read back from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowQualitySettings {
    /// Shadow map resolution (width == height).
    pub map_size: u32,
    /// Depth bias.
    pub bias: f32,
    /// Normal-offset bias.
    pub normal_bias: f32,
    /// Blur radius in texels.
    pub radius: f32,
    /// Light intensity.
    pub intensity: f32,
}

impl Default for ShadowQualitySettings {
    fn default() -> Self {
        Self {
            map_size: ShadowQuality::High.resolution(),
            bias: 0.005,
            normal_bias: 0.02,
            radius: 1.0,
            intensity: 1.0,
        }
    }
}

impl ShadowQualitySettings {
    /// Settings for a quality preset.
    pub fn with_quality(quality: ShadowQuality) -> Self {
        Self {
            map_size: quality.resolution(),
            ..Self::default()
        }
    }

    /// Copy these settings onto a light.
    pub fn apply_to(&self, light: &mut DirectionalLight) {
        light.intensity = self.intensity;
        light.shadow.map_size = self.map_size;
        light.shadow.bias = self.bias;
        light.shadow.normal_bias = self.normal_bias;
        light.shadow.radius = self.radius;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_resolutions() {
        assert_eq!(ShadowQuality::Low.resolution(), 512);
        assert_eq!(ShadowQuality::Ultra.resolution(), 4096);
        assert_eq!(
            ShadowQualitySettings::with_quality(ShadowQuality::Medium).map_size,
            1024
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let settings = ShadowQualitySettings {
            map_size: 1024,
            bias: 0.001,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: ShadowQualitySettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
