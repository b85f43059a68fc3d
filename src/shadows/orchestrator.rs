//! Cascade orchestration.
//!
//! [`Csm`] owns the cascade configuration, the per-cascade light set, and the
//! shader patcher, and drives the per-frame pipeline: split depths → frustum
//! subdivision → shadow bounds → texel-snapped light placement → uniform
//! pushes.

use super::frustum::CsmFrustum;
use super::lights::CascadeLights;
use super::patcher::{CascadeFrame, ShaderPatcher};
use super::settings::ShadowQualitySettings;
use super::split::{compute_splits, SplitFunction, SplitMode};
use super::MAX_CASCADES;
use crate::camera::Camera;
use crate::light::DirectionalLight;
use crate::material::ShaderMaterial;
use crate::math::{Box3, Matrix4, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Smallest allowed camera near distance; the logarithmic split scheme is
/// undefined at zero.
const NEAR_EPSILON: f32 = 1e-4;

/// Coefficient of the fade radius inflation. An empirical tuning default,
/// not a contract; widens later cascades to hide the blend seam.
const FADE_MARGIN_FACTOR: f32 = 0.25;

/// Errors raised by invalid cascade configuration.
#[derive(Error, Debug)]
pub enum CsmError {
    /// Cascade count below one.
    #[error("cascade count must be at least 1, got {0}")]
    InvalidCascadeCount(usize),

    /// Cascade count above the configured maximum.
    #[error("cascade count {count} exceeds maximum {max}")]
    CascadeCountExceedsMax {
        /// Requested count.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Zero shadow map resolution.
    #[error("shadow map resolution must be positive")]
    InvalidMapResolution,

    /// Non-positive or non-finite far distance.
    #[error("far distance must be positive, got {0}")]
    InvalidFarDistance(f32),

    /// Split blend outside [0, 1].
    #[error("split blend must lie in [0, 1], got {0}")]
    InvalidSplitBlend(f32),

    /// Negative margin.
    #[error("margin must be non-negative, got {0}")]
    InvalidMargin(f32),

    /// Custom split mode selected without a split function.
    #[error("custom split mode requires a split function")]
    MissingCustomSplits,
}

/// Cascade configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CsmOptions {
    /// Number of cascades.
    pub cascade_count: usize,
    /// Upper bound on the cascade count; preallocated storage is sized to
    /// this so later count changes never reallocate.
    pub max_cascade_count: usize,
    /// Shadow map resolution (width == height).
    pub map_resolution: u32,
    /// Maximum shadowed distance; the effective far plane is the smaller of
    /// this and the camera's far plane.
    pub far_distance: f32,
    /// Split scheme.
    pub split_mode: SplitMode,
    /// Uniform/logarithmic blend for [`SplitMode::Practical`].
    pub split_blend: f32,
    /// Extra light-space depth padding so tall casters in front of a cascade
    /// still land in its map.
    pub margin: f32,
    /// Cross-fade between adjacent cascades at their seams.
    pub fade: bool,
    /// Let the last cascade extend to infinity instead of cutting off at its
    /// split depth.
    pub disable_last_cascade_cutoff: bool,
    /// Shared light direction.
    pub light_direction: Vector3,
    /// Split function for [`SplitMode::Custom`].
    #[serde(skip)]
    pub custom_splits: Option<SplitFunction>,
}

impl Default for CsmOptions {
    fn default() -> Self {
        Self {
            cascade_count: 3,
            max_cascade_count: MAX_CASCADES,
            map_resolution: 2048,
            far_distance: 1000.0,
            split_mode: SplitMode::Practical,
            split_blend: 0.5,
            margin: 200.0,
            fade: false,
            disable_last_cascade_cutoff: false,
            light_direction: Vector3::new(1.0, -1.0, 1.0),
            custom_splits: None,
        }
    }
}

impl CsmOptions {
    /// Reject invalid option combinations.
    pub fn validate(&self) -> Result<(), CsmError> {
        if self.cascade_count < 1 {
            return Err(CsmError::InvalidCascadeCount(self.cascade_count));
        }
        if self.cascade_count > self.max_cascade_count {
            return Err(CsmError::CascadeCountExceedsMax {
                count: self.cascade_count,
                max: self.max_cascade_count,
            });
        }
        if self.map_resolution == 0 {
            return Err(CsmError::InvalidMapResolution);
        }
        if !(self.far_distance > 0.0 && self.far_distance.is_finite()) {
            return Err(CsmError::InvalidFarDistance(self.far_distance));
        }
        if !(0.0..=1.0).contains(&self.split_blend) {
            return Err(CsmError::InvalidSplitBlend(self.split_blend));
        }
        if !(self.margin >= 0.0) {
            return Err(CsmError::InvalidMargin(self.margin));
        }
        if self.split_mode == SplitMode::Custom && self.custom_splits.is_none() {
            return Err(CsmError::MissingCustomSplits);
        }
        Ok(())
    }
}

/// Cascaded shadow orchestrator.
///
/// Call [`Csm::update`] once per frame after the camera's transform is
/// current. Scratch geometry is reused across frames and cascades, so a
/// `Csm` must not be driven from more than one thread.
pub struct Csm {
    cascade_count: usize,
    max_cascade_count: usize,
    far_distance: f32,
    split_mode: SplitMode,
    split_blend: f32,
    margin: f32,
    fade: bool,
    disable_last_cascade_cutoff: bool,
    custom_splits: Option<SplitFunction>,

    quality: ShadowQualitySettings,
    lights: CascadeLights,
    patcher: ShaderPatcher,

    /// Normalized split depths, ascending, last == 1.
    breaks: Vec<f32>,
    /// Per-cascade (min, max) depth ranges derived from the breaks.
    ranges: Vec<Vector2>,
    main_frustum: CsmFrustum,
    frusta: Vec<CsmFrustum>,

    camera_near: f32,
    camera_far: f32,
    needs_update_frusta: bool,

    // Scratch reused across cascades within a frame.
    scratch_frustum: CsmFrustum,
    scratch_bounds: Box3,
}

impl Csm {
    /// Create an orchestrator for a camera.
    ///
    /// The camera is only borrowed to seed the initial state; pass the same
    /// camera to [`Csm::update`] each frame.
    pub fn new(camera: &mut dyn Camera, options: CsmOptions) -> Result<Self, CsmError> {
        options.validate()?;
        camera.update_matrices();

        let quality = ShadowQualitySettings {
            map_size: options.map_resolution,
            ..Default::default()
        };
        let lights = CascadeLights::new(options.cascade_count, options.light_direction, &quality);

        let mut csm = Self {
            cascade_count: options.cascade_count,
            max_cascade_count: options.max_cascade_count,
            far_distance: options.far_distance,
            split_mode: options.split_mode,
            split_blend: options.split_blend,
            margin: options.margin,
            fade: options.fade,
            disable_last_cascade_cutoff: options.disable_last_cascade_cutoff,
            custom_splits: options.custom_splits,
            quality,
            lights,
            patcher: ShaderPatcher::new(),
            breaks: Vec::with_capacity(options.max_cascade_count),
            ranges: Vec::with_capacity(options.max_cascade_count),
            main_frustum: CsmFrustum::new(),
            frusta: Vec::with_capacity(options.max_cascade_count),
            camera_near: camera.near().max(NEAR_EPSILON),
            camera_far: camera.far(),
            needs_update_frusta: true,
            scratch_frustum: CsmFrustum::new(),
            scratch_bounds: Box3::EMPTY,
        };
        // Seed split depths so materials set up before the first frame see
        // real cascade ranges.
        csm.recompute_splits();
        Ok(csm)
    }

    /// Per-frame tick: recompute frusta if stale, then stabilize light
    /// placement and push uniforms into patched materials.
    pub fn update(&mut self, camera: &mut dyn Camera) {
        camera.update_matrices();

        let near = camera.near().max(NEAR_EPSILON);
        let far = camera.far();
        if near != self.camera_near || far != self.camera_far {
            self.camera_near = near;
            self.camera_far = far;
            self.needs_update_frusta = true;
        }

        if self.needs_update_frusta {
            self.update_frusta(camera);
            self.needs_update_frusta = false;
        }

        let camera_world = *camera.world_matrix();
        self.stabilize(&camera_world);

        let frame = CascadeFrame {
            cascade_count: self.cascade_count,
            fade: self.fade,
            ranges: &self.ranges,
            camera_near: self.camera_near,
            shadow_far: self.camera_far.min(self.far_distance),
        };
        self.patcher.update(&frame);
    }

    /// Make a material cascade-aware. Idempotent.
    pub fn setup_material(&mut self, material: &Rc<RefCell<ShaderMaterial>>) {
        let frame = CascadeFrame {
            cascade_count: self.cascade_count,
            fade: self.fade,
            ranges: &self.ranges,
            camera_near: self.camera_near,
            shadow_far: self.camera_far.min(self.far_distance),
        };
        self.patcher.setup(material, &frame);
    }

    /// Remove cascade support from a material.
    pub fn rollback_material(&mut self, material: &Rc<RefCell<ShaderMaterial>>) {
        self.patcher.rollback(material);
    }

    /// Tear down: roll back every patched material and dispose all lights.
    pub fn dispose(mut self) {
        self.patcher.dispose();
        self.lights.dispose();
    }

    // --- configuration ---------------------------------------------------

    /// Active cascade count.
    pub fn cascade_count(&self) -> usize {
        self.cascade_count
    }

    /// Change the cascade count, resizing the light set.
    pub fn set_cascade_count(&mut self, count: usize) -> Result<(), CsmError> {
        if count < 1 {
            return Err(CsmError::InvalidCascadeCount(count));
        }
        if count > self.max_cascade_count {
            return Err(CsmError::CascadeCountExceedsMax {
                count,
                max: self.max_cascade_count,
            });
        }
        if count != self.cascade_count {
            self.cascade_count = count;
            self.lights.set_count(count);
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Maximum shadowed distance.
    pub fn far_distance(&self) -> f32 {
        self.far_distance
    }

    /// Change the maximum shadowed distance.
    pub fn set_far_distance(&mut self, far_distance: f32) -> Result<(), CsmError> {
        if !(far_distance > 0.0 && far_distance.is_finite()) {
            return Err(CsmError::InvalidFarDistance(far_distance));
        }
        if far_distance != self.far_distance {
            self.far_distance = far_distance;
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Active split scheme.
    pub fn split_mode(&self) -> SplitMode {
        self.split_mode
    }

    /// Change the split scheme.
    pub fn set_split_mode(&mut self, mode: SplitMode) -> Result<(), CsmError> {
        if mode == SplitMode::Custom && self.custom_splits.is_none() {
            return Err(CsmError::MissingCustomSplits);
        }
        if mode != self.split_mode {
            self.split_mode = mode;
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Install a custom split function.
    pub fn set_custom_splits(&mut self, splits: SplitFunction) {
        self.custom_splits = Some(splits);
        if self.split_mode == SplitMode::Custom {
            self.needs_update_frusta = true;
        }
    }

    /// Uniform/logarithmic blend factor.
    pub fn split_blend(&self) -> f32 {
        self.split_blend
    }

    /// Change the blend factor.
    pub fn set_split_blend(&mut self, blend: f32) -> Result<(), CsmError> {
        if !(0.0..=1.0).contains(&blend) {
            return Err(CsmError::InvalidSplitBlend(blend));
        }
        if blend != self.split_blend {
            self.split_blend = blend;
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Light-space depth padding.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Change the light-space depth padding.
    pub fn set_margin(&mut self, margin: f32) -> Result<(), CsmError> {
        if !(margin >= 0.0) {
            return Err(CsmError::InvalidMargin(margin));
        }
        if margin != self.margin {
            self.margin = margin;
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Whether cascades cross-fade at their seams.
    pub fn fade(&self) -> bool {
        self.fade
    }

    /// Toggle cascade cross-fading. Affects both the generated shader
    /// variant and the cascade bounding radii.
    pub fn set_fade(&mut self, fade: bool) {
        if fade != self.fade {
            self.fade = fade;
            self.needs_update_frusta = true;
        }
    }

    /// The shared light direction.
    pub fn light_direction(&self) -> Vector3 {
        self.lights.direction()
    }

    /// Change the shared light direction. Takes effect on the next update;
    /// the frusta themselves do not depend on it.
    pub fn set_light_direction(&mut self, direction: Vector3) {
        self.lights.set_direction(direction);
    }

    /// Force a frusta recompute on the next update, e.g. after the camera's
    /// projection changed.
    pub fn notify_camera_changed(&mut self) {
        self.needs_update_frusta = true;
    }

    // --- shadow quality proxies ------------------------------------------

    /// Shadow map resolution.
    pub fn map_resolution(&self) -> u32 {
        self.quality.map_size
    }

    /// Change the shadow map resolution on every light.
    pub fn set_map_resolution(&mut self, resolution: u32) -> Result<(), CsmError> {
        if resolution == 0 {
            return Err(CsmError::InvalidMapResolution);
        }
        if resolution != self.quality.map_size {
            self.quality.map_size = resolution;
            self.lights.apply_quality(&self.quality);
            self.needs_update_frusta = true;
        }
        Ok(())
    }

    /// Shadow depth bias.
    pub fn bias(&self) -> f32 {
        self.quality.bias
    }

    /// Change the depth bias on every light.
    pub fn set_bias(&mut self, bias: f32) {
        if bias != self.quality.bias {
            self.quality.bias = bias;
            self.lights.apply_quality(&self.quality);
        }
    }

    /// Shadow normal-offset bias.
    pub fn normal_bias(&self) -> f32 {
        self.quality.normal_bias
    }

    /// Change the normal-offset bias on every light.
    pub fn set_normal_bias(&mut self, normal_bias: f32) {
        if normal_bias != self.quality.normal_bias {
            self.quality.normal_bias = normal_bias;
            self.lights.apply_quality(&self.quality);
        }
    }

    /// Shadow blur radius.
    pub fn blur_radius(&self) -> f32 {
        self.quality.radius
    }

    /// Change the blur radius on every light.
    pub fn set_blur_radius(&mut self, radius: f32) {
        if radius != self.quality.radius {
            self.quality.radius = radius;
            self.lights.apply_quality(&self.quality);
        }
    }

    /// Light intensity.
    pub fn intensity(&self) -> f32 {
        self.quality.intensity
    }

    /// Change the intensity of every light.
    pub fn set_intensity(&mut self, intensity: f32) {
        if intensity != self.quality.intensity {
            self.quality.intensity = intensity;
            self.lights.apply_quality(&self.quality);
        }
    }

    // --- state access -----------------------------------------------------

    /// The owned lights, cascade-ordered.
    pub fn lights(&self) -> &[DirectionalLight] {
        self.lights.lights()
    }

    /// Normalized split depths, ascending, ending at 1.
    pub fn splits(&self) -> &[f32] {
        &self.breaks
    }

    /// Per-cascade normalized (min, max) depth ranges. The last max is
    /// infinite when the cutoff is disabled.
    pub fn cascade_ranges(&self) -> &[Vector2] {
        &self.ranges
    }

    /// Number of materials currently patched.
    pub fn patched_material_count(&self) -> usize {
        self.patcher.registered_count()
    }

    // --- internals --------------------------------------------------------

    /// Recompute normalized split depths and the derived cascade ranges.
    fn recompute_splits(&mut self) {
        let far = self.camera_far.min(self.far_distance);
        compute_splits(
            self.split_mode,
            self.cascade_count,
            self.camera_near,
            far,
            self.split_blend,
            self.custom_splits,
            &mut self.breaks,
        );

        self.ranges.clear();
        let mut previous = 0.0;
        for (i, &depth) in self.breaks.iter().enumerate() {
            let last = i + 1 == self.breaks.len();
            let max_depth = if last && self.disable_last_cascade_cutoff {
                f32::INFINITY
            } else {
                depth
            };
            self.ranges.push(Vector2::new(previous, max_depth));
            previous = depth;
        }
    }

    /// Geometry-change path: splits, frustum subdivision, and per-cascade
    /// projection bounds.
    fn update_frusta(&mut self, camera: &mut dyn Camera) {
        log::trace!(
            "recomputing cascade frusta (count: {}, mode: {:?})",
            self.cascade_count,
            self.split_mode
        );
        self.recompute_splits();

        let far = self.camera_far.min(self.far_distance);
        self.main_frustum.set_from_camera(&*camera, far);
        self.main_frustum.split(&self.breaks, &mut self.frusta);

        assert_eq!(
            self.frusta.len(),
            self.lights.len(),
            "cascade frusta and light set fell out of lockstep"
        );
        self.update_shadow_bounds();
    }

    /// Assign each cascade's orthographic projection from its bounding
    /// diameter.
    fn update_shadow_bounds(&mut self) {
        let fade = self.fade;
        let near = self.camera_near;
        let far = self.camera_far.min(self.far_distance);
        let margin = self.margin;

        for (frustum, light) in self.frusta.iter().zip(self.lights.lights_mut().iter_mut()) {
            let diameter = frustum_diameter(frustum, fade, near, far);
            let radius = diameter * 0.5;
            let camera = &mut light.shadow.camera;
            camera.set_bounds(-radius, radius, radius, -radius, 0.0, diameter + margin);
            camera.update_matrices();
        }
    }

    /// Per-frame stabilization: fit a light-space AABB around each cascade
    /// and snap its center to the shadow texel grid, so sub-texel camera
    /// motion cannot shift the sampling grid relative to the world.
    fn stabilize(&mut self, camera_world: &Matrix4) {
        assert_eq!(
            self.frusta.len(),
            self.lights.len(),
            "cascade frusta and light set fell out of lockstep"
        );

        let direction = self.lights.direction();
        // Guard against a near-vertical direction collapsing the basis.
        let up = if direction.y.abs() > 0.99 {
            Vector3::UNIT_Z
        } else {
            Vector3::UP
        };
        let light_view = Matrix4::look_at(&Vector3::ZERO, &direction, &up);
        let light_to_world = light_view.inverse();
        let camera_to_light = light_view.multiply(camera_world);

        let map_size = self.quality.map_size as f32;
        let margin = self.margin;

        for (frustum, light) in self.frusta.iter().zip(self.lights.lights_mut().iter_mut()) {
            let texel_width = light.shadow.camera.width() / map_size;
            let texel_height = light.shadow.camera.height() / map_size;

            self.scratch_frustum.copy_from(frustum);
            self.scratch_frustum.apply_matrix(&camera_to_light);

            self.scratch_bounds.make_empty();
            for corner in self
                .scratch_frustum
                .near
                .iter()
                .chain(self.scratch_frustum.far.iter())
            {
                self.scratch_bounds.expand_by_point(corner);
            }

            let mut center = self.scratch_bounds.center();
            // Pull the near plane back past the highest caster-facing corner.
            center.z = self.scratch_bounds.max.z + margin;
            center.x = (center.x / texel_width).round() * texel_width;
            center.y = (center.y / texel_height).round() * texel_height;

            let world_center = light_to_world.transform_point(&center);
            light.position = world_center;
            light.target = world_center + direction;
            light.shadow.camera.up = up;
            light.shadow.camera.set_position(world_center);
            light.shadow.camera.look_at(world_center + direction);
            light.shadow.camera.update_matrices();
        }
    }
}

/// Bounding diameter of a cascade frustum: the larger of the far-plane
/// diagonal and the near-to-far cross diagonal, optionally inflated to hide
/// the fade seam.
fn frustum_diameter(frustum: &CsmFrustum, fade: bool, near: f32, far: f32) -> f32 {
    let far_diagonal = frustum.far[0].distance_to(&frustum.far[2]);
    let cross_diagonal = frustum.far[0].distance_to(&frustum.near[2]);
    let mut diameter = far_diagonal.max(cross_diagonal);

    if fade {
        let depth_fraction = frustum.far[0].z.abs() / (far - near);
        diameter += FADE_MARGIN_FACTOR * depth_fraction * depth_fraction * (far - near);
    }
    diameter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::material::ShaderTemplate;
    use crate::shadows::patcher::{
        DEFINE_CSM_CASCADE_COUNT, UNIFORM_CASCADES, UNIFORM_SHADOW_FAR,
    };
    use std::sync::Arc;

    fn scenario_camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 1000.0);
        camera.set_position(Vector3::new(10.0, 5.0, 10.0));
        camera.look_at(Vector3::ZERO);
        camera.update_matrices();
        camera
    }

    fn scenario_options() -> CsmOptions {
        CsmOptions {
            cascade_count: 4,
            map_resolution: 2048,
            far_distance: 500.0,
            split_mode: SplitMode::Practical,
            split_blend: 0.5,
            margin: 100.0,
            ..Default::default()
        }
    }

    fn lit_material() -> Rc<RefCell<ShaderMaterial>> {
        Rc::new(RefCell::new(ShaderMaterial::new(Arc::new(
            ShaderTemplate::lit(),
        ))))
    }

    #[test]
    fn test_option_validation() {
        let mut camera = scenario_camera();

        let bad_count = CsmOptions { cascade_count: 0, ..Default::default() };
        assert!(matches!(
            Csm::new(&mut camera, bad_count),
            Err(CsmError::InvalidCascadeCount(0))
        ));

        let too_many = CsmOptions { cascade_count: 9, ..Default::default() };
        assert!(matches!(
            Csm::new(&mut camera, too_many),
            Err(CsmError::CascadeCountExceedsMax { count: 9, max: 4 })
        ));

        let bad_blend = CsmOptions { split_blend: 1.5, ..Default::default() };
        assert!(matches!(
            Csm::new(&mut camera, bad_blend),
            Err(CsmError::InvalidSplitBlend(_))
        ));

        let bad_resolution = CsmOptions { map_resolution: 0, ..Default::default() };
        assert!(matches!(
            Csm::new(&mut camera, bad_resolution),
            Err(CsmError::InvalidMapResolution)
        ));

        let custom_without_fn = CsmOptions {
            split_mode: SplitMode::Custom,
            ..Default::default()
        };
        assert!(matches!(
            Csm::new(&mut camera, custom_without_fn),
            Err(CsmError::MissingCustomSplits)
        ));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();
        csm.update(&mut camera);

        assert_eq!(csm.lights().len(), 4);
        assert_eq!(csm.cascade_ranges().len(), 4);
        assert_eq!(csm.splits().len(), 4);

        // Ranges tile the depth span with no gaps; the last ends at 1.
        let ranges = csm.cascade_ranges();
        assert_eq!(ranges[0].x, 0.0);
        for i in 0..3 {
            assert_eq!(ranges[i].y, ranges[i + 1].x);
        }
        assert_eq!(ranges[3].y, 1.0);

        // Every light carries a usable texel size.
        for light in csm.lights() {
            let texel = light.shadow.camera.width() / 2048.0;
            assert!(texel > 0.0 && texel.is_finite());
            // Bounds are symmetric and padded by the margin.
            let camera = &light.shadow.camera;
            assert_eq!(camera.right, -camera.left);
            assert!((camera.far - (camera.width() + 100.0)).abs() < 1e-3);
        }

        // Later cascades cover more ground than earlier ones.
        let widths: Vec<f32> = csm.lights().iter().map(|l| l.shadow.camera.width()).collect();
        assert!(widths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_disable_last_cascade_cutoff() {
        let mut camera = scenario_camera();
        let options = CsmOptions {
            disable_last_cascade_cutoff: true,
            ..scenario_options()
        };
        let mut csm = Csm::new(&mut camera, options).unwrap();
        csm.update(&mut camera);

        let ranges = csm.cascade_ranges();
        assert!(ranges[3].y.is_infinite());
        // The split depths themselves still end at 1.
        assert_eq!(*csm.splits().last().unwrap(), 1.0);

        // The uniform write clamps infinity to a finite sentinel.
        let material = lit_material();
        csm.setup_material(&material);
        csm.update(&mut camera);
        let mat = material.borrow();
        let cell = mat.uniform(UNIFORM_CASCADES).unwrap().borrow();
        let last = cell.as_vec2_array().unwrap()[3];
        assert_eq!(last.y, f32::MAX);
    }

    #[test]
    fn test_stabilization_is_deterministic() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();

        csm.update(&mut camera);
        let first: Vec<(Vector3, Vector3)> = csm
            .lights()
            .iter()
            .map(|l| (l.position, l.target))
            .collect();

        csm.update(&mut camera);
        let second: Vec<(Vector3, Vector3)> = csm
            .lights()
            .iter()
            .map(|l| (l.position, l.target))
            .collect();

        // Identical inputs produce bit-identical placements.
        assert_eq!(first, second);

        // Targets sit one direction-unit past the positions.
        let direction = csm.light_direction();
        for (position, target) in &first {
            assert!((*target - *position).approx_eq(&direction, 1e-6));
        }
    }

    #[test]
    fn test_light_positions_sit_on_texel_grid() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();
        csm.update(&mut camera);

        let direction = csm.light_direction();
        let light_view = Matrix4::look_at(&Vector3::ZERO, &direction, &Vector3::UP);

        let check_on_grid = |csm: &Csm| {
            for light in csm.lights() {
                let texel = light.shadow.camera.width() / 2048.0;
                let in_light_space = light_view.transform_point(&light.position);
                let x_cells = in_light_space.x / texel;
                let y_cells = in_light_space.y / texel;
                assert!((x_cells - x_cells.round()).abs() < 5e-2);
                assert!((y_cells - y_cells.round()).abs() < 5e-2);
            }
        };
        check_on_grid(&csm);

        // Still on the same grid after the camera moves.
        camera.set_position(Vector3::new(10.5, 5.0, 10.2));
        camera.update_matrices();
        csm.update(&mut camera);
        check_on_grid(&csm);
    }

    #[test]
    fn test_sub_texel_camera_motion_keeps_lights_pinned() {
        // Axis-aligned setup: the camera translates rigidly along x, so the
        // light-space bounds shift by exactly the camera delta.
        let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 1000.0);
        camera.set_position(Vector3::ZERO);
        camera.look_at(Vector3::new(0.0, 0.0, -1.0));
        camera.update_matrices();

        let options = CsmOptions {
            light_direction: Vector3::new(0.0, 0.0, -1.0),
            ..scenario_options()
        };
        let mut csm = Csm::new(&mut camera, options).unwrap();
        csm.update(&mut camera);

        let before: Vec<Vector3> = csm.lights().iter().map(|l| l.position).collect();
        let texel = csm.lights()[0].shadow.camera.width() / 2048.0;

        // A quarter-texel slide cannot move any snapped center.
        let delta = Vector3::new(texel * 0.25, 0.0, 0.0);
        camera.set_position(delta);
        camera.look_at(delta + Vector3::new(0.0, 0.0, -1.0));
        camera.update_matrices();
        csm.update(&mut camera);

        let after: Vec<Vector3> = csm.lights().iter().map(|l| l.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_cascade_count_change_resizes_and_reconfigures() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();
        let material = lit_material();
        csm.setup_material(&material);
        csm.update(&mut camera);
        material.borrow_mut().clear_needs_update();

        csm.set_cascade_count(2).unwrap();
        assert_eq!(csm.lights().len(), 2);
        csm.update(&mut camera);

        assert_eq!(csm.cascade_ranges().len(), 2);
        let mat = material.borrow();
        assert_eq!(mat.define(DEFINE_CSM_CASCADE_COUNT), Some("2"));
        assert!(mat.needs_update());
        let cell = mat.uniform(UNIFORM_CASCADES).unwrap().borrow();
        assert_eq!(cell.as_vec2_array().unwrap().len(), 2);
    }

    #[test]
    fn test_quality_proxies_broadcast() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();

        csm.set_bias(0.01);
        csm.set_intensity(3.0);
        csm.set_map_resolution(1024).unwrap();

        assert_eq!(csm.bias(), 0.01);
        assert_eq!(csm.map_resolution(), 1024);
        for light in csm.lights() {
            assert_eq!(light.shadow.bias, 0.01);
            assert_eq!(light.intensity, 3.0);
            assert_eq!(light.shadow.map_size, 1024);
        }
    }

    #[test]
    fn test_shadow_far_uniform_tracks_far_override() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();
        let material = lit_material();
        csm.setup_material(&material);
        csm.update(&mut camera);

        let mat = material.borrow();
        let far = mat
            .uniform(UNIFORM_SHADOW_FAR)
            .unwrap()
            .borrow()
            .as_float()
            .unwrap();
        // far_distance (500) undercuts the camera far plane (1000).
        assert_eq!(far, 500.0);
    }

    #[test]
    fn test_dispose_rolls_back_materials() {
        let mut camera = scenario_camera();
        let mut csm = Csm::new(&mut camera, scenario_options()).unwrap();
        let material = lit_material();
        csm.setup_material(&material);
        assert_eq!(csm.patched_material_count(), 1);

        csm.dispose();
        let mat = material.borrow();
        assert_eq!(mat.compile_hook_count(), 0);
        assert!(mat.uniform(UNIFORM_CASCADES).is_none());
    }
}
