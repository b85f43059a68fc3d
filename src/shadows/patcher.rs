//! Cascade-aware patching of externally-owned shader materials.
//!
//! Materials are never authored with cascade support; the patcher installs
//! it at runtime through the material's compile-interceptor list, and can
//! always take it back out. Generated program text is cached per structural
//! program identity so materials sharing a template share one generated
//! variant.

use crate::core::Id;
use crate::material::{
    uniform_ref, HookToken, ProgramParameters, ShaderMaterial, TemplateKey, UniformRef,
    UniformValue,
};
use crate::math::Vector2;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

/// Define marking a material as cascade-aware.
pub const DEFINE_CSM_ENABLED: &str = "CSM_ENABLED";
/// Define carrying the active cascade count.
pub const DEFINE_CSM_CASCADE_COUNT: &str = "CSM_CASCADE_COUNT";
/// Define present when cascade cross-fading is enabled.
pub const DEFINE_CSM_FADE: &str = "CSM_FADE";

/// Injected uniform: per-cascade normalized depth ranges.
pub const UNIFORM_CASCADES: &str = "csm_cascades";
/// Injected uniform: owning camera's near distance.
pub const UNIFORM_CAMERA_NEAR: &str = "csm_camera_near";
/// Injected uniform: effective shadow far distance.
pub const UNIFORM_SHADOW_FAR: &str = "csm_shadow_far";

/// Module-scope substitution point for cascade uniform declarations.
const BINDINGS_ANCHOR: &str = "// @csm_bindings";
/// Fragment-scope substitution point for the directional shadow lookup.
const SHADOW_ANCHOR: &str = "// @directional_shadow";

/// Per-frame cascade state pushed into patched materials.
pub struct CascadeFrame<'a> {
    /// Active cascade count.
    pub cascade_count: usize,
    /// Whether cascades cross-fade at their seams.
    pub fade: bool,
    /// Normalized (min, max) depth range per cascade.
    pub ranges: &'a [Vector2],
    /// Owning camera's near distance.
    pub camera_near: f32,
    /// Effective shadow far distance.
    pub shadow_far: f32,
}

/// Structural identity of a generated program variant.
///
/// The generated text depends only on the base template and the two static
/// defines, so entries never need invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProgramKey {
    template: TemplateKey,
    cascade_count: usize,
    fade: bool,
}

/// Cache of generated program text, keyed by structural program identity.
#[derive(Default)]
struct ShaderSourceCache {
    entries: HashMap<ProgramKey, String>,
}

/// Registry record for a patched material.
struct PatchedMaterial {
    material: Rc<RefCell<ShaderMaterial>>,
    token: HookToken,
    cascades: UniformRef,
    camera_near: UniformRef,
    shadow_far: UniformRef,
}

/// Installs, updates, and rolls back cascade support on shader materials.
#[derive(Default)]
pub struct ShaderPatcher {
    registry: HashMap<Id, PatchedMaterial>,
    cache: Rc<RefCell<ShaderSourceCache>>,
}

impl ShaderPatcher {
    /// Create an empty patcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently patched materials.
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of generated program variants in the cache.
    pub fn cached_variant_count(&self) -> usize {
        self.cache.borrow().entries.len()
    }

    /// Make a material cascade-aware. Idempotent: a material already set up
    /// is returned to untouched.
    ///
    /// Installs the static defines, the three injected uniform cells, and a
    /// compile interceptor appended after any hooks the material already
    /// carries, so pre-existing custom logic keeps running.
    pub fn setup(&mut self, material: &Rc<RefCell<ShaderMaterial>>, frame: &CascadeFrame) {
        let id = material.borrow().id();
        if self.registry.contains_key(&id) {
            return;
        }

        let cascades = uniform_ref(UniformValue::Vec2Array(
            frame.ranges.iter().map(clamp_range).collect(),
        ));
        let camera_near = uniform_ref(UniformValue::Float(frame.camera_near));
        let shadow_far = uniform_ref(UniformValue::Float(frame.shadow_far));

        let mut mat = material.borrow_mut();
        mat.set_define(DEFINE_CSM_ENABLED, "1");
        mat.set_define(DEFINE_CSM_CASCADE_COUNT, frame.cascade_count.to_string());
        if frame.fade {
            mat.set_define(DEFINE_CSM_FADE, "1");
        }
        mat.insert_uniform(UNIFORM_CASCADES, Rc::clone(&cascades));
        mat.insert_uniform(UNIFORM_CAMERA_NEAR, Rc::clone(&camera_near));
        mat.insert_uniform(UNIFORM_SHADOW_FAR, Rc::clone(&shadow_far));

        let cache = Rc::clone(&self.cache);
        let injected = [
            (UNIFORM_CASCADES, Rc::clone(&cascades)),
            (UNIFORM_CAMERA_NEAR, Rc::clone(&camera_near)),
            (UNIFORM_SHADOW_FAR, Rc::clone(&shadow_far)),
        ];
        let token = mat.add_compile_hook(Rc::new(move |params| {
            for (name, cell) in &injected {
                params
                    .uniforms
                    .entry((*name).to_string())
                    .or_insert_with(|| Rc::clone(cell));
            }
            patch_source(&cache, params);
        }));
        mat.mark_needs_update();
        drop(mat);

        self.registry.insert(
            id,
            PatchedMaterial {
                material: Rc::clone(material),
                token,
                cascades,
                camera_near,
                shadow_far,
            },
        );
    }

    /// Push current cascade state into every patched material.
    ///
    /// Static define changes (cascade count, fade) mark the program dirty for
    /// a one-time recompile; the uniform writes happen every frame and never
    /// trigger recompilation.
    pub fn update(&mut self, frame: &CascadeFrame) {
        for entry in self.registry.values() {
            let mut mat = entry.material.borrow_mut();

            let count = mat
                .define(DEFINE_CSM_CASCADE_COUNT)
                .and_then(|v| v.parse::<usize>().ok());
            if count != Some(frame.cascade_count) {
                mat.set_define(DEFINE_CSM_CASCADE_COUNT, frame.cascade_count.to_string());
                mat.mark_needs_update();
            }
            if mat.has_define(DEFINE_CSM_FADE) != frame.fade {
                if frame.fade {
                    mat.set_define(DEFINE_CSM_FADE, "1");
                } else {
                    mat.remove_define(DEFINE_CSM_FADE);
                }
                mat.mark_needs_update();
            }
            drop(mat);

            if let UniformValue::Vec2Array(values) = &mut *entry.cascades.borrow_mut() {
                values.clear();
                values.extend(frame.ranges.iter().map(clamp_range));
            }
            *entry.camera_near.borrow_mut() = UniformValue::Float(frame.camera_near);
            *entry.shadow_far.borrow_mut() = UniformValue::Float(frame.shadow_far);
        }
    }

    /// Remove every trace of cascade support from a material: injected
    /// uniforms, defines, and the compile interceptor (hooks installed by
    /// others stay in place). No-op for materials that were never set up.
    pub fn rollback(&mut self, material: &Rc<RefCell<ShaderMaterial>>) {
        let id = material.borrow().id();
        let Some(entry) = self.registry.remove(&id) else {
            return;
        };

        let mut mat = material.borrow_mut();
        mat.remove_uniform(UNIFORM_CASCADES);
        mat.remove_uniform(UNIFORM_CAMERA_NEAR);
        mat.remove_uniform(UNIFORM_SHADOW_FAR);
        mat.remove_compile_hook(entry.token);
        mat.remove_define(DEFINE_CSM_ENABLED);
        mat.remove_define(DEFINE_CSM_CASCADE_COUNT);
        mat.remove_define(DEFINE_CSM_FADE);
        mat.mark_needs_update();
    }

    /// Roll back every patched material and clear the generated-text cache.
    pub fn dispose(&mut self) {
        let materials: Vec<_> = self
            .registry
            .values()
            .map(|entry| Rc::clone(&entry.material))
            .collect();
        for material in materials {
            self.rollback(&material);
        }
        self.cache.borrow_mut().entries.clear();
    }
}

/// Clamp an unbounded cascade range to a finite sentinel; shading languages
/// have no infinity literal, so the uniform carries `f32::MAX` instead.
fn clamp_range(range: &Vector2) -> Vector2 {
    Vector2::new(range.x, range.y.min(f32::MAX))
}

/// Rewrite a resolved program with the cascade variant for its defines,
/// generating and caching it on first sight.
fn patch_source(cache: &Rc<RefCell<ShaderSourceCache>>, params: &mut ProgramParameters) {
    let cascade_count = params
        .defines
        .get(DEFINE_CSM_CASCADE_COUNT)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);
    let fade = params.defines.contains_key(DEFINE_CSM_FADE);

    let key = ProgramKey {
        template: params.template_key,
        cascade_count,
        fade,
    };

    let mut cache = cache.borrow_mut();
    if let Some(patched) = cache.entries.get(&key) {
        params.source.clone_from(patched);
        return;
    }

    log::debug!(
        "generating cascade shader variant (cascades: {}, fade: {})",
        cascade_count,
        fade
    );
    let patched = inject_cascades(&params.source, cascade_count, fade);
    params.source.clone_from(&patched);
    cache.entries.insert(key, patched);
}

/// Substitute both anchors of a template with cascade-aware code.
///
/// A template without the anchors is left unchanged; it cannot receive
/// cascaded shadows.
fn inject_cascades(source: &str, cascade_count: usize, fade: bool) -> String {
    let Some(with_bindings) =
        replace_anchor_line(source, BINDINGS_ANCHOR, &bindings_chunk(cascade_count))
    else {
        log::warn!("shader template has no cascade binding anchor; skipping patch");
        return source.to_string();
    };
    match replace_anchor_line(
        &with_bindings,
        SHADOW_ANCHOR,
        &selection_chunk(cascade_count, fade),
    ) {
        Some(patched) => patched,
        None => {
            log::warn!("shader template has no directional shadow anchor; skipping patch");
            source.to_string()
        }
    }
}

/// Replace the whole line containing `anchor` with `replacement`.
fn replace_anchor_line(source: &str, anchor: &str, replacement: &str) -> Option<String> {
    let at = source.find(anchor)?;
    let line_start = source[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = source[at..]
        .find('\n')
        .map(|i| at + i)
        .unwrap_or(source.len());

    let mut out = String::with_capacity(source.len() + replacement.len());
    out.push_str(&source[..line_start]);
    out.push_str(replacement);
    out.push_str(&source[line_end..]);
    Some(out)
}

/// Module-scope declarations for the cascade uniform block.
fn bindings_chunk(cascade_count: usize) -> String {
    format!(
        "struct CsmUniform {{\n    \
             cascades: array<vec4<f32>, {cascade_count}>,\n    \
             camera_near: f32,\n    \
             shadow_far: f32,\n    \
             _pad0: f32,\n    \
             _pad1: f32,\n\
         }};\n\
         @group(2) @binding(4) var<uniform> csm: CsmUniform;"
    )
}

/// Fragment-scope cascade selection and sampling, unrolled per cascade.
fn selection_chunk(cascade_count: usize, fade: bool) -> String {
    let mut chunk = String::new();
    chunk.push_str(
        "    let csm_depth = in.view_depth / (csm.shadow_far - csm.camera_near);\n    \
         var csm_shadow = 1.0;\n",
    );

    for i in 0..cascade_count {
        let last = i + 1 == cascade_count;
        if fade {
            let upper = if last {
                String::from("true")
            } else {
                format!("csm_depth < csm_hi_{i}")
            };
            let _ = write!(
                chunk,
                "    let csm_range_{i} = csm.cascades[{i}].xy;\n    \
                 let csm_edge_{i} = select(csm_range_{i}.y, csm_range_{i}.x, \
                     csm_depth < (csm_range_{i}.x + csm_range_{i}.y) * 0.5);\n    \
                 let csm_margin_{i} = max(0.25 * csm_edge_{i} * csm_edge_{i}, 1e-4);\n    \
                 let csm_lo_{i} = csm_range_{i}.x - csm_margin_{i} * 0.5;\n    \
                 let csm_hi_{i} = csm_range_{i}.y + csm_margin_{i} * 0.5;\n    \
                 if (csm_depth >= csm_lo_{i} && ({upper})) {{\n        \
                     let csm_sample_{i} = sample_shadow_map({i}, in.world_position);\n        \
                     let csm_ratio_{i} = clamp(\
                         min(csm_depth - csm_lo_{i}, csm_hi_{i} - csm_depth) / csm_margin_{i}, \
                         0.0, 1.0);\n        \
                     csm_shadow = min(csm_shadow, mix(1.0, csm_sample_{i}, csm_ratio_{i}));\n    \
                 }}\n"
            );
        } else {
            let upper = if last {
                String::from("true")
            } else {
                format!("csm_depth < csm.cascades[{i}].y")
            };
            let _ = write!(
                chunk,
                "    if (csm_depth >= csm.cascades[{i}].x && ({upper})) {{\n        \
                     csm_shadow = sample_shadow_map({i}, in.world_position);\n    \
                 }}\n"
            );
        }
    }

    chunk.push_str("    shadow = csm_shadow;");
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{CompileHook, ShaderTemplate};
    use std::sync::Arc;

    fn lit_material() -> Rc<RefCell<ShaderMaterial>> {
        Rc::new(RefCell::new(ShaderMaterial::new(Arc::new(
            ShaderTemplate::lit(),
        ))))
    }

    fn frame(ranges: &[Vector2], count: usize, fade: bool) -> CascadeFrame<'_> {
        CascadeFrame {
            cascade_count: count,
            fade,
            ranges,
            camera_near: 0.1,
            shadow_far: 500.0,
        }
    }

    fn two_ranges() -> Vec<Vector2> {
        vec![Vector2::new(0.0, 0.5), Vector2::new(0.5, 1.0)]
    }

    #[test]
    fn test_setup_is_idempotent() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, false));
        patcher.setup(&material, &frame(&ranges, 2, false));

        assert_eq!(patcher.registered_count(), 1);
        assert_eq!(material.borrow().compile_hook_count(), 1);
    }

    #[test]
    fn test_setup_wraps_existing_hook_and_rollback_restores_it() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        let prior: CompileHook = Rc::new(|p| {
            p.defines.insert("CUSTOM".into(), "1".into());
        });
        material.borrow_mut().add_compile_hook(Rc::clone(&prior));

        patcher.setup(&material, &frame(&ranges, 2, false));
        assert_eq!(material.borrow().compile_hook_count(), 2);

        // The pre-existing hook still runs under the patch.
        let params = material.borrow().resolve_program();
        assert!(params.defines.contains_key("CUSTOM"));

        patcher.rollback(&material);
        let mat = material.borrow();
        assert_eq!(mat.compile_hook_count(), 1);
        assert!(Rc::ptr_eq(mat.compile_hooks().next().unwrap(), &prior));
    }

    #[test]
    fn test_rollback_removes_all_traces() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, true));
        patcher.rollback(&material);

        let mat = material.borrow();
        assert!(!mat.has_define(DEFINE_CSM_ENABLED));
        assert!(!mat.has_define(DEFINE_CSM_CASCADE_COUNT));
        assert!(!mat.has_define(DEFINE_CSM_FADE));
        assert!(mat.uniform(UNIFORM_CASCADES).is_none());
        assert_eq!(mat.compile_hook_count(), 0);
        assert!(mat.needs_update());
        assert_eq!(patcher.registered_count(), 0);
        drop(mat);

        // Rolling back an unregistered material is a no-op.
        patcher.rollback(&material);
    }

    #[test]
    fn test_patched_program_source() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, false));
        let params = material.borrow().resolve_program();

        assert!(!params.source.contains(BINDINGS_ANCHOR));
        assert!(!params.source.contains(SHADOW_ANCHOR));
        assert!(params.source.contains("array<vec4<f32>, 2>"));
        assert!(params.source.contains("sample_shadow_map(1, in.world_position)"));
        assert!(params.uniforms.contains_key(UNIFORM_CASCADES));
    }

    #[test]
    fn test_fade_variant_blends() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, true));
        let params = material.borrow().resolve_program();
        assert!(params.source.contains("csm_margin_0"));
        assert!(params.source.contains("mix(1.0, csm_sample_1"));
    }

    #[test]
    fn test_cache_shared_across_materials() {
        let mut patcher = ShaderPatcher::new();
        let template = Arc::new(ShaderTemplate::lit());
        let a = Rc::new(RefCell::new(ShaderMaterial::new(Arc::clone(&template))));
        let b = Rc::new(RefCell::new(ShaderMaterial::new(Arc::clone(&template))));
        let ranges = two_ranges();

        patcher.setup(&a, &frame(&ranges, 2, false));
        patcher.setup(&b, &frame(&ranges, 2, false));

        let source_a = a.borrow().resolve_program().source;
        let source_b = b.borrow().resolve_program().source;
        assert_eq!(source_a, source_b);
        assert_eq!(patcher.cached_variant_count(), 1);

        // A different static configuration is a different variant.
        patcher.update(&frame(&ranges, 3, false));
        let _ = a.borrow().resolve_program();
        assert_eq!(patcher.cached_variant_count(), 2);
    }

    #[test]
    fn test_update_reconciles_defines_and_pushes_uniforms() {
        let mut patcher = ShaderPatcher::new();
        let material = lit_material();
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, false));
        material.borrow_mut().clear_needs_update();

        // Same configuration: uniforms move, no recompile.
        let moved = vec![Vector2::new(0.0, 0.6), Vector2::new(0.6, 1.0)];
        patcher.update(&frame(&moved, 2, false));
        {
            let mat = material.borrow();
            assert!(!mat.needs_update());
            let cell = mat.uniform(UNIFORM_CASCADES).unwrap().borrow();
            assert_eq!(cell.as_vec2_array().unwrap()[0].y, 0.6);
        }

        // Fade flip: defines change and the program goes dirty.
        patcher.update(&frame(&moved, 2, true));
        let mat = material.borrow();
        assert!(mat.has_define(DEFINE_CSM_FADE));
        assert!(mat.needs_update());
    }

    #[test]
    fn test_dispose_rolls_back_everything() {
        let mut patcher = ShaderPatcher::new();
        let a = lit_material();
        let b = lit_material();
        let ranges = two_ranges();

        patcher.setup(&a, &frame(&ranges, 2, false));
        patcher.setup(&b, &frame(&ranges, 2, false));
        let _ = a.borrow().resolve_program();
        assert_eq!(patcher.cached_variant_count(), 1);

        patcher.dispose();
        assert_eq!(patcher.registered_count(), 0);
        assert_eq!(patcher.cached_variant_count(), 0);
        assert!(!a.borrow().has_define(DEFINE_CSM_ENABLED));
        assert_eq!(b.borrow().compile_hook_count(), 0);
    }

    #[test]
    fn test_template_without_anchor_is_left_unchanged() {
        let mut patcher = ShaderPatcher::new();
        let material = Rc::new(RefCell::new(ShaderMaterial::new(Arc::new(
            ShaderTemplate::new("bare", "@fragment fn fs_main() {}"),
        ))));
        let ranges = two_ranges();

        patcher.setup(&material, &frame(&ranges, 2, false));
        let params = material.borrow().resolve_program();
        assert_eq!(params.source, "@fragment fn fs_main() {}");
    }
}
