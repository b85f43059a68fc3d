//! Shader material with defines, uniforms, and compile interceptors.

use super::template::{ShaderTemplate, TemplateKey};
use super::uniform::{UniformRef, UniformValue};
use crate::core::Id;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

/// The fully-resolved parameters a renderer compiles a program from.
///
/// Uniform entries are shared cells: writing a cell through the material (or
/// through whoever injected it) is visible to every resolved program without
/// recompilation.
pub struct ProgramParameters {
    /// Identity of the base template the program was resolved from.
    pub template_key: TemplateKey,
    /// Compile-time string defines.
    pub defines: BTreeMap<String, String>,
    /// Named uniform cells.
    pub uniforms: HashMap<String, UniformRef>,
    /// WGSL source after interception.
    pub source: String,
}

/// A compile interceptor: runs against the resolved program parameters
/// before the program is built.
pub type CompileHook = Rc<dyn Fn(&mut ProgramParameters)>;

/// Token identifying a registered compile hook, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookToken(Id);

struct HookEntry {
    token: HookToken,
    hook: CompileHook,
}

/// A material whose shading program can be extended by external systems.
///
/// Interceptors run in registration order; registering never displaces a
/// previously installed hook, and removal by token leaves the others
/// untouched.
pub struct ShaderMaterial {
    /// Unique ID.
    id: Id,
    /// Shared base template.
    template: Arc<ShaderTemplate>,
    /// Compile-time string defines.
    pub defines: BTreeMap<String, String>,
    /// Named uniform cells.
    uniforms: HashMap<String, UniformRef>,
    /// Ordered compile interceptors.
    hooks: Vec<HookEntry>,
    /// Whether the program needs recompilation.
    needs_update: bool,
}

impl ShaderMaterial {
    /// Create a material over a shared template.
    pub fn new(template: Arc<ShaderTemplate>) -> Self {
        Self {
            id: Id::new(),
            template,
            defines: BTreeMap::new(),
            uniforms: HashMap::new(),
            hooks: Vec::new(),
            needs_update: true,
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The base template.
    #[inline]
    pub fn template(&self) -> &Arc<ShaderTemplate> {
        &self.template
    }

    /// Set a compile-time define.
    pub fn set_define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(key.into(), value.into());
    }

    /// Remove a compile-time define.
    pub fn remove_define(&mut self, key: &str) -> Option<String> {
        self.defines.remove(key)
    }

    /// Read a compile-time define.
    pub fn define(&self, key: &str) -> Option<&str> {
        self.defines.get(key).map(String::as_str)
    }

    /// Whether a define is present.
    pub fn has_define(&self, key: &str) -> bool {
        self.defines.contains_key(key)
    }

    /// Insert a uniform cell under a name.
    pub fn insert_uniform(&mut self, name: impl Into<String>, value: UniformRef) {
        self.uniforms.insert(name.into(), value);
    }

    /// Look up a uniform cell.
    pub fn uniform(&self, name: &str) -> Option<&UniformRef> {
        self.uniforms.get(name)
    }

    /// Remove a uniform cell.
    pub fn remove_uniform(&mut self, name: &str) -> Option<UniformRef> {
        self.uniforms.remove(name)
    }

    /// Number of uniform cells.
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Register a compile interceptor. Runs after all previously registered
    /// hooks; the returned token removes exactly this hook.
    pub fn add_compile_hook(&mut self, hook: CompileHook) -> HookToken {
        let token = HookToken(Id::new());
        self.hooks.push(HookEntry { token, hook });
        token
    }

    /// Remove a compile interceptor by token.
    pub fn remove_compile_hook(&mut self, token: HookToken) -> Option<CompileHook> {
        let index = self.hooks.iter().position(|e| e.token == token)?;
        Some(self.hooks.remove(index).hook)
    }

    /// Number of registered compile interceptors.
    pub fn compile_hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// The registered hooks, in execution order.
    pub fn compile_hooks(&self) -> impl Iterator<Item = &CompileHook> {
        self.hooks.iter().map(|e| &e.hook)
    }

    /// Whether the program needs recompilation.
    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Flag the program for recompilation.
    pub fn mark_needs_update(&mut self) {
        self.needs_update = true;
    }

    /// Clear the recompilation flag; called by the host after rebuilding.
    pub fn clear_needs_update(&mut self) {
        self.needs_update = false;
    }

    /// Resolve the program parameters: template source plus this material's
    /// defines and uniform cells, run through every compile interceptor in
    /// registration order.
    pub fn resolve_program(&self) -> ProgramParameters {
        let mut params = ProgramParameters {
            template_key: self.template.key(),
            defines: self.defines.clone(),
            uniforms: self
                .uniforms
                .iter()
                .map(|(k, v)| (k.clone(), Rc::clone(v)))
                .collect(),
            source: self.template.source().to_string(),
        };
        for entry in &self.hooks {
            (entry.hook)(&mut params);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::uniform::uniform_ref;
    use std::cell::Cell;

    fn test_material() -> ShaderMaterial {
        ShaderMaterial::new(Arc::new(ShaderTemplate::new("test", "fn fs() {}")))
    }

    #[test]
    fn test_hooks_run_in_order() {
        let mut material = test_material();
        material.add_compile_hook(Rc::new(|p| p.source.push('a')));
        material.add_compile_hook(Rc::new(|p| p.source.push('b')));
        let params = material.resolve_program();
        assert!(params.source.ends_with("ab"));
    }

    #[test]
    fn test_remove_hook_by_token() {
        let mut material = test_material();
        let calls = Rc::new(Cell::new(0));
        let calls2 = Rc::clone(&calls);
        let keep = material.add_compile_hook(Rc::new(move |_| calls2.set(calls2.get() + 1)));
        let drop_token = material.add_compile_hook(Rc::new(|p| p.source.push('x')));

        assert!(material.remove_compile_hook(drop_token).is_some());
        assert!(material.remove_compile_hook(drop_token).is_none());

        let params = material.resolve_program();
        assert_eq!(calls.get(), 1);
        assert!(!params.source.ends_with('x'));

        assert!(material.remove_compile_hook(keep).is_some());
    }

    #[test]
    fn test_resolved_uniforms_alias_material_cells() {
        let mut material = test_material();
        material.insert_uniform("strength", uniform_ref(UniformValue::Float(1.0)));
        let params = material.resolve_program();

        *material.uniform("strength").unwrap().borrow_mut() = UniformValue::Float(0.25);
        let seen = params.uniforms["strength"].borrow().as_float().unwrap();
        assert_eq!(seen, 0.25);
    }
}
