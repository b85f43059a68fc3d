//! Patchable shader materials.
//!
//! A [`ShaderMaterial`] pairs a shared [`ShaderTemplate`] with per-material
//! compile-time defines, editable uniform cells, and an ordered list of
//! compile interceptors that may rewrite the program before it is built.

mod shader_material;
mod template;
mod uniform;

pub use shader_material::{CompileHook, HookToken, ProgramParameters, ShaderMaterial};
pub use template::{ShaderTemplate, TemplateKey};
pub use uniform::{uniform_ref, UniformRef, UniformValue};
