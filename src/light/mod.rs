//! Light sources consumed by the shadow subsystem.

mod directional;
mod shadow_map;

pub use directional::{DirectionalLight, DirectionalShadow};
pub use shadow_map::ShadowMap;
