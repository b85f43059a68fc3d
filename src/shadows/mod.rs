//! Cascaded shadow maps for directional lights.
//!
//! The view frustum is split into depth-ranged cascades, each shadowed by
//! its own directional light with a tightly-fitted, texel-snapped
//! orthographic projection. Arbitrary shader materials become cascade-aware
//! through runtime program patching.
//!
//! # Example
//!
//! ```ignore
//! use umbra::prelude::*;
//!
//! let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 1000.0);
//! let mut csm = Csm::new(&mut camera, CsmOptions {
//!     cascade_count: 4,
//!     far_distance: 500.0,
//!     ..Default::default()
//! })?;
//!
//! csm.setup_material(&material);
//!
//! // each frame, after moving the camera:
//! csm.update(&mut camera);
//! ```

mod frustum;
mod lights;
mod orchestrator;
mod patcher;
mod settings;
mod split;

pub use frustum::CsmFrustum;
pub use lights::CascadeLights;
pub use orchestrator::{Csm, CsmError, CsmOptions};
pub use patcher::{
    CascadeFrame, ShaderPatcher, DEFINE_CSM_CASCADE_COUNT, DEFINE_CSM_ENABLED, DEFINE_CSM_FADE,
    UNIFORM_CAMERA_NEAR, UNIFORM_CASCADES, UNIFORM_SHADOW_FAR,
};
pub use settings::{ShadowQuality, ShadowQualitySettings};
pub use split::{compute_splits, SplitFunction, SplitMode};

/// Default upper bound on the cascade count.
pub const MAX_CASCADES: usize = 4;
