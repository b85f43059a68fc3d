//! # Umbra - Cascaded Shadow Maps for wgpu Engines
//!
//! Umbra splits a camera's view frustum into depth-ranged cascades, fits a
//! temporally-stable light-space projection to each one, and patches
//! arbitrary shader materials to select and sample the right cascade per
//! fragment - without those materials being authored with shadow support in
//! mind.
//!
//! ## Features
//!
//! - **Split schemes**: uniform, logarithmic, practical, or custom cascade
//!   distribution
//! - **Stable shadows**: light-space texel snapping eliminates shimmer under
//!   camera and light motion
//! - **Program patching**: reversible, cached injection of cascade logic
//!   into existing shading programs
//!
//! ## Example
//!
//! ```ignore
//! use umbra::prelude::*;
//!
//! let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 1000.0);
//! let mut csm = Csm::new(&mut camera, CsmOptions::default())?;
//!
//! let material = Rc::new(RefCell::new(ShaderMaterial::new(template)));
//! csm.setup_material(&material);
//!
//! // render loop:
//! csm.update(&mut camera);
//! ```

#![warn(missing_docs)]

pub mod camera;
pub mod core;
pub mod light;
pub mod material;
pub mod math;
pub mod shadows;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::camera::{Camera, OrthographicCamera, PerspectiveCamera};
    pub use crate::light::{DirectionalLight, DirectionalShadow};
    pub use crate::material::{ShaderMaterial, ShaderTemplate, UniformValue};
    pub use crate::math::{Box3, Color, Matrix4, Vector2, Vector3};
    pub use crate::shadows::{Csm, CsmOptions, ShadowQuality, ShadowQualitySettings, SplitMode};
}
