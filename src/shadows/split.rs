//! Cascade split schemes.
//!
//! A split scheme distributes cascade boundaries across the shadowed depth
//! range. Depths are normalized: a value of `d` marks the view-space distance
//! `d * far`, so the last boundary is always exactly `1.0`.

use crate::math::lerp;
use serde::{Deserialize, Serialize};

/// How cascade depth boundaries are distributed between near and far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Equal view-space depth per cascade.
    Uniform,
    /// Exponential distribution, denser near the camera.
    Logarithmic,
    /// Blend of uniform and logarithmic.
    #[default]
    Practical,
    /// Caller-provided split function.
    Custom,
}

/// A caller-provided split function for [`SplitMode::Custom`].
///
/// Must push `count` ascending normalized depths in `(0, 1]` into the target.
pub type SplitFunction = fn(count: usize, near: f32, far: f32, target: &mut Vec<f32>);

/// Compute normalized split depths for the given scheme.
///
/// `near` and `far` are view-space distances with `0 < near < far`; the
/// logarithmic scheme is undefined at `near == 0`, so callers clamp near to a
/// positive epsilon first. The result is `count` ascending values in
/// `(0, 1]`, ending on exactly `1.0`.
pub fn compute_splits(
    mode: SplitMode,
    count: usize,
    near: f32,
    far: f32,
    blend: f32,
    custom: Option<SplitFunction>,
    target: &mut Vec<f32>,
) {
    debug_assert!(count >= 1);
    debug_assert!(near > 0.0 && near < far);

    target.clear();
    match mode {
        SplitMode::Uniform => uniform_split(count, near, far, target),
        SplitMode::Logarithmic => logarithmic_split(count, near, far, target),
        SplitMode::Practical => practical_split(count, near, far, blend, target),
        SplitMode::Custom => {
            // Validated at configuration time; an absent callback here is a
            // subsystem bug.
            let custom = custom.expect("custom split mode without a split function");
            custom(count, near, far, target);
        }
    }
}

fn uniform_split(count: usize, near: f32, far: f32, target: &mut Vec<f32>) {
    for i in 1..count {
        target.push((near + (far - near) * i as f32 / count as f32) / far);
    }
    target.push(1.0);
}

fn logarithmic_split(count: usize, near: f32, far: f32, target: &mut Vec<f32>) {
    for i in 1..count {
        target.push(near * (far / near).powf(i as f32 / count as f32) / far);
    }
    target.push(1.0);
}

fn practical_split(count: usize, near: f32, far: f32, blend: f32, target: &mut Vec<f32>) {
    for i in 1..count {
        let t = i as f32 / count as f32;
        let uniform = (near + (far - near) * t) / far;
        let logarithmic = near * (far / near).powf(t) / far;
        target.push(lerp(uniform, logarithmic, blend));
    }
    target.push(1.0);
}
