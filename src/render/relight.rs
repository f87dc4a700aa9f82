//! Lighting weights for relighting (RTI) mode.
//!
//! The compositor reconstructs a relit pixel from the base texture and the
//! two coefficient textures as
//!
//! ```text
//! (coeffH - hOffset) * hScale * hWeight + (coeffL - lOffset) * lScale * lWeight
//! ```
//!
//! Only the weights and the per-channel scale/offset are computed here.

use std::f64::consts::PI;

use serde::Serialize;

use crate::pyramid::RelightCoefficients;

/// Light requests are stretched by this factor before clamping, so the
/// edge of the control reaches full strength.
const LIGHT_GAIN: f64 = 1.1;

/// A requested light position in `[-1, 1] x [-1, 1]`, relative to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LightDirection {
    pub x: f64,
    pub y: f64,
}

impl LightDirection {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Weights for a view rotated by `angle_degrees`.
    ///
    /// The rotation is added to the light's direction so the light stays
    /// fixed relative to the scene as the view turns.
    pub fn weights(&self, angle_degrees: f64) -> LightWeights {
        let lx = (self.x * LIGHT_GAIN).clamp(-1.0, 1.0);
        let ly = (self.y * LIGHT_GAIN).clamp(-1.0, 1.0);

        let norm = lx.hypot(ly).min(1.0);
        let alpha = ly.atan2(lx) + 2.0 * PI * angle_degrees / 360.0;

        let ix = norm * alpha.cos();
        let iy = norm * alpha.sin();

        LightWeights {
            h_weight: [(ix * ix) as f32, (iy * iy) as f32, (ix * iy) as f32],
            l_weight: [ix as f32, iy as f32, 1.0],
        }
    }
}

/// Per-frame weights for the quadratic (H) and linear (L) coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LightWeights {
    pub h_weight: [f32; 3],
    pub l_weight: [f32; 3],
}

/// Everything the compositor needs to relight a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelightUniforms {
    pub h_weight: [f32; 3],
    pub l_weight: [f32; 3],
    pub h_scale: [f32; 3],
    pub h_offset: [f32; 3],
    pub l_scale: [f32; 3],
    pub l_offset: [f32; 3],
}

impl RelightUniforms {
    pub fn new(weights: LightWeights, coefficients: &RelightCoefficients) -> Self {
        Self {
            h_weight: weights.h_weight,
            l_weight: weights.l_weight,
            h_scale: coefficients.h_scale,
            h_offset: coefficients.h_offset,
            l_scale: coefficients.l_scale,
            l_offset: coefficients.l_offset,
        }
    }
}
