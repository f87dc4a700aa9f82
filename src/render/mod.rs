//! The boundary between the viewer and whatever draws its frames.
//!
//! Each redraw produces a [`Frame`]: draw instructions ordered coarse to
//! fine, optional relighting uniforms and overlay lines already mapped to
//! screen space. A [`Compositor`] turns that into pixels.

mod compositor;
mod relight;

pub use compositor::{Compositor, DrawInstruction, Frame, FrameRecorder, LayerLine, ScreenLine};
pub use relight::{LightDirection, LightWeights, RelightUniforms};
