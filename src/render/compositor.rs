use serde::{Deserialize, Serialize};

use super::RelightUniforms;
use crate::geometry::{Point, Size};
use crate::tile::{TileKey, TileTextures};

/// Draws frames.
///
/// The viewer decides what is drawn and in what order; implementations own
/// texture upload and the actual draw calls. `render` is called on every
/// redraw, so implementations should not assume one call per fetch.
pub trait Compositor {
    fn render(&mut self, frame: &Frame);
}

impl<C: Compositor + ?Sized> Compositor for &mut C {
    fn render(&mut self, frame: &Frame) {
        (**self).render(frame)
    }
}

/// One tile to draw.
///
/// The destination is a rectangle of `size` screen pixels whose top-left
/// corner sits at `origin`, rotated by `rotation` degrees about that corner.
#[derive(Debug, Clone, Serialize)]
pub struct DrawInstruction {
    pub key: TileKey,

    #[serde(skip)]
    pub textures: TileTextures,

    pub origin: Point,
    pub size: Size,

    /// Degrees, positive is counter-clockwise
    pub rotation: f64,
}

/// An annotation segment in current-layer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl LayerLine {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// An annotation segment mapped to screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenLine {
    pub start: Point,
    pub end: Point,
}

/// Everything drawn in one redraw.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Frame {
    pub viewport: Size,

    /// Coarse layers first, so sharper tiles overpaint their placeholders
    pub draws: Vec<DrawInstruction>,

    /// Present only in relighting mode
    pub relight: Option<RelightUniforms>,

    /// Drawn after the tiles
    pub lines: Vec<ScreenLine>,
}

/// Compositor that keeps the most recent frame.
///
/// Useful for headless rendering, where the frame itself is the output.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    last: Option<Frame>,
    frames: usize,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn take_last_frame(&mut self) -> Option<Frame> {
        self.last.take()
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> usize {
        self.frames
    }
}

impl Compositor for FrameRecorder {
    fn render(&mut self, frame: &Frame) {
        self.frames += 1;
        self.last = Some(frame.clone());
    }
}
