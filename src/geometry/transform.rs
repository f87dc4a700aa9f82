//! Transform between viewport pixels and layer pixels.
//!
//! Going from layer to screen, a point is
//!
//! 1. rotated by `-angle` about the pivot,
//! 2. translated by the pan offset (`layer_left`, `layer_top`),
//! 3. divided by the scale.
//!
//! [`ViewState::screen_to_layer`] applies the exact inverse. The pivot is
//! stored in layer coordinates rather than derived from the viewport centre:
//! panning changes the pan offset, and if the pivot followed the viewport the
//! transform would depend on the value being computed.

use serde::Serialize;

use crate::error::ViewError;

// =============================================================================
// Primitives
// =============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate about the origin. Positive angles are counter-clockwise on
    /// screen.
    fn rotate(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            x: cos * self.x - sin * self.y,
            y: sin * self.x + cos * self.y,
        }
    }

    fn rotate_about(self, pivot: Point, radians: f64) -> Self {
        let relative = Point::new(self.x - pivot.x, self.y - pivot.y).rotate(radians);
        Point::new(relative.x + pivot.x, relative.y + pivot.y)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle. Width and height may be negative until the
/// rectangle is passed through [`normalise_rect`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.x, self.bottom()),
            Point::new(self.right(), self.bottom()),
        ]
    }
}

/// Map all four corners of `rect` through `f` and return the axis-aligned
/// bounding box of the results.
///
/// Under rotation the mapped rectangle is a quad; tile enumeration only
/// understands axis-aligned ranges, so the box is what callers want.
pub fn transform_rect<F>(f: F, rect: Rect) -> Rect
where
    F: Fn(Point) -> Point,
{
    let [first, rest @ ..] = rect.corners().map(f);

    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.x, first.y);
    for p in rest {
        left = left.min(p.x);
        top = top.min(p.y);
        right = right.max(p.x);
        bottom = bottom.max(p.y);
    }

    Rect::new(left, top, right - left, bottom - top)
}

/// Flip negative extents so `(x, y)` is always the minimum corner.
pub fn normalise_rect(rect: Rect) -> Rect {
    let Rect {
        mut x,
        mut y,
        mut w,
        mut h,
    } = rect;

    if w < 0.0 {
        x += w;
        w = -w;
    }
    if h < 0.0 {
        y += h;
        h = -h;
    }

    Rect::new(x, y, w, h)
}

// =============================================================================
// View State
// =============================================================================

/// Pan, scale and rotation of the viewport over the current layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Pan offset in layer pixels
    layer_left: f64,
    layer_top: f64,

    /// Layer pixels per screen pixel
    scale: f64,

    /// Rotation in degrees, positive is counter-clockwise
    angle: f64,

    /// Centre of rotation, in layer coordinates
    pivot: Point,

    /// Viewport size in screen pixels
    viewport: Size,
}

impl ViewState {
    /// Create an unrotated, unscaled view of the given viewport size.
    pub fn new(viewport: Size) -> Self {
        Self {
            layer_left: 0.0,
            layer_top: 0.0,
            scale: 1.0,
            angle: 0.0,
            pivot: Point::default(),
            viewport,
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn angle_radians(&self) -> f64 {
        self.angle.to_radians()
    }

    pub fn pivot(&self) -> Point {
        self.pivot
    }

    /// Pan offset as `(layer_left, layer_top)`.
    pub fn pan(&self) -> (f64, f64) {
        (self.layer_left, self.layer_top)
    }

    /// Transform a point from layer coordinates to screen coordinates.
    pub fn layer_to_screen(&self, point: Point) -> Point {
        let p = point.rotate_about(self.pivot, -self.angle_radians());

        Point::new(
            (p.x - self.layer_left) / self.scale,
            (p.y - self.layer_top) / self.scale,
        )
    }

    /// Transform a point from screen coordinates to layer coordinates.
    pub fn screen_to_layer(&self, point: Point) -> Point {
        let p = Point::new(
            point.x * self.scale + self.layer_left,
            point.y * self.scale + self.layer_top,
        );

        p.rotate_about(self.pivot, self.angle_radians())
    }

    /// The viewport mapped into layer space, as a normalised bounding box.
    ///
    /// This is not snapped to tile boundaries; centring and minimap code
    /// need the exact position.
    pub fn visible_layer_rect(&self) -> Rect {
        let screen = Rect::new(0.0, 0.0, self.viewport.width, self.viewport.height);
        normalise_rect(transform_rect(|p| self.screen_to_layer(p), screen))
    }

    /// Set the rotation angle in degrees.
    pub fn set_angle(&mut self, angle: f64) -> Result<(), ViewError> {
        if !angle.is_finite() {
            return Err(ViewError::NonFinite("angle"));
        }
        self.angle = angle;
        Ok(())
    }

    /// Set the number of layer pixels per screen pixel.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), ViewError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ViewError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(())
    }

    /// Set the pan offset directly, in layer pixels.
    pub fn set_pan(&mut self, layer_left: f64, layer_top: f64) -> Result<(), ViewError> {
        if !layer_left.is_finite() || !layer_top.is_finite() {
            return Err(ViewError::NonFinite("pan"));
        }
        self.layer_left = layer_left;
        self.layer_top = layer_top;
        Ok(())
    }

    /// Put layer point `(x, y)` at the centre of the viewport and make it
    /// the centre of rotation.
    pub fn set_origin(&mut self, x: f64, y: f64) -> Result<(), ViewError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ViewError::NonFinite("origin"));
        }

        // The pivot is a fixed point of the rotation, so only scale and pan
        // decide where it lands on screen.
        self.pivot = Point::new(x, y);
        self.layer_left = x - self.scale * self.viewport.width / 2.0;
        self.layer_top = y - self.scale * self.viewport.height / 2.0;
        Ok(())
    }

    /// Change the viewport size. Pan, scale and rotation are kept.
    pub fn resize(&mut self, viewport: Size) -> Result<(), ViewError> {
        let valid = |side: f64| side.is_finite() && side >= 0.0;
        if !valid(viewport.width) || !valid(viewport.height) {
            return Err(ViewError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        self.viewport = viewport;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
