//! Per-layer geometry of a tiled image pyramid.
//!
//! Layers are numbered from the coarsest: layer 0 is the smallest image and
//! layer `N - 1` is full resolution. Each step down halves width and height
//! with integer truncation.

use serde::Serialize;

use crate::error::ConfigError;

/// The largest resolution count whose shrink factor still fits in a `u32`.
pub const MAX_RESOLUTIONS: u32 = 32;

/// Integer pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// =============================================================================
// Layer Information
// =============================================================================

/// Geometry of one pyramid layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    /// Width of this layer in pixels
    pub width: u32,

    /// Height of this layer in pixels
    pub height: u32,

    /// Number of tiles in X direction, counting partial edge tiles
    pub tiles_across: u32,

    /// Number of tiles in Y direction, counting partial edge tiles
    pub tiles_down: u32,

    /// Full-resolution pixels per pixel of this layer
    pub shrink: u32,
}

impl LayerInfo {
    /// Whether `(col, row)` names a tile inside this layer's grid.
    pub fn contains_tile(&self, col: u32, row: u32) -> bool {
        col < self.tiles_across && row < self.tiles_down
    }
}

// =============================================================================
// Pyramid Model
// =============================================================================

/// Immutable layer table derived from the source parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyramidModel {
    max_size: Dimensions,
    tile_size: Dimensions,
    layers: Vec<LayerInfo>,
}

impl PyramidModel {
    /// Build the layer table.
    ///
    /// # Errors
    ///
    /// Rejects zero tile or image dimensions, a zero resolution count, and
    /// more than [`MAX_RESOLUTIONS`] layers.
    pub fn new(
        max_size: Dimensions,
        tile_size: Dimensions,
        resolution_count: u32,
    ) -> Result<Self, ConfigError> {
        if tile_size.is_empty() {
            return Err(ConfigError::InvalidTileSize {
                width: tile_size.width,
                height: tile_size.height,
            });
        }
        if max_size.is_empty() {
            return Err(ConfigError::InvalidImageSize {
                width: max_size.width,
                height: max_size.height,
            });
        }
        if resolution_count == 0 {
            return Err(ConfigError::NoResolutions);
        }
        if resolution_count > MAX_RESOLUTIONS {
            return Err(ConfigError::TooManyResolutions {
                count: resolution_count,
                max: MAX_RESOLUTIONS,
            });
        }

        let mut layers = Vec::with_capacity(resolution_count as usize);
        let (mut width, mut height) = (max_size.width, max_size.height);

        // Walk from full resolution down to the coarsest layer
        for index in (0..resolution_count).rev() {
            layers.push(LayerInfo {
                width,
                height,
                tiles_across: width.div_ceil(tile_size.width),
                tiles_down: height.div_ceil(tile_size.height),
                shrink: 1u32 << (resolution_count - index - 1),
            });
            width /= 2;
            height /= 2;
        }
        layers.reverse();

        Ok(Self {
            max_size,
            tile_size,
            layers,
        })
    }

    /// Number of layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Index of the full-resolution layer.
    pub fn finest_layer(&self) -> u32 {
        (self.layers.len() - 1) as u32
    }

    /// Get the geometry of a layer, or `None` if it is out of range.
    pub fn layer(&self, index: u32) -> Option<&LayerInfo> {
        self.layers.get(index as usize)
    }

    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    pub fn max_size(&self) -> Dimensions {
        self.max_size
    }

    pub fn tile_size(&self) -> Dimensions {
        self.tile_size
    }

    /// Clamp a requested level into `[0, N - 1]`.
    pub fn clamp_layer(&self, level: i64) -> u32 {
        level.clamp(0, self.finest_layer() as i64) as u32
    }
}

// =============================================================================
// Tests
// =============================================================================
