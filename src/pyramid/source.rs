//! Source metadata handed to the viewer by the embedding application.
//!
//! Parsing a server manifest (DZI XML, IIP responses, ...) is the
//! embedder's job. This module only holds the parsed values and the small
//! amount of arithmetic every Deep Zoom source shares.

use crate::error::ConfigError;

use super::model::Dimensions;

/// Number of coefficients per relighting image: one per colour channel.
const CHANNELS: usize = 3;

/// Parameters describing a tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    /// Dimensions of the full-resolution image
    pub max_size: Dimensions,

    /// Dimensions of a tile
    pub tile_size: Dimensions,

    /// Number of pyramid layers
    pub resolution_count: u32,

    /// Coefficient normalisation for relighting sources
    pub relight: Option<RelightCoefficients>,
}

impl SourceMetadata {
    pub fn new(max_size: Dimensions, tile_size: Dimensions, resolution_count: u32) -> Self {
        Self {
            max_size,
            tile_size,
            resolution_count,
            relight: None,
        }
    }

    /// Metadata for a Deep Zoom image with square tiles.
    ///
    /// Deep Zoom pyramids go all the way down to a single pixel, so the
    /// layer count is `ceil(log2(max(width, height)))`.
    pub fn deep_zoom(width: u32, height: u32, tile_size: u32) -> Self {
        Self::new(
            Dimensions::new(width, height),
            Dimensions::new(tile_size, tile_size),
            deep_zoom_resolution_count(width, height),
        )
    }

    pub fn with_relight(mut self, relight: RelightCoefficients) -> Self {
        self.relight = Some(relight);
        self
    }
}

/// `ceil(log2(max(width, height)))`, never less than 1.
pub fn deep_zoom_resolution_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height);
    if max_dim <= 1 {
        return 1;
    }
    u32::BITS - (max_dim - 1).leading_zeros()
}

// =============================================================================
// Relighting Coefficients
// =============================================================================

/// Per-channel scale and offset used to unpack the byte-encoded H and L
/// coefficient images of an RTI source.
///
/// Offsets are stored already divided by 255 so they apply directly to
/// texture samples in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelightCoefficients {
    pub h_scale: [f32; CHANNELS],
    pub h_offset: [f32; CHANNELS],
    pub l_scale: [f32; CHANNELS],
    pub l_offset: [f32; CHANNELS],
}

impl RelightCoefficients {
    /// Build from separate H and L scale/offset triples. Offsets are given
    /// in byte units.
    pub fn new(
        h_scale: [f32; CHANNELS],
        h_offset: [f32; CHANNELS],
        l_scale: [f32; CHANNELS],
        l_offset: [f32; CHANNELS],
    ) -> Self {
        Self {
            h_scale,
            h_offset: h_offset.map(|o| o / 255.0),
            l_scale,
            l_offset: l_offset.map(|o| o / 255.0),
        }
    }

    /// Build from the six-element scale and offset arrays found in RTI
    /// manifests: the first three entries belong to H, the last three to L.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRelight`] if the arrays differ in length
    /// or do not hold exactly six values.
    pub fn from_arrays(scale: &[f32], offset: &[f32]) -> Result<Self, ConfigError> {
        if scale.len() != offset.len() {
            return Err(ConfigError::InvalidRelight {
                reason: format!(
                    "scale and offset arrays differ in length ({} vs {})",
                    scale.len(),
                    offset.len()
                ),
            });
        }
        if scale.len() != 2 * CHANNELS {
            return Err(ConfigError::InvalidRelight {
                reason: format!(
                    "LRGB RTI images need six scale and offset coefficients, got {}",
                    scale.len()
                ),
            });
        }

        let triple = |values: &[f32]| [values[0], values[1], values[2]];

        Ok(Self::new(
            triple(&scale[..CHANNELS]),
            triple(&offset[..CHANNELS]),
            triple(&scale[CHANNELS..]),
            triple(&offset[CHANNELS..]),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
