//! Cached tile entries.
//!
//! A tile is created in the loading state as soon as a fetch decides it is
//! needed, and becomes drawable once every payload it waits for has arrived.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::Serialize;

// =============================================================================
// Keys
// =============================================================================

/// Identifies a tile by layer and grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileKey {
    /// Pyramid layer (0 = coarsest)
    pub layer: u32,

    /// Tile column (0-indexed from left)
    pub col: u32,

    /// Tile row (0-indexed from top)
    pub row: u32,
}

impl TileKey {
    pub const fn new(layer: u32, col: u32, row: u32) -> Self {
        Self { layer, col, row }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}_{}", self.layer, self.col, self.row)
    }
}

/// Distinguishes one tile slot from a later tile cached at the same key.
///
/// Loads carry the generation of the tile they were issued for, so a
/// completion that arrives after its tile was evicted (and the key
/// refetched) cannot land in the new tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileGeneration(pub u64);

// =============================================================================
// Payloads
// =============================================================================

/// The images that make up one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// The colour image
    Base,

    /// Linear relighting coefficients
    LowCoefficients,

    /// Quadratic relighting coefficients
    HighCoefficients,
}

impl PayloadKind {
    /// Payloads a plain tile waits for.
    pub const PLAIN: &'static [PayloadKind] = &[PayloadKind::Base];

    /// Payloads a relighting tile waits for, in request order.
    pub const RELIGHT: &'static [PayloadKind] = &[
        PayloadKind::Base,
        PayloadKind::HighCoefficients,
        PayloadKind::LowCoefficients,
    ];

    /// Numeric code passed to URL templates.
    pub fn code(self) -> u8 {
        match self {
            PayloadKind::Base => 0,
            PayloadKind::LowCoefficients => 1,
            PayloadKind::HighCoefficients => 2,
        }
    }

    /// Payload set for the given rendering mode.
    pub fn required(relight: bool) -> &'static [PayloadKind] {
        if relight {
            Self::RELIGHT
        } else {
            Self::PLAIN
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Base => "base",
            PayloadKind::LowCoefficients => "low",
            PayloadKind::HighCoefficients => "high",
        };
        f.write_str(name)
    }
}

/// A decoded tile image, shared with the compositor.
pub type Texture = Arc<RgbaImage>;

#[derive(Debug, Clone)]
struct PayloadSlot {
    kind: PayloadKind,
    texture: Option<Texture>,
}

/// Textures of a ready tile, as handed to the compositor.
#[derive(Debug, Clone)]
pub struct TileTextures {
    pub base: Texture,

    /// `(high, low)` coefficient images when relighting
    pub coefficients: Option<(Texture, Texture)>,
}

// =============================================================================
// Tile
// =============================================================================

/// A tile owned by the cache.
#[derive(Debug, Clone)]
pub struct Tile {
    key: TileKey,
    generation: TileGeneration,
    payloads: Vec<PayloadSlot>,
    last_used: u64,
}

impl Tile {
    /// Create a tile in the loading state, waiting for `kinds`.
    pub fn new(key: TileKey, generation: TileGeneration, kinds: &[PayloadKind]) -> Self {
        Self {
            key,
            generation,
            payloads: kinds
                .iter()
                .map(|&kind| PayloadSlot {
                    kind,
                    texture: None,
                })
                .collect(),
            last_used: 0,
        }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn generation(&self) -> TileGeneration {
        self.generation
    }

    /// Logical time of the last touch.
    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub(crate) fn touch(&mut self, now: u64) {
        self.last_used = now;
    }

    /// Payload kinds this tile waits for.
    pub fn kinds(&self) -> impl Iterator<Item = PayloadKind> + '_ {
        self.payloads.iter().map(|slot| slot.kind)
    }

    /// Whether one payload has arrived.
    pub fn is_payload_ready(&self, kind: PayloadKind) -> bool {
        self.payloads
            .iter()
            .any(|slot| slot.kind == kind && slot.texture.is_some())
    }

    /// A tile is drawable only once every payload has arrived, in whatever
    /// order they came.
    pub fn is_ready(&self) -> bool {
        self.payloads.iter().all(|slot| slot.texture.is_some())
    }

    /// Store an arrived payload.
    ///
    /// Returns `false` if this tile does not wait for `kind`.
    pub fn set_payload(&mut self, kind: PayloadKind, texture: Texture) -> bool {
        match self.payloads.iter_mut().find(|slot| slot.kind == kind) {
            Some(slot) => {
                slot.texture = Some(texture);
                true
            }
            None => false,
        }
    }

    fn texture(&self, kind: PayloadKind) -> Option<&Texture> {
        self.payloads
            .iter()
            .find(|slot| slot.kind == kind)
            .and_then(|slot| slot.texture.as_ref())
    }

    /// Textures to draw, or `None` while the tile is still loading.
    pub fn textures(&self) -> Option<TileTextures> {
        if !self.is_ready() {
            return None;
        }

        let base = self.texture(PayloadKind::Base)?.clone();
        let coefficients = match (
            self.texture(PayloadKind::HighCoefficients),
            self.texture(PayloadKind::LowCoefficients),
        ) {
            (Some(high), Some(low)) => Some((high.clone(), low.clone())),
            _ => None,
        };

        Some(TileTextures { base, coefficients })
    }
}

// =============================================================================
// Tests
// =============================================================================
