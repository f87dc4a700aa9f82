//! Tile cache with badness-scored eviction.
//!
//! This cache holds decoded tiles for the viewer and decides which ones to
//! drop when it fills up.
//!
//! # Eviction Policy
//!
//! Plain LRU is a poor fit for a zooming viewer: the coarsest layers are the
//! fallback drawn under everything else and must stay resident even when
//! they have not been touched for a while. Instead each tile gets a
//! *badness* score when the cache overflows:
//!
//! ```text
//! badness = (now - last_used)
//!         + 100  * |current_layer - layer|
//!         - 1000 * max(0, 2 - layer)
//! ```
//!
//! Tiles are sorted most precious first and the tail is dropped until the
//! cache is down to 80% of capacity. Stopping below the limit stops a cache
//! that sits exactly at capacity from evicting and refetching on every pan.
//!
//! # Bookkeeping
//!
//! Tiles live in a map keyed by [`TileKey`]; a separate list records every
//! live key once and is only used for eviction scans.

use std::collections::HashMap;

use tracing::{debug, error};

use crate::error::CacheError;
use crate::geometry::Size;
use crate::pyramid::Dimensions;

use super::entry::{Tile, TileKey};

/// Fraction of `max_tiles` an eviction pass trims down to.
pub const EVICTION_TARGET: f64 = 0.8;

/// How many viewport-fulls of tiles the cache holds.
const VIEWPORT_COVERAGE: usize = 3;

// =============================================================================
// Scoring
// =============================================================================

/// Weights of the badness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionWeights {
    /// Cost per tick since the tile was last touched
    pub recency: i64,

    /// Cost per layer between the tile and the layer on display
    pub layer_distance: i64,

    /// Bonus per layer a tile sits below `coarse_threshold`
    pub coarse_bonus: i64,

    /// Layers below this index earn the coarse bonus
    pub coarse_threshold: i64,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        Self {
            recency: 1,
            layer_distance: 100,
            coarse_bonus: 1000,
            coarse_threshold: 2,
        }
    }
}

/// Eviction score of one tile. Lower is more precious.
pub fn badness(
    weights: &EvictionWeights,
    now: u64,
    current_layer: u32,
    tile_layer: u32,
    last_used: u64,
) -> i64 {
    let age = now.saturating_sub(last_used) as i64;
    let distance = (current_layer as i64 - tile_layer as i64).abs();
    let coarse = (weights.coarse_threshold - tile_layer as i64).max(0);

    weights.recency * age + weights.layer_distance * distance - weights.coarse_bonus * coarse
}

/// Tile budget for a viewport: enough to paint it three times over.
///
/// A viewport one pixel wider than a tile can straddle two tile columns, so
/// each axis counts one tile more than it strictly needs. Absurd viewports
/// saturate at `usize::MAX`.
pub fn capacity_for(viewport: Size, tile_size: Dimensions) -> usize {
    let tiles_along = |extent: f64, tile: u32| {
        let tiles = (extent / tile.max(1) as f64).ceil().max(0.0) as usize;
        tiles.saturating_add(1)
    };
    let across = tiles_along(viewport.width, tile_size.width);
    let down = tiles_along(viewport.height, tile_size.height);

    VIEWPORT_COVERAGE.saturating_mul(across).saturating_mul(down)
}

// =============================================================================
// Tile Cache
// =============================================================================

/// Store of decoded tiles with a logical clock.
///
/// The cache is owned by a single viewer and never shared between tasks, so
/// it needs no locking; callers must check [`TileCache::get`] before
/// [`TileCache::insert`].
#[derive(Debug)]
pub struct TileCache {
    /// Tiles indexed by key
    tiles: HashMap<TileKey, Tile>,

    /// Every live key exactly once, for eviction scans
    live: Vec<TileKey>,

    /// Size an eviction pass is triggered above
    max_tiles: usize,

    /// Logical time, advanced by [`TileCache::tick`]
    now: u64,

    weights: EvictionWeights,
}

impl TileCache {
    /// Create an empty cache holding up to `max_tiles` tiles.
    pub fn new(max_tiles: usize) -> Self {
        Self::with_weights(max_tiles, EvictionWeights::default())
    }

    /// Create an empty cache with custom eviction weights.
    pub fn with_weights(max_tiles: usize, weights: EvictionWeights) -> Self {
        Self {
            tiles: HashMap::new(),
            live: Vec::new(),
            max_tiles,
            now: 0,
            weights,
        }
    }

    /// Advance the logical clock and return the new time.
    pub fn tick(&mut self) -> u64 {
        self.now += 1;
        self.now
    }

    /// Current logical time.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Get a tile, stamping it with the current time.
    pub fn get(&mut self, key: &TileKey) -> Option<&Tile> {
        let now = self.now;
        let tile = self.tiles.get_mut(key)?;
        tile.touch(now);
        Some(&*tile)
    }

    /// Get a tile without touching it.
    pub fn peek(&self, key: &TileKey) -> Option<&Tile> {
        self.tiles.get(key)
    }

    /// Get a tile mutably without touching it.
    pub fn peek_mut(&mut self, key: &TileKey) -> Option<&mut Tile> {
        self.tiles.get_mut(key)
    }

    /// Check if a tile is cached without touching it.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Add a tile.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::DuplicateTile`] if a tile already occupies the
    /// key; the existing tile is left untouched.
    pub fn insert(&mut self, mut tile: Tile) -> Result<(), CacheError> {
        let key = tile.key();
        if self.tiles.contains_key(&key) {
            error!(%key, "refusing to overwrite cached tile");
            return Err(CacheError::DuplicateTile { key });
        }

        tile.touch(self.now);
        self.tiles.insert(key, tile);
        self.live.push(key);
        Ok(())
    }

    /// Remove the tile at the tail of the live list.
    ///
    /// After an eviction sort the tail is the least precious tile.
    pub fn pop(&mut self) -> Result<Tile, CacheError> {
        let key = self.live.pop().ok_or(CacheError::EmptyTileList)?;
        debug!(%key, "evicting tile");

        // The list and the map always hold the same keys
        self.tiles.remove(&key).ok_or(CacheError::EmptyTileList)
    }

    /// Trim the cache if it holds more than `max_tiles` tiles.
    ///
    /// Returns the keys of the evicted tiles, least precious first.
    pub fn evict_if_over_capacity(
        &mut self,
        current_layer: u32,
    ) -> Result<Vec<TileKey>, CacheError> {
        if self.live.len() <= self.max_tiles {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(i64, TileKey)> = self
            .live
            .iter()
            .map(|key| {
                let tile = &self.tiles[key];
                let score = badness(
                    &self.weights,
                    self.now,
                    current_layer,
                    key.layer,
                    tile.last_used(),
                );
                (score, *key)
            })
            .collect();

        // Most precious first; stable so equal scores keep insertion order
        scored.sort_by_key(|(score, _)| *score);

        debug!(
            tiles = scored.len(),
            max_tiles = self.max_tiles,
            "cache over capacity, scores after sort:"
        );
        for (score, key) in &scored {
            let age = self.now.saturating_sub(self.tiles[key].last_used());
            debug!(%key, age, badness = score, "  ranked");
        }

        self.live = scored.into_iter().map(|(_, key)| key).collect();

        let target = EVICTION_TARGET * self.max_tiles as f64;
        let mut evicted = Vec::new();
        while self.live.len() as f64 > target {
            evicted.push(self.pop()?.key());
        }

        Ok(evicted)
    }

    /// Score of a cached tile at the current time.
    pub fn badness_of(&self, key: &TileKey, current_layer: u32) -> Option<i64> {
        let tile = self.tiles.get(key)?;
        Some(badness(
            &self.weights,
            self.now,
            current_layer,
            key.layer,
            tile.last_used(),
        ))
    }

    /// Keys of every live tile, in list order.
    pub fn keys(&self) -> &[TileKey] {
        &self.live
    }

    /// Number of live tiles.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Size above which an eviction pass trims the cache.
    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    /// Change the tile budget. Takes effect at the next eviction pass.
    pub fn set_max_tiles(&mut self, max_tiles: usize) {
        self.max_tiles = max_tiles;
    }

    pub fn weights(&self) -> &EvictionWeights {
        &self.weights
    }

    /// Drop every tile. The clock keeps running.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.live.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
