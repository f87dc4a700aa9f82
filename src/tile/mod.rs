//! Tile model and cache.
//!
//! # Components
//!
//! - [`TileKey`]: (layer, column, row) triple identifying a grid cell
//! - [`Tile`]: a cached tile with one payload slot per image it waits for
//! - [`PayloadKind`]: base image or one of the two relighting coefficient images
//! - [`TileCache`]: keyed store with a logical clock and badness-scored eviction
//!
//! # Lifecycle
//!
//! ```text
//!   absent ──fetch──▶ loading ──last payload arrives──▶ ready
//!                        │                                │
//!                        └──────────── evicted ◀──────────┘
//! ```
//!
//! A failed load never moves a tile out of `loading`; the region just stays
//! blurry.

mod cache;
mod entry;

pub use cache::{badness, capacity_for, EvictionWeights, TileCache, EVICTION_TARGET};
pub use entry::{PayloadKind, Texture, Tile, TileGeneration, TileKey, TileTextures};
