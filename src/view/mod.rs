//! Fetch and draw orchestration.
//!
//! # Tile States
//!
//! ```text
//!   absent ──fetch──▶ loading ──every payload arrived──▶ ready
//! ```
//!
//! [`Viewer::fetch`] inserts a tile in the loading state the moment it
//! decides the tile is needed and spawns one load per payload. Completions
//! come back as events; each one is matched against the generation of the
//! tile it was issued for, so a completion for an evicted tile is dropped
//! rather than landing in a newer tile at the same key.
//!
//! # Drawing
//!
//! [`Viewer::draw`] walks layers from coarsest to current. Coarse tiles are
//! drawn scaled up under the current layer, so a region whose sharp tiles
//! are still loading shows a softer image instead of a hole.

mod event;
mod grid;
mod viewer;

pub use event::LoadOutcome;
pub use grid::TileRange;
pub use viewer::Viewer;
