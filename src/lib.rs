//! # Pyramid Viewer
//!
//! The core of a deep-zoom image viewer: it decides which tiles of a very
//! large multi-resolution image to fetch, keeps a bounded cache of them and
//! tells a compositor what to draw where.
//!
//! ## Features
//!
//! - **Pan, zoom and rotate**: exact mapping between screen and layer pixels
//! - **Placeholder drawing**: coarse layers are drawn under the current one,
//!   so loading regions look soft instead of empty
//! - **Bounded cache**: eviction keeps coarse and recently used tiles and
//!   drops stale fine ones first
//! - **Out-of-order loads**: completions may arrive in any order, late or not
//!   at all without corrupting the cache
//! - **Relighting**: RTI sources with base and coefficient textures per tile
//!
//! ## Architecture
//!
//! - [`geometry`] - screen/layer transform
//! - [`pyramid`] - per-layer geometry and source metadata
//! - [`tile`] - tile entries and the tile cache
//! - [`io`] - tile location resolvers and loaders (HTTP, file, S3)
//! - [`render`] - frames, the compositor boundary and relighting weights
//! - [`view`] - the [`Viewer`] that ties them together
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyramid_viewer::{
//!     DeepZoomResolver, FrameRecorder, HttpTileLoader, Size, SourceMetadata, Viewer,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = HttpTileLoader::new(Duration::from_secs(30))?;
//!     let mut viewer = Viewer::new(loader, FrameRecorder::new(), Size::new(1024.0, 768.0));
//!
//!     viewer.set_source(
//!         SourceMetadata::deep_zoom(40_000, 30_000, 256),
//!         DeepZoomResolver::from_descriptor("https://example.com/scan.dzi", "jpg"),
//!     )?;
//!     viewer.set_layer(8);
//!     viewer.set_origin(10_000.0, 7_500.0)?;
//!     viewer.fetch()?;
//!
//!     while let Some(outcome) = viewer.next_event().await {
//!         println!("{:?}", outcome);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod pyramid;
pub mod render;
pub mod tile;
pub mod view;

// Re-export commonly used types
pub use config::{Cli, Command, PlanConfig, RenderConfig, SourceArgs, ViewArgs};
pub use error::{CacheError, ConfigError, LoadError, ViewError};
pub use geometry::{normalise_rect, transform_rect, Point, Rect, Size, ViewState};
pub use io::{
    create_s3_client, decode_tile, parse_s3_uri, DeepZoomResolver, FileTileLoader,
    HttpTileLoader, LoadRequest, RetryPolicy, RetryingLoader, S3TileLoader, TemplateResolver,
    TileLoader, TileUrlResolver,
};
pub use pyramid::{
    deep_zoom_resolution_count, Dimensions, LayerInfo, PyramidModel, RelightCoefficients,
    SourceMetadata, MAX_RESOLUTIONS,
};
pub use render::{
    Compositor, DrawInstruction, Frame, FrameRecorder, LayerLine, LightDirection, LightWeights,
    RelightUniforms, ScreenLine,
};
pub use tile::{
    badness, capacity_for, EvictionWeights, PayloadKind, Texture, Tile, TileCache,
    TileGeneration, TileKey, TileTextures, EVICTION_TARGET,
};
pub use view::{LoadOutcome, TileRange, Viewer};
