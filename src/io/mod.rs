//! Tile loading.
//!
//! Everything between a [`TileKey`](crate::tile::TileKey) and a decoded
//! texture:
//!
//! - [`TileUrlResolver`]: key + payload kind to location
//! - [`TileLoader`]: location to decoded [`Texture`](crate::tile::Texture)
//!
//! Loaders exist for HTTP(S), the local filesystem and S3. Any of them can be
//! wrapped in a [`RetryingLoader`].

mod file;
mod http;
mod loader;
mod resolver;
mod s3;

pub use file::FileTileLoader;
pub use http::{HttpTileLoader, DEFAULT_LOAD_TIMEOUT};
pub use loader::{
    decode_tile, LoadRequest, RetryPolicy, RetryingLoader, TileLoader, DEFAULT_MAX_ATTEMPTS,
};
pub use resolver::{DeepZoomResolver, TemplateResolver, TileUrlResolver};
pub use s3::{create_s3_client, parse_s3_uri, S3TileLoader};
