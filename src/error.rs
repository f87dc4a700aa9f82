use thiserror::Error;

use crate::tile::TileKey;

/// Errors in the pyramid parameters handed to the viewer.
///
/// These are fatal at setup: a source that fails validation never touches
/// the tile cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Tile width or height is zero
    #[error("Invalid tile size {width}x{height}: both dimensions must be positive")]
    InvalidTileSize { width: u32, height: u32 },

    /// Full-resolution image width or height is zero
    #[error("Invalid image size {width}x{height}: both dimensions must be positive")]
    InvalidImageSize { width: u32, height: u32 },

    /// The pyramid has no layers at all
    #[error("Resolution count must be at least 1")]
    NoResolutions,

    /// More layers than a 32-bit shrink factor can express
    #[error("Resolution count {count} exceeds the maximum of {max}")]
    TooManyResolutions { count: u32, max: u32 },

    /// Relighting coefficient arrays are malformed
    #[error("Invalid relighting coefficients: {reason}")]
    InvalidRelight { reason: String },
}

/// Tile cache bookkeeping violations.
///
/// Any of these means the orchestrator broke the check-then-insert
/// discipline; the cache refuses the operation instead of corrupting itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A tile already occupies this key
    #[error("Tile {key} already cached: refusing to overwrite")]
    DuplicateTile { key: TileKey },

    /// The live tile list is empty
    #[error("Cannot pop from an empty tile list")]
    EmptyTileList,
}

/// Errors while loading a single tile payload.
///
/// Load failures are never fatal to the viewer: the payload simply stays
/// not-ready.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server or store answered, but with a failure status
    #[error("Request for {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The tile does not exist
    #[error("Tile not found: {0}")]
    NotFound(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Local filesystem error
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    /// The fetched bytes are not a decodable image
    #[error("Failed to decode tile {url}: {message}")]
    Decode { url: String, message: String },

    /// The load task panicked or was cancelled before reporting
    #[error("Load task for {location} aborted: {message}")]
    Aborted { location: String, message: String },
}

/// Errors surfaced by the viewer's public operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// Invalid pyramid parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache invariant violation
    #[error("Cache invariant violated: {0}")]
    Cache(#[from] CacheError),

    /// Scale must be finite and strictly positive
    #[error("Invalid scale {0}: must be finite and greater than zero")]
    InvalidScale(f64),

    /// A coordinate or angle was NaN or infinite
    #[error("Non-finite value for {0}")]
    NonFinite(&'static str),

    /// Viewport sides must be finite and not negative
    #[error("Invalid viewport {width}x{height}: sides must be finite and not negative")]
    InvalidViewport { width: f64, height: f64 },
}
