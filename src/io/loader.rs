use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageReader, RgbaImage};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::pyramid::Dimensions;
use crate::tile::{PayloadKind, Texture, TileKey};

/// One payload to fetch and decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Tile the payload belongs to
    pub key: TileKey,

    /// Which image of the tile this is
    pub kind: PayloadKind,

    /// Location produced by the URL resolver
    pub location: String,

    /// Nominal tile size; decoded images are padded or cropped to it
    pub tile_size: Dimensions,
}

/// Trait for fetching and decoding tile payloads.
///
/// Implementations must be thread-safe: every load runs on its own task.
/// A failed load is reported once and never retried here; see
/// [`RetryingLoader`] for a retry policy.
#[async_trait]
pub trait TileLoader: Send + Sync {
    /// Fetch the payload described by `request` and decode it.
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError>;
}

#[async_trait]
impl<L: TileLoader + ?Sized> TileLoader for Arc<L> {
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError> {
        (**self).load(request).await
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode an encoded tile into an RGBA texture of exactly `tile_size`.
///
/// Edge tiles are often smaller than the nominal tile size and some servers
/// add overlap pixels, so the decoded image is copied onto a canvas of the
/// nominal size: short tiles are padded with transparent pixels, overlap is
/// cropped away.
pub fn decode_tile(
    data: &[u8],
    location: &str,
    tile_size: Dimensions,
) -> Result<Texture, LoadError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| LoadError::Decode {
            url: location.to_string(),
            message: e.to_string(),
        })?;

    let img = reader
        .decode()
        .map_err(|e| LoadError::Decode {
            url: location.to_string(),
            message: e.to_string(),
        })?
        .to_rgba8();

    if img.width() == tile_size.width && img.height() == tile_size.height {
        return Ok(Arc::new(img));
    }

    debug!(
        location,
        width = img.width(),
        height = img.height(),
        "resizing tile canvas to nominal tile size"
    );
    let mut canvas = RgbaImage::new(tile_size.width, tile_size.height);
    image::imageops::replace(&mut canvas, &img, 0, 0);
    Ok(Arc::new(canvas))
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Default number of attempts per payload: one, i.e. no retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// How often a failed load is attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per payload, including the first
    pub max_attempts: u32,

    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Loader wrapper that retries failed loads.
///
/// Not-found errors are returned immediately; retrying cannot fix them.
pub struct RetryingLoader<L> {
    inner: L,
    policy: RetryPolicy,
}

impl<L: TileLoader> RetryingLoader<L> {
    pub fn new(inner: L, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

#[async_trait]
impl<L: TileLoader> TileLoader for RetryingLoader<L> {
    async fn load(&self, request: &LoadRequest) -> Result<Texture, LoadError> {
        let mut attempt = 1;
        loop {
            match self.inner.load(request).await {
                Ok(texture) => return Ok(texture),
                Err(e @ LoadError::NotFound(_)) => return Err(e),
                Err(e) if attempt >= self.policy.max_attempts => return Err(e),
                Err(e) => {
                    warn!(
                        key = %request.key,
                        kind = %request.kind,
                        attempt,
                        error = %e,
                        "tile load failed, retrying"
                    );
                    attempt += 1;
                    if !self.policy.backoff.is_zero() {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
