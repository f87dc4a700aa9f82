//! Command-line configuration for the headless viewer.
//!
//! Every option can also be set through an environment variable with the
//! `PV_` prefix:
//!
//! - `PV_WIDTH`, `PV_HEIGHT` - full-resolution image size (required)
//! - `PV_TILE_SIZE` - tile edge in pixels (default: 256)
//! - `PV_RESOLUTIONS` - layer count (default: derived the Deep Zoom way)
//! - `PV_TILES` - tile location: http(s) URL, directory or `s3://bucket/prefix`
//! - `PV_FORMAT` - tile file extension (default: jpg)
//! - `PV_TEMPLATE` - URL template instead of the Deep Zoom layout
//! - `PV_S3_ENDPOINT`, `PV_S3_REGION` - S3 connection
//! - `PV_VIEWPORT_WIDTH`, `PV_VIEWPORT_HEIGHT` - viewport size (default: 1024x768)
//! - `PV_LAYER`, `PV_SCALE`, `PV_ANGLE` - view
//! - `PV_LINES` - overlay lines as a JSON array of `{x1, y1, x2, y2}`
//! - `PV_RETRIES`, `PV_TIMEOUT` - load policy

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::ConfigError;
use crate::geometry::Size;
use crate::io::{DeepZoomResolver, RetryPolicy, TemplateResolver, TileUrlResolver};
use crate::pyramid::{deep_zoom_resolution_count, Dimensions, RelightCoefficients, SourceMetadata};
use crate::render::LayerLine;

// =============================================================================
// Default Values
// =============================================================================

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default tile file extension.
pub const DEFAULT_FORMAT: &str = "jpg";

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1024.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 768.0;

/// Default per-load timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Structure
// =============================================================================

/// Pyramid Viewer - headless deep-zoom tile viewer.
///
/// Fetches the tiles covering a view of a multi-resolution image and prints
/// the resulting frame.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch the tiles for one view and print the frame as JSON
    Render(RenderConfig),

    /// Print the pyramid and the tiles a view needs, without loading them
    Plan(PlanConfig),
}

// =============================================================================
// Source
// =============================================================================

/// The pyramid and where its tiles live.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Full-resolution image width in pixels.
    #[arg(long, env = "PV_WIDTH")]
    pub width: u32,

    /// Full-resolution image height in pixels.
    #[arg(long, env = "PV_HEIGHT")]
    pub height: u32,

    /// Tile edge in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "PV_TILE_SIZE")]
    pub tile_size: u32,

    /// Number of layers. Defaults to ceil(log2(max(width, height))).
    #[arg(long, env = "PV_RESOLUTIONS")]
    pub resolutions: Option<u32>,

    /// Tile location: a Deep Zoom `_files/` directory or `.dzi` descriptor,
    /// as an http(s) URL, a local path or `s3://bucket/prefix`.
    #[arg(long, env = "PV_TILES")]
    pub tiles: String,

    /// Tile file extension.
    #[arg(long, default_value = DEFAULT_FORMAT, env = "PV_FORMAT")]
    pub format: String,

    /// Location template with `{layer}`, `{col}`, `{row}`, `{kind}` and
    /// `{kind_name}` placeholders. Replaces the Deep Zoom layout.
    #[arg(long, env = "PV_TEMPLATE")]
    pub template: Option<String>,

    // =========================================================================
    // Relighting
    // =========================================================================
    /// Render in relighting (RTI) mode.
    #[arg(long, default_value_t = false, env = "PV_RTI")]
    pub rti: bool,

    /// Six comma-separated coefficient scales: H then L.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, env = "PV_RTI_SCALE")]
    pub rti_scale: Vec<f32>,

    /// Six comma-separated coefficient offsets in byte units: H then L.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, env = "PV_RTI_OFFSET")]
    pub rti_offset: Vec<f32>,

    /// Deep Zoom `_files/` directory of the high (H) coefficient images.
    #[arg(long, env = "PV_HIGH_TILES")]
    pub high_tiles: Option<String>,

    /// Deep Zoom `_files/` directory of the low (L) coefficient images.
    #[arg(long, env = "PV_LOW_TILES")]
    pub low_tiles: Option<String>,
}

impl SourceArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("width and height must be greater than 0".to_string());
        }
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.resolutions == Some(0) {
            return Err("resolutions must be greater than 0".to_string());
        }
        if self.tiles.is_empty() {
            return Err("Tile location is required. Set --tiles or PV_TILES".to_string());
        }
        if self.rti {
            self.relight().map_err(|e| e.to_string())?;
            if self.high_tiles.is_some() != self.low_tiles.is_some() {
                return Err("--high-tiles and --low-tiles must be given together".to_string());
            }
        }
        Ok(())
    }

    fn relight(&self) -> Result<Option<RelightCoefficients>, ConfigError> {
        if !self.rti {
            return Ok(None);
        }
        RelightCoefficients::from_arrays(&self.rti_scale, &self.rti_offset).map(Some)
    }

    /// Pyramid parameters for the viewer.
    pub fn metadata(&self) -> Result<SourceMetadata, ConfigError> {
        let resolutions = self
            .resolutions
            .unwrap_or_else(|| deep_zoom_resolution_count(self.width, self.height));

        let mut metadata = SourceMetadata::new(
            Dimensions::new(self.width, self.height),
            Dimensions::new(self.tile_size, self.tile_size),
            resolutions,
        );
        if let Some(relight) = self.relight()? {
            metadata = metadata.with_relight(relight);
        }
        Ok(metadata)
    }

    /// Resolver for tile locations.
    pub fn resolver(&self) -> Box<dyn TileUrlResolver> {
        if let Some(template) = &self.template {
            return Box::new(TemplateResolver::new(template.clone()));
        }

        let resolver = if self.tiles.ends_with(".dzi") || self.tiles.ends_with(".xml") {
            DeepZoomResolver::from_descriptor(&self.tiles, self.format.clone())
        } else {
            DeepZoomResolver::new(self.tiles.clone(), self.format.clone())
        };

        match (&self.high_tiles, &self.low_tiles) {
            (Some(high), Some(low)) => Box::new(resolver.with_coefficients(high, low)),
            _ => Box::new(resolver),
        }
    }
}

// =============================================================================
// View
// =============================================================================

/// Viewport and camera.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Viewport width in screen pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH, env = "PV_VIEWPORT_WIDTH")]
    pub viewport_width: f64,

    /// Viewport height in screen pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT, env = "PV_VIEWPORT_HEIGHT")]
    pub viewport_height: f64,

    /// Layer to display (0 = coarsest). Clamped to the pyramid.
    #[arg(long, allow_hyphen_values = true, env = "PV_LAYER")]
    pub layer: Option<i64>,

    /// Layer x coordinate to centre on. Defaults to the layer centre.
    #[arg(long, allow_hyphen_values = true)]
    pub origin_x: Option<f64>,

    /// Layer y coordinate to centre on. Defaults to the layer centre.
    #[arg(long, allow_hyphen_values = true)]
    pub origin_y: Option<f64>,

    /// Layer pixels per screen pixel.
    #[arg(long, default_value_t = 1.0, env = "PV_SCALE")]
    pub scale: f64,

    /// Rotation in degrees, positive is counter-clockwise.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true, env = "PV_ANGLE")]
    pub angle: f64,

    /// Light position x in [-1, 1] (relighting mode).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub light_x: f64,

    /// Light position y in [-1, 1] (relighting mode).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub light_y: f64,

    /// Overlay lines in layer coordinates, as a JSON array of
    /// `{"x1": .., "y1": .., "x2": .., "y2": ..}` objects.
    #[arg(long, env = "PV_LINES")]
    pub lines: Option<String>,
}

impl ViewArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !self.viewport_width.is_finite() || !self.viewport_height.is_finite() {
            return Err("viewport size must be finite".to_string());
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err("viewport size must be greater than 0".to_string());
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be a finite number greater than 0".to_string());
        }
        if !self.angle.is_finite() {
            return Err("angle must be finite".to_string());
        }
        if !(-1.0..=1.0).contains(&self.light_x) || !(-1.0..=1.0).contains(&self.light_y) {
            return Err("light position must be within [-1, 1]".to_string());
        }
        self.overlay_lines()?;
        Ok(())
    }

    /// Parse `--lines`. No option means no overlay.
    pub fn overlay_lines(&self) -> Result<Vec<LayerLine>, String> {
        let Some(json) = &self.lines else {
            return Ok(Vec::new());
        };
        let lines: Vec<LayerLine> =
            serde_json::from_str(json).map_err(|e| format!("invalid lines: {}", e))?;

        let finite = |l: &LayerLine| [l.x1, l.y1, l.x2, l.y2].iter().all(|v| v.is_finite());
        if !lines.iter().all(finite) {
            return Err("line coordinates must be finite".to_string());
        }
        Ok(lines)
    }

    pub fn viewport(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Configuration for the `render` command.
#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "PV_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "PV_S3_REGION")]
    pub s3_region: String,

    /// Attempts per tile payload, including the first.
    #[arg(long, default_value_t = 1, env = "PV_RETRIES")]
    pub retries: u32,

    /// Pause between attempts, in milliseconds.
    #[arg(long, default_value_t = 0, env = "PV_RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: u64,

    /// Per-load timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "PV_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        self.view.validate()?;
        if self.retries == 0 {
            return Err("retries must be at least 1".to_string());
        }
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, Duration::from_millis(self.retry_backoff_ms))
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Configuration for the `plan` command.
#[derive(Args, Debug, Clone)]
pub struct PlanConfig {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub view: ViewArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl PlanConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        self.view.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
