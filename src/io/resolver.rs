//! Mapping tile keys to fetchable locations.

use crate::tile::{PayloadKind, TileKey};

/// Builds the location of one payload of one tile.
///
/// The location is opaque to the viewer; it is handed unchanged to the
/// [`TileLoader`](super::TileLoader), which decides whether it is a URL, a
/// path or an object key.
pub trait TileUrlResolver: Send + Sync {
    fn resolve(&self, key: TileKey, kind: PayloadKind) -> String;
}

impl<F> TileUrlResolver for F
where
    F: Fn(TileKey, PayloadKind) -> String + Send + Sync,
{
    fn resolve(&self, key: TileKey, kind: PayloadKind) -> String {
        self(key, kind)
    }
}

// =============================================================================
// Deep Zoom
// =============================================================================

/// Resolver for the Deep Zoom `_files/` layout.
///
/// Deep Zoom numbers its levels from a 1x1 image, while the viewer's layer 0
/// is the coarsest layer it actually draws, so a tile at layer `z` lives in
/// directory `z + 1`:
///
/// ```text
/// {server}{image}_files/{z + 1}/{col}_{row}.{format}
/// ```
///
/// Relighting sources keep their coefficient images in sibling pyramids with
/// the same layout. Without coefficient bases every payload kind resolves to
/// the base pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepZoomResolver {
    base: String,
    format: String,
    high_base: Option<String>,
    low_base: Option<String>,
}

impl DeepZoomResolver {
    /// Create a resolver from a `_files/` directory location.
    ///
    /// A trailing `/` is added when missing.
    pub fn new(base: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            base: with_trailing_slash(base.into()),
            format: format.into().trim_start_matches('.').to_string(),
            high_base: None,
            low_base: None,
        }
    }

    /// Create a resolver from the location of a `.dzi` (or `.xml`) descriptor.
    ///
    /// `http://host/slides/scan.dzi` tiles live under
    /// `http://host/slides/scan_files/`.
    pub fn from_descriptor(descriptor: &str, format: impl Into<String>) -> Self {
        let stem = descriptor
            .strip_suffix(".dzi")
            .or_else(|| descriptor.strip_suffix(".xml"))
            .unwrap_or(descriptor);
        Self::new(format!("{}_files/", stem), format)
    }

    /// Set the `_files/` directories of the coefficient pyramids.
    pub fn with_coefficients(mut self, high: impl Into<String>, low: impl Into<String>) -> Self {
        self.high_base = Some(with_trailing_slash(high.into()));
        self.low_base = Some(with_trailing_slash(low.into()));
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    fn base_for(&self, kind: PayloadKind) -> &str {
        let coefficient_base = match kind {
            PayloadKind::Base => None,
            PayloadKind::HighCoefficients => self.high_base.as_deref(),
            PayloadKind::LowCoefficients => self.low_base.as_deref(),
        };
        coefficient_base.unwrap_or(&self.base)
    }
}

impl TileUrlResolver for DeepZoomResolver {
    fn resolve(&self, key: TileKey, kind: PayloadKind) -> String {
        format!(
            "{}{}/{}_{}.{}",
            self.base_for(kind),
            key.layer + 1,
            key.col,
            key.row,
            self.format
        )
    }
}

fn with_trailing_slash(mut s: String) -> String {
    if !s.is_empty() && !s.ends_with('/') {
        s.push('/');
    }
    s
}

// =============================================================================
// Templates
// =============================================================================

/// Resolver driven by a string template.
///
/// Recognised placeholders:
///
/// | Placeholder   | Value                                   |
/// |---------------|-----------------------------------------|
/// | `{layer}`     | viewer layer, 0 = coarsest              |
/// | `{col}`       | tile column                             |
/// | `{row}`       | tile row                                |
/// | `{kind}`      | payload code: 0 base, 1 low, 2 high     |
/// | `{kind_name}` | `base`, `low` or `high`                 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResolver {
    template: String,
}

impl TemplateResolver {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileUrlResolver for TemplateResolver {
    fn resolve(&self, key: TileKey, kind: PayloadKind) -> String {
        self.template
            .replace("{layer}", &key.layer.to_string())
            .replace("{col}", &key.col.to_string())
            .replace("{row}", &key.row.to_string())
            .replace("{kind_name}", &kind.to_string())
            .replace("{kind}", &kind.code().to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
