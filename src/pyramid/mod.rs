//! Multi-resolution layer model.
//!
//! # Layer Numbering
//!
//! Unlike slide formats that put full resolution at level 0, the viewer
//! counts from the coarsest layer:
//!
//! ```text
//!  layer 0        layer 1             layer N-1
//! ┌──┐          ┌────┐              ┌──────────────┐
//! └──┘          │    │     ...      │              │
//!               └────┘              │ full size    │
//!                                   └──────────────┘
//! ```
//!
//! Coarse layers are cheap to keep resident and are what the viewer falls
//! back to while sharper tiles are still loading.

mod model;
mod source;

pub use model::{Dimensions, LayerInfo, PyramidModel, MAX_RESOLUTIONS};
pub use source::{deep_zoom_resolution_count, RelightCoefficients, SourceMetadata};
