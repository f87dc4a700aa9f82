//! Screen and layer geometry.
//!
//! The viewer works in two coordinate spaces:
//!
//! - **Screen space**: viewport pixels, origin at the top-left of the canvas
//! - **Layer space**: pixels of the pyramid layer currently on display
//!
//! [`ViewState`] holds the pan offset, scale and rotation that relate the
//! two, and exposes the point and rectangle transforms the rest of the crate
//! uses to decide which tiles are visible and where to draw them.

mod transform;

pub use transform::{normalise_rect, transform_rect, Point, Rect, Size, ViewState};
