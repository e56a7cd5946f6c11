//! Per-frame cell geometry.

mod cell_frame;
mod polygon;
mod rect;

pub use cell_frame::{BoundingBox, CellFrame, CellLookup, MIN_OUTLINE_POINTS};
pub use polygon::{Polygon, first_containing};
pub use rect::Rect;

/// Integer `(x, y)` pixel coordinate.
pub type Pixel = (i32, i32);

/// Sub-pixel `(x, y)` point, e.g. a tracker box center.
pub type Center = (f32, f32);
