// src/paint/mod.rs
//! Paint-to-placement: a canvas the player paints before entering a level,
//! and the pipeline that turns each stroke into props.

pub mod apply;
pub mod canvas;
pub mod convert;
pub mod session;

pub use apply::{generate_props_from_placements, LinePlacements, LineToPlacementMapping};
pub use canvas::{CategoryBudget, PaintBudgets, PaintCanvas, PaintLine};
pub use convert::{convert_line, max_placeable_count, point_at_distance, polyline_length, saturated_count, PlacementRequest};
pub use session::{PaintSession, PaintSummary};
