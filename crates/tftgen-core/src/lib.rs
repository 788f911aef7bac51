//! # tftgen Core
//!
//! Layout kernel for thin-film transistor test masks. Provides:
//! - Geometric primitives (rectangles, polygons, paths)
//! - Hierarchical cells with ports and placed instances
//! - Placement and alignment helpers
//! - Generic parametric components and Manhattan routing
//! - A cell library with dependency ordering
//! - R-tree spatial indexing for rule checks

pub mod align;
pub mod cell;
pub mod components;
pub mod cross_section;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod library;
pub mod routing;
pub mod spatial;

pub use align::{AlignMode, Placeable};
pub use cell::{cell_name, Cell, CellId, CellInstance, Port, Transform};
pub use cross_section::CrossSection;
pub use error::{LayoutError, Result};
pub use geometry::{BBox, GeomPrimitive, Path, Point, Polygon, Rect};
pub use layer::{Layer, LayerId, LayerStack};
pub use library::Library;
pub use spatial::{SpatialEntry, SpatialIndex};
