//! Vector analysis algorithms
//!
//! - Clean: simplify boundaries and drop tiny sub-polygons
//! - Overlay: pairwise layer intersection with attribute merging
//! - Area measurements and polygonal views
//! - Envelope index for candidate pair search

mod clean;
mod measurements;
mod overlay;
mod spatial;

pub use clean::{
    clean, remove_small_shapes, ring_is_simple, simplify_preserve_topology, CleanParams,
    GeometryCleaner, ShapeThresholds, LARGE_COUNTRIES,
};
pub use measurements::{area, area_km2, as_multipolygon, simplest_polygonal, M2_PER_KM2};
pub use overlay::{
    intersect, intersect_named, merge_properties, OverlayEngine, OverlayParams, LEFT_SUFFIX,
    RIGHT_SUFFIX,
};
pub use spatial::{bounding_box, BoundingBox, SpatialIndex};
