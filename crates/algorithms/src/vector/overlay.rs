//! Pairwise intersection of two vector layers
//!
//! For every pair of features whose envelopes touch, the intersection is
//! computed and kept when non-empty. Output features carry the attributes
//! of both parents. A name present on both sides is split into
//! `<name>_1` (first layer) and `<name>_2` (second layer).
//!
//! Polygon × polygon pairs yield the polygonal intersection, discarding
//! zero-area results. Point × polygon pairs (in either order) yield the
//! point when it lies in or on the polygon, which is how wealth samples
//! are attributed to exposure polygons.

use crate::vector::measurements::{as_multipolygon, simplest_polygonal};
use crate::vector::spatial::{bounding_box, SpatialIndex};
use floodrisk_core::crs::require_same;
use floodrisk_core::vector::Properties;
use floodrisk_core::{Algorithm, Error, Feature, FeatureCollection, Result};
use geo::{Area, BooleanOps, Geometry, Intersects, MultiPolygon, Point};

/// Suffix for a colliding attribute from the first layer
pub const LEFT_SUFFIX: &str = "_1";
/// Suffix for a colliding attribute from the second layer
pub const RIGHT_SUFFIX: &str = "_2";

/// Names used in log and error messages for the two inputs
#[derive(Debug, Clone)]
pub struct OverlayParams {
    pub left_name: String,
    pub right_name: String,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            left_name: "left".to_string(),
            right_name: "right".to_string(),
        }
    }
}

/// Layer intersection algorithm
#[derive(Debug, Clone, Default)]
pub struct OverlayEngine;

impl Algorithm for OverlayEngine {
    type Input = (FeatureCollection, FeatureCollection);
    type Output = FeatureCollection;
    type Params = OverlayParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Overlay Engine"
    }

    fn description(&self) -> &'static str {
        "Intersect two layers, merging attributes with _1/_2 suffixes on collision"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        intersect_named(&input.0, &params.left_name, &input.1, &params.right_name)
    }
}

/// Intersect two layers in the same CRS.
pub fn intersect(left: &FeatureCollection, right: &FeatureCollection) -> Result<FeatureCollection> {
    intersect_named(left, "left", right, "right")
}

/// [`intersect`] with layer names for error reporting.
///
/// Both layers must carry a CRS and agree on it.
pub fn intersect_named(
    left: &FeatureCollection,
    left_name: &str,
    right: &FeatureCollection,
    right_name: &str,
) -> Result<FeatureCollection> {
    let crs = require_same(left_name, left.crs.as_ref(), right_name, right.crs.as_ref())?;
    let mut out = FeatureCollection::with_crs(crs);

    if left.is_empty() || right.is_empty() {
        return Ok(out);
    }

    let index = SpatialIndex::build(right.iter().map(|f| &f.geometry));

    for a in left.iter() {
        let Some(bbox) = bounding_box(0, &a.geometry) else {
            continue;
        };
        for j in index.candidates(&bbox) {
            let b = &right.features[j];
            if let Some(geometry) = intersect_geometries(&a.geometry, &b.geometry) {
                out.push(Feature {
                    geometry,
                    properties: merge_properties(&a.properties, &b.properties),
                });
            }
        }
    }

    tracing::debug!(
        left = left_name,
        right = right_name,
        left_features = left.len(),
        right_features = right.len(),
        output = out.len(),
        "overlay complete"
    );
    Ok(out)
}

/// Attributes of both parents, suffixing names that appear on both sides.
pub fn merge_properties(left: &Properties, right: &Properties) -> Properties {
    let mut merged = Properties::new();
    for (k, v) in left {
        let key = if right.contains_key(k) {
            format!("{}{}", k, LEFT_SUFFIX)
        } else {
            k.clone()
        };
        merged.insert(key, v.clone());
    }
    for (k, v) in right {
        let key = if left.contains_key(k) {
            format!("{}{}", k, RIGHT_SUFFIX)
        } else {
            k.clone()
        };
        merged.insert(key, v.clone());
    }
    merged
}

fn polygonal_intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let result = a.intersection(b);
    let parts: Vec<_> = result
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(simplest_polygonal(MultiPolygon::new(parts)))
    }
}

fn point_in(point: &Point<f64>, polygonal: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    polygonal
        .intersects(point)
        .then(|| Geometry::Point(*point))
}

fn intersect_geometries(a: &Geometry<f64>, b: &Geometry<f64>) -> Option<Geometry<f64>> {
    match (a, b) {
        (Geometry::Point(p), other) | (other, Geometry::Point(p)) => {
            as_multipolygon(other).and_then(|mp| point_in(p, &mp))
        }
        _ => {
            let (ma, mb) = (as_multipolygon(a)?, as_multipolygon(b)?);
            polygonal_intersection(&ma, &mb)
        }
    }
}
