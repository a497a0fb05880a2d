//! Boundary cleaning: topology-preserving simplification followed by
//! removal of tiny sub-polygons.
//!
//! Administrative boundaries arrive with far more vertices than a
//! country-scale analysis needs, and with slivers and islets that only
//! add overlay cost. Cleaning works in the units of the boundary CRS
//! (degrees for the raw data), so the thresholds below are squared
//! degrees.

use crate::vector::measurements::area;
use crate::vector::spatial::BoundingBox;
use floodrisk_core::{Algorithm, Error, Result};
use geo::{
    Area, Geometry, Intersects, Line, LineString, MultiPolygon, Polygon, RemoveRepeatedPoints,
    Simplify,
};
use rstar::RTree;

/// Countries whose fragmented coastlines get the large-country cut.
pub const LARGE_COUNTRIES: [&str; 6] = ["CHL", "IDN", "RUS", "GRL", "CAN", "USA"];

/// Area thresholds for small-shape removal, in squared CRS units
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeThresholds {
    /// Multipolygons smaller than this in total are left whole
    pub min_total_area: f64,
    /// Per-part cut for countries in [`LARGE_COUNTRIES`]
    pub large_country: f64,
    /// Total area above which `large_area` applies
    pub large_total_area: f64,
    pub large_area: f64,
    pub default: f64,
}

impl Default for ShapeThresholds {
    fn default() -> Self {
        Self {
            min_total_area: 0.003,
            large_country: 0.01,
            large_total_area: 50.0,
            large_area: 0.1,
            default: 0.001,
        }
    }
}

impl ShapeThresholds {
    /// Per-part threshold for a multipolygon, `None` when it is left whole.
    ///
    /// Membership in the large-country set wins over the total-area rule.
    pub fn part_threshold(&self, total_area: f64, country: &str) -> Option<f64> {
        if total_area < self.min_total_area {
            None
        } else if LARGE_COUNTRIES.contains(&country) {
            Some(self.large_country)
        } else if total_area > self.large_total_area {
            Some(self.large_area)
        } else {
            Some(self.default)
        }
    }
}

/// Parameters for boundary cleaning
#[derive(Debug, Clone)]
pub struct CleanParams {
    /// ISO3 code selecting the threshold policy
    pub country: String,
    /// Douglas-Peucker tolerance in CRS units
    pub tolerance: f64,
    pub thresholds: ShapeThresholds,
}

impl Default for CleanParams {
    fn default() -> Self {
        Self {
            country: String::new(),
            tolerance: 0.01,
            thresholds: ShapeThresholds::default(),
        }
    }
}

impl CleanParams {
    pub fn for_country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Default::default()
        }
    }
}

/// Boundary cleaning algorithm
#[derive(Debug, Clone, Default)]
pub struct GeometryCleaner;

impl Algorithm for GeometryCleaner {
    type Input = Geometry<f64>;
    type Output = Geometry<f64>;
    type Params = CleanParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Geometry Cleaner"
    }

    fn description(&self) -> &'static str {
        "Topology-preserving simplification and small sub-polygon removal"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clean(&input, &params)
    }
}

/// Clean a boundary geometry.
///
/// Rejects input with self-intersecting rings. Polygons are simplified but
/// never subdivided; a multipolygon may come back empty when every part
/// falls under the threshold.
pub fn clean(geom: &Geometry<f64>, params: &CleanParams) -> Result<Geometry<f64>> {
    validate(geom)?;
    let simplified = simplify_preserve_topology(geom, params.tolerance);
    Ok(remove_small_shapes(&simplified, &params.country, &params.thresholds))
}

/// Drop sub-polygons whose area does not exceed the country's threshold.
///
/// Single polygons and non-polygonal geometries are returned unchanged.
pub fn remove_small_shapes(
    geom: &Geometry<f64>,
    country: &str,
    thresholds: &ShapeThresholds,
) -> Geometry<f64> {
    let Geometry::MultiPolygon(mp) = geom else {
        return geom.clone();
    };

    let Some(threshold) = thresholds.part_threshold(mp.unsigned_area(), country) else {
        return geom.clone();
    };

    let kept: Vec<Polygon<f64>> = mp
        .iter()
        .filter(|p| p.unsigned_area() > threshold)
        .cloned()
        .collect();
    Geometry::MultiPolygon(MultiPolygon::new(kept))
}

/// Douglas-Peucker per ring, keeping a ring's original vertices whenever
/// its simplified form would collapse or self-intersect, and the whole
/// polygon's when a simplified hole would cross the simplified shell.
pub fn simplify_preserve_topology(geom: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if tolerance <= 0.0 {
        return geom.clone();
    }
    match geom {
        Geometry::Polygon(p) => Geometry::Polygon(simplify_polygon(p, tolerance)),
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.iter().map(|p| simplify_polygon(p, tolerance)).collect(),
        )),
        other => other.clone(),
    }
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let exterior = simplify_ring(polygon.exterior(), tolerance);
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| simplify_ring(ring, tolerance))
        .collect();

    if interiors.iter().any(|hole| hole.intersects(&exterior)) {
        return polygon.clone();
    }
    Polygon::new(exterior, interiors)
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let simplified = ring.simplify(&tolerance);
    if simplified.0.len() < 4 || !ring_is_simple(&simplified) {
        return ring.clone();
    }
    simplified
}

fn validate(geom: &Geometry<f64>) -> Result<()> {
    let polygons: Vec<&Polygon<f64>> = match geom {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.iter().collect(),
        _ => return Ok(()),
    };
    for (i, p) in polygons.iter().enumerate() {
        for ring in std::iter::once(p.exterior()).chain(p.interiors()) {
            if !ring_is_simple(ring) {
                return Err(Error::InvalidGeometry(format!(
                    "ring of part {} self-intersects",
                    i
                )));
            }
        }
    }
    Ok(())
}

// ─── Ring validity ──────────────────────────────────────────────────────

/// A closed ring is simple when non-adjacent edges never meet and
/// adjacent edges share only their common vertex.
pub fn ring_is_simple(ring: &LineString<f64>) -> bool {
    let ring = ring.remove_repeated_points();
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();
    if n < 3 || area(&Geometry::Polygon(Polygon::new(ring.clone(), vec![]))) == 0.0 {
        return false;
    }

    let boxes: Vec<BoundingBox> = segments
        .iter()
        .enumerate()
        .map(|(i, l)| {
            BoundingBox::new(
                i,
                l.start.x.min(l.end.x),
                l.start.y.min(l.end.y),
                l.start.x.max(l.end.x),
                l.start.y.max(l.end.y),
            )
        })
        .collect();
    let tree = RTree::bulk_load(boxes.clone());

    for b in &boxes {
        for other in tree.locate_in_envelope_intersecting(&b.aabb()) {
            let (i, j) = (b.index, other.index);
            if j <= i {
                continue;
            }
            let (first, second) = if j == i + 1 {
                (segments[i], segments[j])
            } else if i == 0 && j == n - 1 {
                (segments[j], segments[i])
            } else {
                if segments[i].intersects(&segments[j]) {
                    return false;
                }
                continue;
            };
            if folds_back(first, second) {
                return false;
            }
        }
    }
    true
}

/// `second` starts where `first` ends; true when it doubles back along it.
fn folds_back(first: Line<f64>, second: Line<f64>) -> bool {
    let p = first.end;
    let (ax, ay) = (first.start.x - p.x, first.start.y - p.y);
    let (bx, by) = (second.end.x - p.x, second.end.y - p.y);
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    cross == 0.0 && dot > 0.0
}
