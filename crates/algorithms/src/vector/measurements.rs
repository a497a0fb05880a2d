//! Geometric measurements: area and polygonal views

use geo::{Area as GeoArea, Geometry, MultiPolygon};

/// Square metres per square kilometre
pub const M2_PER_KM2: f64 = 1.0e6;

/// Calculate the area of a geometry.
///
/// Returns unsigned area in CRS units squared (square degrees for a
/// geographic CRS; project to a metric CRS for square metres).
/// Non-areal geometries have zero area.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Area in square kilometres of a geometry in a metre-based CRS
pub fn area_km2(geom: &Geometry<f64>) -> f64 {
    area(geom) / M2_PER_KM2
}

/// Polygonal view of a geometry, `None` for points and lines.
pub fn as_multipolygon(geom: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        _ => None,
    }
}

/// Collapse a single-part multipolygon back to a polygon
pub fn simplest_polygonal(mp: MultiPolygon<f64>) -> Geometry<f64> {
    let mut parts = mp.0;
    if parts.len() == 1 {
        if let Some(p) = parts.pop() {
            return Geometry::Polygon(p);
        }
    }
    Geometry::MultiPolygon(MultiPolygon::new(parts))
}
