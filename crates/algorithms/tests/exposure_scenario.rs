//! End-to-end exposure on a synthetic equatorial region.
//!
//! Region: 1°×1° square spanning x 0..1, y -0.5..0.5 (EPSG:4326).
//! Population: constant 100 per cell at 0.1°.
//! Hazard: value 1 west of x = 0.5, dry (0) elsewhere.

use approx::assert_relative_eq;
use floodrisk_algorithms::prelude::*;
use floodrisk_algorithms::exposure::{FLOOD_DEPTH_FIELD, POPULATION_FIELD, POP_EST_FIELD};
use geo::{point, polygon, Geometry, MultiPolygon};

const CELL: f64 = 0.1;
/// Approximate km per degree at the equator
const KM_PER_DEG_LON: f64 = 111.32;
const KM_PER_DEG_LAT: f64 = 110.57;

fn grid(value_at: impl Fn(usize, usize) -> f64) -> Raster<f64> {
    // 30×30 cells covering x -1..2, y -1.5..1.5
    let mut r = Raster::new(30, 30);
    r.set_transform(GeoTransform::new(-1.0, 1.5, CELL, -CELL));
    r.set_crs(Some(CRS::wgs84()));
    r.set_nodata(Some(255.0));
    for row in 0..30 {
        for col in 0..30 {
            r.set(row, col, value_at(row, col)).unwrap();
        }
    }
    r
}

fn region() -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: 0.0, y: -0.5),
        (x: 1.0, y: -0.5),
        (x: 1.0, y: 0.5),
        (x: 0.0, y: 0.5),
    ]])
}

/// Population ∩ hazard records and the population vector, both in EPSG:3857
fn exposure_layers() -> (FeatureCollection, FeatureCollection) {
    let wgs84 = CRS::wgs84();
    let population = grid(|_, _| 100.0);
    // Cell centres at x = -0.95 + 0.1 * col; col < 15 is west of 0.5
    let hazard = grid(|_, col| if col < 15 { 1.0 } else { 0.0 });

    let pop_clip = clip(&population, &region(), Some(&wgs84)).unwrap();
    let haz_clip = clip(&hazard, &region(), Some(&wgs84)).unwrap();
    assert_eq!(pop_clip.shape(), (10, 10));

    let pop_vec = vectorize_to_features(&pop_clip, "value").unwrap();
    let haz_vec = vectorize_to_features(&haz_clip, "value").unwrap();
    assert_eq!(pop_vec.len(), 1);
    assert_eq!(haz_vec.len(), 1);

    let metric = CRS::web_mercator();
    let pop_m = reproject_collection(&pop_vec, "population", &metric).unwrap();
    let haz_m = reproject_collection(&haz_vec, "hazard", &metric).unwrap();

    let mut overlay = intersect_named(&pop_m, "population", &haz_m, "hazard").unwrap();
    annotate_exposure(&mut overlay).unwrap();
    (overlay, pop_m)
}

#[test]
fn western_half_exposure() {
    let (overlay, _) = exposure_layers();
    assert_eq!(overlay.len(), 1);
    let record = &overlay.features[0];
    assert_eq!(record.get_f64(POPULATION_FIELD), Some(100.0));
    assert_eq!(record.get_f64(FLOOD_DEPTH_FIELD), Some(1.0));

    let west_half_km2 = 0.5 * KM_PER_DEG_LON * 1.0 * KM_PER_DEG_LAT;
    let cell_km2 = CELL * KM_PER_DEG_LON * CELL * KM_PER_DEG_LAT;
    let pop_est = record.get_f64(POP_EST_FIELD).unwrap();

    assert!(
        (pop_est - 100.0 * west_half_km2).abs() <= 100.0 * cell_km2,
        "pop_est {} vs expected {}",
        pop_est,
        100.0 * west_half_km2
    );
    assert_relative_eq!(
        pop_est,
        exposed_population(100.0, exposed_area_km2(&record.geometry)),
        epsilon = 1e-6
    );
}

#[test]
fn region_summary_with_wealth() {
    let (overlay, population) = exposure_layers();

    // Three samples in the flooded half, one in the dry half
    let wealth = FeatureCollection::from_features(
        vec![
            Feature::new(point!(x: 0.1, y: 0.0)).with_property("rwi", 10.0),
            Feature::new(point!(x: 0.2, y: 0.2)).with_property("rwi", 20.0),
            Feature::new(point!(x: 0.3, y: -0.3)).with_property("rwi", 30.0),
            Feature::new(point!(x: 0.8, y: 0.0)).with_property("rwi", 99.0),
        ],
        Some(CRS::wgs84()),
    );
    let wealth_m = reproject_collection(&wealth, "wealth", &CRS::web_mercator()).unwrap();
    let wealth_exposed = intersect_named(&wealth_m, "wealth", &overlay, "exposure").unwrap();
    assert_eq!(wealth_exposed.len(), 3);

    let summary = summarize_region(
        "SYN.1_1",
        &overlay,
        &population,
        Some(&wealth_exposed),
        &ExposureParams::default(),
    )
    .unwrap();
    // Half of the region is flooded
    assert_relative_eq!(
        summary.original_population,
        2.0 * summary.exposed_population,
        max_relative = 1e-6
    );
    assert!(!summary.exceeds_baseline());

    let stats = summary.wealth.unwrap();
    assert_relative_eq!(stats.mean, 20.0);
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.max, 30.0);
}

#[test]
fn clip_then_vectorize_matches_mask() {
    let raster = grid(|_, _| 7.0);
    let mask = MultiPolygon::new(vec![polygon![
        (x: -0.5, y: -1.0),
        (x: 1.2, y: -1.0),
        (x: 1.2, y: 0.3),
        (x: -0.5, y: 0.3),
    ]]);
    let clipped = clip(&raster, &mask, Some(&CRS::wgs84())).unwrap();
    let polygons = vectorize(&clipped).unwrap();

    assert_eq!(polygons.len(), 1);
    let (polygon, value) = &polygons[0];
    assert_eq!(*value, 7.0);

    let mask_area = 1.7 * 1.3;
    let perimeter = 2.0 * (1.7 + 1.3);
    let got = area(&Geometry::Polygon(polygon.clone()));
    assert!((got - mask_area).abs() <= perimeter * CELL);
}
