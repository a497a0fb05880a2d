//! Synthetic country `SYN` on the equator.
//!
//! Regions (admin level 1, EPSG:4326):
//! - `SYN.1_1`: x 0..1, y -0.5..0.5, flooded west of x = 0.5
//! - `SYN.2_1`: x 1..2, y -0.5..0.5, dry
//! - `SYN.3_1`: x 5..6, outside every raster
//!
//! Rasters are 30×30 cells of 0.1° covering x -1..2, y -1.5..1.5, with
//! a constant population of 100 per cell.

#![allow(dead_code)]

use floodrisk_core::io::write_geojson_to_bytes;
use floodrisk_core::{Feature, FeatureCollection, GeoTransform, Raster};
use floodrisk_pipeline::{ArtifactKey, ArtifactStore, CountryRegistry, InputPaths, PipelineConfig};
use geo::polygon;
use std::path::PathBuf;

pub const SCENARIO: &str = "rp100";
pub const POPULATION: f64 = 100.0;
/// km per degree of Web Mercator at the equator
pub const KM_PER_DEG: f64 = 111.319_490_793;

pub const COUNTRIES: &str = "\
iso3,gid_region,income_group,continent,Exclude
SYN,1,LMC,Africa,0
RCH,1,HIC,Europe,0
";

pub const WEALTH: &str = "\
longitude,latitude,rwi
0.25,0.05,10
0.35,0.25,30
0.75,0.05,50
1.5,0.05,70
";

pub fn config(base_path: impl Into<PathBuf>) -> PipelineConfig {
    PipelineConfig {
        base_path: base_path.into(),
        countries_csv: "countries.csv".into(),
        scenarios: vec![SCENARIO.into()],
        nodata: 255.0,
        metric_epsg: 3857,
        input_crs: "EPSG:4326".into(),
        simplify_tolerance: 0.01,
        skip_income_groups: vec!["HIC".into()],
        inputs: InputPaths {
            boundaries: "raw/gadm_{level}.geojson".into(),
            population: "raw/{iso3}_ppp.tif".into(),
            hazard: "raw/hazard_{scenario}.tif".into(),
            wealth: Some("raw/{iso3}_rwi.csv".into()),
            coastal_lookup: None,
        },
    }
}

pub fn registry() -> CountryRegistry {
    CountryRegistry::from_reader(COUNTRIES.as_bytes()).unwrap()
}

fn square(x0: f64, x1: f64) -> geo::Polygon<f64> {
    polygon![(x: x0, y: -0.5), (x: x1, y: -0.5), (x: x1, y: 0.5), (x: x0, y: 0.5)]
}

fn grid(value_at: impl Fn(usize) -> f64) -> Raster<f64> {
    // Raw rasters carry no sentinel or CRS; the runner assigns both
    let mut r = Raster::new(30, 30);
    r.set_transform(GeoTransform::new(-1.0, 1.5, 0.1, -0.1));
    for row in 0..30 {
        for col in 0..30 {
            r.set(row, col, value_at(col)).unwrap();
        }
    }
    r
}

/// Write the raw inputs of `SYN` into a store
pub fn seed<S: ArtifactStore>(store: &mut S) {
    let country = Feature::new(square(0.0, 6.0)).with_property("GID_0", "SYN");
    let regions: Vec<Feature> = [("SYN.1_1", 0.0, 1.0), ("SYN.2_1", 1.0, 2.0), ("SYN.3_1", 5.0, 6.0)]
        .into_iter()
        .map(|(gid, x0, x1)| {
            Feature::new(square(x0, x1))
                .with_property("GID_0", "SYN")
                .with_property("GID_1", gid)
        })
        .collect();

    for (level, features) in [(0u8, vec![country]), (1, regions)] {
        let fc = FeatureCollection::from_features(features, None);
        store
            .write_bytes(
                &ArtifactKey::RawBoundaries { level },
                &write_geojson_to_bytes(&fc).unwrap(),
            )
            .unwrap();
    }

    store
        .write_raster(&ArtifactKey::RawPopulation { iso3: "SYN".into() }, &grid(|_| POPULATION))
        .unwrap();
    // Cell centres at x = -0.95 + 0.1 * col; col < 15 is west of 0.5
    store
        .write_raster(
            &ArtifactKey::RawHazard { scenario: SCENARIO.into() },
            &grid(|col| if col < 15 { 1.0 } else { 0.0 }),
        )
        .unwrap();
    store
        .write_bytes(&ArtifactKey::RawWealth { iso3: "SYN".into() }, WEALTH.as_bytes())
        .unwrap();
}

/// Exposed population of `SYN.1_1`: half a square degree at the equator
pub fn expected_pop_est() -> f64 {
    POPULATION * 0.5 * KM_PER_DEG * KM_PER_DEG
}
