//! Area and population estimates for exposure polygons

use crate::vector::area_km2;
use floodrisk_core::{Error, FeatureCollection, Result};
use geo::Geometry;

/// Population density carried from the population layer
pub const POPULATION_FIELD: &str = "population";
/// Hazard value carried from the hazard layer
pub const FLOOD_DEPTH_FIELD: &str = "flood_depth";
/// Exposed area in km²
pub const AREA_FIELD: &str = "area_km2";
/// Estimated exposed population
pub const POP_EST_FIELD: &str = "pop_est";

/// Area of an exposure polygon in km². The geometry must be in metres.
pub fn exposed_area_km2(geometry: &Geometry<f64>) -> f64 {
    area_km2(geometry)
}

/// Density × area estimate of the people living on `area_km2`
pub fn exposed_population(density: f64, area_km2: f64) -> f64 {
    density * area_km2
}

/// Turn a population ∩ hazard overlay into exposure records.
///
/// `value_1` (population) and `value_2` (hazard) are renamed to
/// `population` and `flood_depth`, then `area_km2` and `pop_est` are
/// added to every feature. The layer must be in a projected CRS.
pub fn annotate_exposure(fc: &mut FeatureCollection) -> Result<()> {
    require_metric(fc, "exposure")?;

    for (i, feature) in fc.features.iter_mut().enumerate() {
        feature.rename_property("value_1", POPULATION_FIELD);
        feature.rename_property("value_2", FLOOD_DEPTH_FIELD);

        let density = feature
            .get_f64(POPULATION_FIELD)
            .ok_or_else(|| Error::InvalidParameter {
                name: "population",
                value: "missing".into(),
                reason: format!("exposure feature {} has no numeric population", i),
            })?;
        let area = exposed_area_km2(&feature.geometry);
        feature.set_property(AREA_FIELD, area);
        feature.set_property(POP_EST_FIELD, exposed_population(density, area));
    }
    Ok(())
}

/// Density × area total of a population vector.
///
/// Same basis as the `pop_est` of [`annotate_exposure`], so the exposed
/// estimate of a region can be compared against it. Features without a
/// numeric `attribute` count for nothing. The layer must be in a
/// projected CRS.
pub fn population_baseline(fc: &FeatureCollection, attribute: &str) -> Result<f64> {
    require_metric(fc, "population")?;
    Ok(fc
        .iter()
        .filter_map(|f| {
            f.get_f64(attribute)
                .map(|density| exposed_population(density, exposed_area_km2(&f.geometry)))
        })
        .sum())
}

fn require_metric(fc: &FeatureCollection, layer: &str) -> Result<()> {
    let crs = fc.require_crs(layer)?;
    if crs.is_geographic() {
        return Err(Error::InvalidParameter {
            name: "crs",
            value: crs.identifier(),
            reason: format!("{} areas need a projected CRS in metres", layer),
        });
    }
    Ok(())
}
