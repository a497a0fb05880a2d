//! Exposure statistics
//!
//! Exposed population is estimated as density × area over the
//! population ∩ hazard overlay. The original population of a region is
//! the same density × area total taken over its whole population vector
//! and serves as a baseline: an estimate above it is reported, never
//! corrected.

mod population;
mod wealth;

pub use population::{
    annotate_exposure, exposed_area_km2, exposed_population, population_baseline, AREA_FIELD,
    FLOOD_DEPTH_FIELD, POPULATION_FIELD, POP_EST_FIELD,
};
pub use wealth::{layer_wealth_stats, wealth_stats, WealthStats};

use floodrisk_core::{Algorithm, Error, FeatureCollection, Result};

/// Per-region aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct RegionExposure {
    pub region_id: String,
    pub exposed_population: f64,
    pub original_population: f64,
    pub exposed_area_km2: f64,
    /// `None` when no wealth sample falls in the exposed area
    pub wealth: Option<WealthStats>,
}

impl RegionExposure {
    /// Estimate above the region's baseline population
    pub fn exceeds_baseline(&self) -> bool {
        self.exposed_population > self.original_population
    }
}

/// Attribute names read by [`summarize_region`]
#[derive(Debug, Clone)]
pub struct ExposureParams {
    /// Density attribute of the population vector
    pub baseline_attribute: String,
    /// Wealth index attribute of the wealth samples
    pub wealth_attribute: String,
}

impl Default for ExposureParams {
    fn default() -> Self {
        Self {
            baseline_attribute: "value".to_string(),
            wealth_attribute: "rwi".to_string(),
        }
    }
}

/// Layers describing one region
#[derive(Debug, Clone)]
pub struct RegionLayers {
    pub region_id: String,
    /// Annotated population ∩ hazard records
    pub exposure: FeatureCollection,
    /// Population vector of the whole region
    pub population: FeatureCollection,
    /// Wealth samples intersected with the exposure records
    pub wealth: Option<FeatureCollection>,
}

/// Region exposure aggregation
#[derive(Debug, Clone, Default)]
pub struct ExposureCalculator;

impl Algorithm for ExposureCalculator {
    type Input = RegionLayers;
    type Output = RegionExposure;
    type Params = ExposureParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Exposure Calculator"
    }

    fn description(&self) -> &'static str {
        "Aggregate exposed population, area and wealth statistics for a region"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        summarize_region(
            &input.region_id,
            &input.exposure,
            &input.population,
            input.wealth.as_ref(),
            &params,
        )
    }
}

/// Aggregate one region.
///
/// `exposure` must already carry `pop_est` and `area_km2`
/// (see [`annotate_exposure`]); `population` must be in a projected CRS.
pub fn summarize_region(
    region_id: &str,
    exposure: &FeatureCollection,
    population: &FeatureCollection,
    wealth: Option<&FeatureCollection>,
    params: &ExposureParams,
) -> Result<RegionExposure> {
    let summary = RegionExposure {
        region_id: region_id.to_string(),
        exposed_population: exposure.sum_attribute(POP_EST_FIELD),
        original_population: population_baseline(population, &params.baseline_attribute)?,
        exposed_area_km2: exposure.sum_attribute(AREA_FIELD),
        wealth: wealth.and_then(|w| layer_wealth_stats(w, &params.wealth_attribute)),
    };

    if summary.exceeds_baseline() {
        tracing::warn!(
            region = region_id,
            exposed = summary.exposed_population,
            baseline = summary.original_population,
            "exposed population estimate exceeds the region baseline"
        );
    }
    Ok(summary)
}
