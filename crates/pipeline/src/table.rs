//! Per-region statistics rows

use crate::error::{PipelineError, Result};
use crate::registry::CountryRecord;
use floodrisk_algorithms::exposure::RegionExposure;
use serde::{Deserialize, Serialize};

/// One row of a country table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRow {
    pub iso3: String,
    pub gid_id: String,
    /// Estimated exposed population
    pub pop_est: f64,
    /// Population baseline of the region
    pub total_pop: f64,
    pub area_km2: f64,
    pub rwi_mean: Option<f64>,
    pub rwi_min: Option<f64>,
    pub rwi_max: Option<f64>,
    pub income_group: String,
    pub continent: String,
    pub exceeds_baseline: bool,
}

impl ExposureRow {
    pub fn new(country: &CountryRecord, exposure: &RegionExposure) -> Self {
        Self {
            iso3: country.iso3.clone(),
            gid_id: exposure.region_id.clone(),
            pop_est: exposure.exposed_population,
            total_pop: exposure.original_population,
            area_km2: exposure.exposed_area_km2,
            rwi_mean: exposure.wealth.map(|w| w.mean),
            rwi_min: exposure.wealth.map(|w| w.min),
            rwi_max: exposure.wealth.map(|w| w.max),
            income_group: country.income_group.clone(),
            continent: country.continent.clone(),
            exceeds_baseline: exposure.exceeds_baseline(),
        }
    }
}

/// Serialize rows as CSV with a header line
pub fn rows_to_csv(rows: &[ExposureRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(HEADER)
        .map_err(|e| PipelineError::csv("exposure table", e))?;
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| PipelineError::csv("exposure table", e))?;
    }
    wtr.into_inner()
        .map_err(|e| PipelineError::csv("exposure table", e.into_error().into()))
}

/// Parse rows written by [`rows_to_csv`]
pub fn rows_from_csv(bytes: &[u8]) -> Result<Vec<ExposureRow>> {
    csv::Reader::from_reader(bytes)
        .deserialize()
        .collect::<std::result::Result<Vec<ExposureRow>, _>>()
        .map_err(|e| PipelineError::csv("exposure table", e))
}

const HEADER: [&str; 11] = [
    "iso3",
    "gid_id",
    "pop_est",
    "total_pop",
    "area_km2",
    "rwi_mean",
    "rwi_min",
    "rwi_max",
    "income_group",
    "continent",
    "exceeds_baseline",
];
