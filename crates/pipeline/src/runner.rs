//! Region job runner
//!
//! Drives every (country, region, scenario) job through the stages of
//! [`JobState`]. A stage whose artifact already exists is skipped, so a
//! batch can be re-run after any interruption and only missing work is
//! redone. One region failing never stops the batch.
//!
//! Stage artifacts are written once and never replaced. The per-scenario
//! country table is the one exception: it aggregates the region rows, so
//! it is rewritten whenever that aggregate changes and left untouched
//! otherwise.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::job::{resume_state, JobKey, JobState};
use crate::registry::{CoastalLookup, CountryRecord, CountryRegistry};
use crate::store::{ArtifactKey, ArtifactStore};
use crate::table::{rows_from_csv, rows_to_csv, ExposureRow};
use floodrisk_algorithms::exposure::{annotate_exposure, summarize_region, ExposureParams};
use floodrisk_algorithms::raster::{clip, has_coverage, vectorize_to_features};
use floodrisk_algorithms::reproject::reproject_collection;
use floodrisk_algorithms::vector::{as_multipolygon, clean, intersect_named, CleanParams};
use floodrisk_core::io::{read_point_table_from_reader, PointTableOptions};
use floodrisk_core::{AttributeValue, Error, Feature, FeatureCollection, Raster, CRS};
use geo_types::MultiPolygon;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Attribute holding cell values in vectorized layers
const VALUE_FIELD: &str = "value";
/// Country code attribute of the raw boundary layers
const COUNTRY_FIELD: &str = "GID_0";

/// Why a job stopped without producing statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The region mask misses the raster
    NoCoverage,
    /// A stage produced no feature
    EmptyGeometry,
    /// An upstream artifact or raw input is absent
    MissingInput(String),
}

/// Result of one job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(ExposureRow),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: JobKey,
    /// State recovered from existing artifacts before the run
    pub resumed_from: JobState,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct CountryReport {
    pub iso3: String,
    /// Regions selected for hazard processing
    pub regions: usize,
    pub jobs: Vec<JobReport>,
    /// Country tables written or rewritten during the run
    pub tables_written: usize,
    /// Set when the country was skipped as a whole
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub countries: Vec<CountryReport>,
    pub failed_countries: Vec<(String, String)>,
}

impl BatchReport {
    pub fn jobs(&self) -> impl Iterator<Item = &JobReport> {
        self.countries.iter().flat_map(|c| c.jobs.iter())
    }

    pub fn completed(&self) -> usize {
        self.jobs()
            .filter(|j| matches!(j.outcome, JobOutcome::Completed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.jobs()
            .filter(|j| matches!(j.outcome, JobOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.jobs()
            .filter(|j| matches!(j.outcome, JobOutcome::Failed(_)))
            .count()
    }
}

enum StageOutcome {
    Written,
    Empty(SkipReason),
}

/// A region as a one-feature layer in the boundary CRS
struct RegionContext {
    gid_id: String,
    boundary: FeatureCollection,
}

/// Sequential runner over an artifact store
pub struct RegionJobRunner<S> {
    config: PipelineConfig,
    store: S,
    input_crs: CRS,
    metric_crs: CRS,
    raw_rasters: HashMap<ArtifactKey, Raster<f64>>,
    wealth_points: Option<(String, Option<FeatureCollection>)>,
}

impl<S: ArtifactStore> RegionJobRunner<S> {
    pub fn new(config: PipelineConfig, store: S) -> Result<Self> {
        let input_crs = config.input_crs()?;
        let metric_crs = config.metric_crs();
        Ok(Self {
            config,
            store,
            input_crs,
            metric_crs,
            raw_rasters: HashMap::new(),
            wealth_points: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run every selected country of the registry
    pub fn run_batch(&mut self, registry: &CountryRegistry) -> BatchReport {
        let skip = self.config.skip_income_groups.clone();
        self.run_countries(registry.selected(&skip), |_| {})
    }

    /// Run the given countries in order, calling `on_country` after each.
    ///
    /// A country that fails is recorded in
    /// [`BatchReport::failed_countries`] and the batch moves on.
    pub fn run_countries<'c, I, F>(&mut self, countries: I, mut on_country: F) -> BatchReport
    where
        I: IntoIterator<Item = &'c CountryRecord>,
        F: FnMut(&CountryRecord),
    {
        let mut report = BatchReport::default();
        for country in countries {
            match self.run_country(country) {
                Ok(r) => report.countries.push(r),
                Err(e) => {
                    warn!(iso3 = %country.iso3, error = %e, "country failed");
                    report.failed_countries.push((country.iso3.clone(), e.to_string()));
                }
            }
            on_country(country);
        }
        info!(
            countries = report.countries.len(),
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }

    /// Write the cleaned national outline and regions of a country
    pub fn prepare_boundaries(&mut self, country: &CountryRecord) -> Result<()> {
        let iso3 = &country.iso3;
        let stages = [
            (ArtifactKey::NationalOutline { iso3: iso3.clone() }, 0),
            (ArtifactKey::Regions { iso3: iso3.clone() }, country.gid_region),
        ];
        for (key, level) in stages {
            if self.store.exists(&key) {
                debug!(%key, "boundary exists, skipping");
                continue;
            }
            let fc = self.cleaned_boundaries(country, level)?;
            self.store.write_features(&key, &fc)?;
            info!(%key, features = fc.len(), "boundary written");
        }
        Ok(())
    }

    /// Run all regions and scenarios of one country
    pub fn run_country(&mut self, country: &CountryRecord) -> Result<CountryReport> {
        let iso3 = country.iso3.clone();
        info!(%iso3, "processing country");
        self.raw_rasters.clear();
        self.wealth_points = None;

        let mut report = CountryReport {
            iso3: iso3.clone(),
            ..Default::default()
        };

        self.prepare_boundaries(country)?;

        let lookup = if self.config.inputs.coastal_lookup.is_some() {
            let key = ArtifactKey::CoastalLookup { iso3: iso3.clone() };
            if !self.store.exists(&key) {
                info!(%iso3, "no coastal lookup, skipping country");
                report.skipped = Some(format!("{} not found", key));
                return Ok(report);
            }
            Some(CoastalLookup::from_reader(self.store.read_bytes(&key)?.as_slice())?)
        } else {
            None
        };

        let regions = self.select_regions(country, lookup.as_ref())?;
        report.regions = regions.len();
        debug!(%iso3, regions = regions.len(), "regions selected");

        let scenarios = self.config.scenarios.clone();
        for scenario in &scenarios {
            let mut rows = Vec::new();
            for region in &regions {
                let job = JobKey::new(&iso3, &region.gid_id, scenario);
                let job_report = self.run_job(country, region, job);
                if let JobOutcome::Completed(row) = &job_report.outcome {
                    rows.push(row.clone());
                }
                report.jobs.push(job_report);
            }
            if self.write_country_table(&iso3, scenario, &rows)? {
                report.tables_written += 1;
            }
        }

        self.raw_rasters.clear();
        self.wealth_points = None;
        Ok(report)
    }

    fn cleaned_boundaries(&self, country: &CountryRecord, level: u8) -> Result<FeatureCollection> {
        let mut raw = self.store.read_features(&ArtifactKey::RawBoundaries { level })?;
        if raw.crs.is_none() {
            raw.crs = Some(self.input_crs.clone());
        }

        let params = CleanParams {
            country: country.iso3.clone(),
            tolerance: self.config.simplify_tolerance,
            ..Default::default()
        };

        let mut out = FeatureCollection::from_features(Vec::new(), raw.crs.clone());
        let mut matched = 0usize;
        for feature in raw.iter().filter(|f| {
            f.get_property(COUNTRY_FIELD).and_then(AttributeValue::as_str) == Some(country.iso3.as_str())
        }) {
            matched += 1;
            let geometry = clean(&feature.geometry, &params)?;
            if as_multipolygon(&geometry).map_or(true, |mp| mp.0.is_empty()) {
                debug!(iso3 = %country.iso3, level, "boundary removed by cleaning");
                continue;
            }
            out.push(Feature {
                geometry,
                properties: feature.properties.clone(),
            });
        }

        if matched == 0 {
            return Err(PipelineError::CountryNotInBoundaries {
                iso3: country.iso3.clone(),
                level,
            });
        }
        Ok(out)
    }

    fn select_regions(
        &self,
        country: &CountryRecord,
        lookup: Option<&CoastalLookup>,
    ) -> Result<Vec<RegionContext>> {
        let layer = self.store.read_features(&ArtifactKey::Regions {
            iso3: country.iso3.clone(),
        })?;
        let field = country.gid_field();

        let mut regions = Vec::new();
        for feature in layer.iter() {
            let gid_id = feature
                .get_property(&field)
                .and_then(AttributeValue::as_str)
                .ok_or_else(|| PipelineError::MissingRegionId {
                    iso3: country.iso3.clone(),
                    field: field.clone(),
                })?;
            if lookup.is_some_and(|l| !l.contains(gid_id)) {
                continue;
            }
            regions.push(RegionContext {
                gid_id: gid_id.to_string(),
                boundary: FeatureCollection::from_features(vec![feature.clone()], layer.crs.clone()),
            });
        }
        Ok(regions)
    }

    fn run_job(&mut self, country: &CountryRecord, region: &RegionContext, job: JobKey) -> JobReport {
        let resumed_from = resume_state(&self.store, &job);
        debug!(%job, state = %resumed_from, "job start");

        let outcome = match self.advance(country, region, &job, resumed_from) {
            Ok(outcome) => outcome,
            Err(e) if e.is_missing_input() => {
                info!(%job, error = %e, "missing input, skipping");
                JobOutcome::Skipped(SkipReason::MissingInput(e.to_string()))
            }
            Err(e) => {
                warn!(%job, error = %e, "job failed");
                JobOutcome::Failed(e.to_string())
            }
        };
        JobReport {
            job,
            resumed_from,
            outcome,
        }
    }

    fn advance(
        &mut self,
        country: &CountryRecord,
        region: &RegionContext,
        job: &JobKey,
        from: JobState,
    ) -> Result<JobOutcome> {
        let mut state = from;
        while let Some(next) = state.next() {
            if next.gate(job).is_some_and(|k| self.store.exists(&k)) {
                debug!(%job, stage = %next, "artifact exists, stage skipped");
            } else {
                match self.run_stage(next, country, region, job)? {
                    StageOutcome::Written => debug!(%job, stage = %next, "stage complete"),
                    StageOutcome::Empty(reason) => {
                        info!(%job, stage = %next, ?reason, "nothing to process");
                        return Ok(JobOutcome::Skipped(reason));
                    }
                }
            }
            state = next;
        }

        let key = stats_key(job);
        let row = rows_from_csv(&self.store.read_bytes(&key)?)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::parse(key.to_string(), "statistics table has no row"))?;
        Ok(JobOutcome::Completed(row))
    }

    fn run_stage(
        &mut self,
        stage: JobState,
        country: &CountryRecord,
        region: &RegionContext,
        job: &JobKey,
    ) -> Result<StageOutcome> {
        let (iso3, gid_id, scenario) = (job.iso3.clone(), job.gid_id.clone(), job.scenario.clone());
        match stage {
            JobState::Pending => Ok(StageOutcome::Written),
            JobState::BoundaryReady => {
                Err(Error::MissingArtifact(ArtifactKey::Regions { iso3 }.to_string()).into())
            }
            JobState::HazardClipped => self.clip_stage(
                &ArtifactKey::RawHazard { scenario: scenario.clone() },
                &ArtifactKey::HazardRaster { iso3, scenario, gid_id },
                region,
            ),
            JobState::HazardVectorized => self.vectorize_stage(
                &ArtifactKey::HazardRaster {
                    iso3: iso3.clone(),
                    scenario: scenario.clone(),
                    gid_id: gid_id.clone(),
                },
                &ArtifactKey::HazardVector { iso3, scenario, gid_id },
            ),
            JobState::PopulationReady => {
                let raster = ArtifactKey::PopulationRaster {
                    iso3: iso3.clone(),
                    gid_id: gid_id.clone(),
                };
                if !self.store.exists(&raster) {
                    let raw = ArtifactKey::RawPopulation { iso3: iso3.clone() };
                    if let StageOutcome::Empty(reason) = self.clip_stage(&raw, &raster, region)? {
                        return Ok(StageOutcome::Empty(reason));
                    }
                }
                self.vectorize_stage(&raster, &ArtifactKey::PopulationVector { iso3, gid_id })
            }
            JobState::Overlaid => self.overlay_stage(job),
            JobState::StatisticsWritten => self.statistics_stage(country, region, job),
        }
    }

    // ─── Stages ─────────────────────────────────────────────────────────

    fn clip_stage(
        &mut self,
        raw_key: &ArtifactKey,
        out_key: &ArtifactKey,
        region: &RegionContext,
    ) -> Result<StageOutcome> {
        let mask = region_mask(region)?;
        let clipped = {
            let raw = self.raw_raster(raw_key)?;
            clip(raw, &mask, region.boundary.crs.as_ref())?
        };
        if !has_coverage(&clipped) {
            return Ok(StageOutcome::Empty(SkipReason::NoCoverage));
        }
        self.store.write_raster(out_key, &clipped)?;
        Ok(StageOutcome::Written)
    }

    fn vectorize_stage(&mut self, raster_key: &ArtifactKey, out_key: &ArtifactKey) -> Result<StageOutcome> {
        let mut raster = self.store.read_raster(raster_key)?;
        raster.set_nodata(Some(self.config.nodata));
        let fc = vectorize_to_features(&raster, VALUE_FIELD)?;
        if fc.is_empty() {
            return Ok(StageOutcome::Empty(SkipReason::EmptyGeometry));
        }
        self.store.write_features(out_key, &fc)?;
        Ok(StageOutcome::Written)
    }

    fn overlay_stage(&mut self, job: &JobKey) -> Result<StageOutcome> {
        let population = self.store.read_features(&ArtifactKey::PopulationVector {
            iso3: job.iso3.clone(),
            gid_id: job.gid_id.clone(),
        })?;
        let hazard = self.store.read_features(&ArtifactKey::HazardVector {
            iso3: job.iso3.clone(),
            scenario: job.scenario.clone(),
            gid_id: job.gid_id.clone(),
        })?;

        let population = reproject_collection(&population, "population", &self.metric_crs)?;
        let hazard = reproject_collection(&hazard, "hazard", &self.metric_crs)?;

        let mut exposure = intersect_named(&population, "population", &hazard, "hazard")?;
        if exposure.is_empty() {
            return Ok(StageOutcome::Empty(SkipReason::EmptyGeometry));
        }
        annotate_exposure(&mut exposure)?;
        self.store.write_features(&exposure_key(job), &exposure)?;
        Ok(StageOutcome::Written)
    }

    fn statistics_stage(
        &mut self,
        country: &CountryRecord,
        region: &RegionContext,
        job: &JobKey,
    ) -> Result<StageOutcome> {
        let exposure = self.store.read_features(&exposure_key(job))?;
        let population = self.store.read_features(&ArtifactKey::PopulationVector {
            iso3: job.iso3.clone(),
            gid_id: job.gid_id.clone(),
        })?;
        let population = reproject_collection(&population, "population", &self.metric_crs)?;
        let wealth = self.wealth_exposure(region, job, &exposure)?;

        let summary = summarize_region(
            &job.gid_id,
            &exposure,
            &population,
            wealth.as_ref(),
            &ExposureParams::default(),
        )?;
        let row = ExposureRow::new(country, &summary);
        self.store.write_bytes(&stats_key(job), &rows_to_csv(&[row])?)?;
        Ok(StageOutcome::Written)
    }

    // ─── Inputs ─────────────────────────────────────────────────────────

    /// Raw raster with the configured sentinel and CRS, cached per country
    fn raw_raster(&mut self, key: &ArtifactKey) -> Result<&Raster<f64>> {
        if !self.raw_rasters.contains_key(key) {
            let mut raster = self.store.read_raster(key)?;
            raster.set_nodata(Some(self.config.nodata));
            if raster.crs().is_none() {
                raster.set_crs(Some(self.input_crs.clone()));
            }
            debug!(%key, rows = raster.rows(), cols = raster.cols(), "raw raster loaded");
            self.raw_rasters.insert(key.clone(), raster);
        }
        self.raw_rasters
            .get(key)
            .ok_or_else(|| Error::MissingArtifact(key.to_string()).into())
    }

    /// Wealth point table of a country, `None` when there is none
    fn wealth_points(&mut self, iso3: &str) -> Result<Option<&FeatureCollection>> {
        let cached = matches!(&self.wealth_points, Some((c, _)) if c == iso3);
        if !cached {
            let key = ArtifactKey::RawWealth { iso3: iso3.to_string() };
            let points = if self.store.exists(&key) {
                let options = PointTableOptions {
                    crs: self.input_crs.clone(),
                    ..Default::default()
                };
                let bytes = self.store.read_bytes(&key)?;
                let fc = read_point_table_from_reader(bytes.as_slice(), &options)
                    .map_err(|e| Error::parse(key.to_string(), e))?;
                info!(iso3, samples = fc.len(), "wealth samples loaded");
                Some(fc)
            } else {
                debug!(iso3, "no wealth samples");
                None
            };
            self.wealth_points = Some((iso3.to_string(), points));
        }
        Ok(self.wealth_points.as_ref().and_then(|(_, p)| p.as_ref()))
    }

    /// Wealth samples inside the region
    fn region_wealth(&mut self, region: &RegionContext, iso3: &str) -> Result<Option<FeatureCollection>> {
        let key = ArtifactKey::RegionWealth {
            iso3: iso3.to_string(),
            gid_id: region.gid_id.clone(),
        };
        if self.store.exists(&key) {
            return Ok(Some(self.store.read_features(&key)?));
        }

        let inside = match self.wealth_points(iso3)? {
            Some(points) => intersect_named(points, "wealth", &region.boundary, "region")?,
            None => return Ok(None),
        };
        if inside.is_empty() {
            return Ok(None);
        }
        self.store.write_features(&key, &inside)?;
        Ok(Some(inside))
    }

    /// Wealth samples falling on exposure records
    fn wealth_exposure(
        &mut self,
        region: &RegionContext,
        job: &JobKey,
        exposure: &FeatureCollection,
    ) -> Result<Option<FeatureCollection>> {
        let key = ArtifactKey::WealthExposure {
            iso3: job.iso3.clone(),
            scenario: job.scenario.clone(),
            gid_id: job.gid_id.clone(),
        };
        if self.store.exists(&key) {
            return Ok(Some(self.store.read_features(&key)?));
        }

        let Some(samples) = self.region_wealth(region, &job.iso3)? else {
            return Ok(None);
        };
        let samples = reproject_collection(&samples, "wealth", &self.metric_crs)?;
        let joined = intersect_named(&samples, "wealth", exposure, "exposure")?;
        if joined.is_empty() {
            debug!(%job, "no wealth sample in the exposed area");
            return Ok(None);
        }
        self.store.write_features(&key, &joined)?;
        Ok(Some(joined))
    }

    /// Write the per-region rows of a country unless identical ones exist
    fn write_country_table(&mut self, iso3: &str, scenario: &str, rows: &[ExposureRow]) -> Result<bool> {
        let key = ArtifactKey::CountryTable {
            iso3: iso3.to_string(),
            scenario: scenario.to_string(),
        };
        let bytes = rows_to_csv(rows)?;
        if self.store.exists(&key) && self.store.read_bytes(&key)? == bytes {
            debug!(%key, "country table unchanged");
            return Ok(false);
        }
        self.store.write_bytes(&key, &bytes)?;
        info!(%key, rows = rows.len(), "country table written");
        Ok(true)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn exposure_key(job: &JobKey) -> ArtifactKey {
    ArtifactKey::Exposure {
        iso3: job.iso3.clone(),
        scenario: job.scenario.clone(),
        gid_id: job.gid_id.clone(),
    }
}

fn stats_key(job: &JobKey) -> ArtifactKey {
    ArtifactKey::RegionStats {
        iso3: job.iso3.clone(),
        scenario: job.scenario.clone(),
        gid_id: job.gid_id.clone(),
    }
}

fn region_mask(region: &RegionContext) -> Result<MultiPolygon<f64>> {
    region
        .boundary
        .features
        .first()
        .and_then(|f| as_multipolygon(&f.geometry))
        .ok_or_else(|| {
            Error::InvalidGeometry(format!("region {} is not polygonal", region.gid_id)).into()
        })
}
