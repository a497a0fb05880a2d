//! Artifact storage
//!
//! Every stage output is addressed by an [`ArtifactKey`]. The store only
//! moves bytes; rasters travel as GeoTIFF, layers as GeoJSON and tables
//! as CSV, whatever the backend. Artifacts are written once and never
//! rewritten by a skipped stage.

use crate::config::{expand_template, PipelineConfig};
use floodrisk_core::io::{
    read_geojson_from_bytes, read_geotiff_from_buffer, write_geojson_to_bytes,
    write_geotiff_to_buffer,
};
use floodrisk_core::{Error, FeatureCollection, Raster, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Address of a raw input or a stage output
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKey {
    /// Global boundary layer at an admin level
    RawBoundaries { level: u8 },
    /// Population raster of a country
    RawPopulation { iso3: String },
    /// Hazard raster of a scenario
    RawHazard { scenario: String },
    /// Wealth index point table of a country
    RawWealth { iso3: String },
    /// Coastal region lookup of a country
    CoastalLookup { iso3: String },

    /// Cleaned admin-0 outline
    NationalOutline { iso3: String },
    /// Cleaned regions at the country's admin level
    Regions { iso3: String },
    HazardRaster { iso3: String, scenario: String, gid_id: String },
    HazardVector { iso3: String, scenario: String, gid_id: String },
    PopulationRaster { iso3: String, gid_id: String },
    PopulationVector { iso3: String, gid_id: String },
    /// Wealth samples inside a region
    RegionWealth { iso3: String, gid_id: String },
    /// Annotated population ∩ hazard records
    Exposure { iso3: String, scenario: String, gid_id: String },
    /// Wealth samples ∩ exposure records
    WealthExposure { iso3: String, scenario: String, gid_id: String },
    /// One-row statistics table of a region
    RegionStats { iso3: String, scenario: String, gid_id: String },
    /// Per-region rows of a country
    CountryTable { iso3: String, scenario: String },
}

impl ArtifactKey {
    /// Location of a stage output relative to the artifact root.
    ///
    /// `None` for raw inputs, whose location comes from configuration.
    pub fn relative_path(&self) -> Option<PathBuf> {
        let path = match self {
            ArtifactKey::NationalOutline { iso3 } => Path::new(iso3).join("national_outline.geojson"),
            ArtifactKey::Regions { iso3 } => Path::new(iso3).join("regions").join("regions.geojson"),
            ArtifactKey::HazardRaster { iso3, scenario, gid_id } => Path::new(iso3)
                .join("hazard")
                .join(scenario)
                .join(format!("{}.tif", gid_id)),
            ArtifactKey::HazardVector { iso3, scenario, gid_id } => Path::new(iso3)
                .join("hazard")
                .join(scenario)
                .join(format!("{}.geojson", gid_id)),
            ArtifactKey::PopulationRaster { iso3, gid_id } => {
                Path::new(iso3).join("population").join(format!("{}.tif", gid_id))
            }
            ArtifactKey::PopulationVector { iso3, gid_id } => {
                Path::new(iso3).join("population").join(format!("{}.geojson", gid_id))
            }
            ArtifactKey::RegionWealth { iso3, gid_id } => Path::new(iso3)
                .join("rwi")
                .join("regions")
                .join(format!("{}.geojson", gid_id)),
            ArtifactKey::Exposure { iso3, scenario, gid_id } => Path::new(iso3)
                .join("intersect")
                .join("hazard_pop")
                .join(scenario)
                .join(format!("{}.geojson", gid_id)),
            ArtifactKey::WealthExposure { iso3, scenario, gid_id } => Path::new(iso3)
                .join("intersect")
                .join("rwi_pop")
                .join(scenario)
                .join(format!("{}.geojson", gid_id)),
            ArtifactKey::RegionStats { iso3, scenario, gid_id } => Path::new(iso3)
                .join("csv")
                .join(scenario)
                .join("regions")
                .join(format!("{}.csv", gid_id)),
            ArtifactKey::CountryTable { iso3, scenario } => {
                Path::new(iso3).join("csv").join(scenario).join("vul_pop.csv")
            }
            _ => return None,
        };
        Some(path)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::RawBoundaries { level } => write!(f, "raw boundaries (level {})", level),
            ArtifactKey::RawPopulation { iso3 } => write!(f, "raw population ({})", iso3),
            ArtifactKey::RawHazard { scenario } => write!(f, "raw hazard ({})", scenario),
            ArtifactKey::RawWealth { iso3 } => write!(f, "raw wealth ({})", iso3),
            ArtifactKey::CoastalLookup { iso3 } => write!(f, "coastal lookup ({})", iso3),
            other => match other.relative_path() {
                Some(path) => write!(f, "{}", path.display()),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

/// Byte-level artifact storage with typed helpers
pub trait ArtifactStore {
    fn exists(&self, key: &ArtifactKey) -> bool;

    /// Read an artifact; a missing one is [`Error::MissingArtifact`]
    fn read_bytes(&self, key: &ArtifactKey) -> Result<Vec<u8>>;

    fn write_bytes(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<()>;

    fn read_raster(&self, key: &ArtifactKey) -> Result<Raster<f64>> {
        read_geotiff_from_buffer(&self.read_bytes(key)?)
            .map_err(|e| Error::parse(key.to_string(), e))
    }

    fn write_raster(&mut self, key: &ArtifactKey, raster: &Raster<f64>) -> Result<()> {
        let bytes = write_geotiff_to_buffer(raster)?;
        self.write_bytes(key, &bytes)
    }

    fn read_features(&self, key: &ArtifactKey) -> Result<FeatureCollection> {
        read_geojson_from_bytes(&self.read_bytes(key)?)
            .map_err(|e| Error::parse(key.to_string(), e))
    }

    fn write_features(&mut self, key: &ArtifactKey, fc: &FeatureCollection) -> Result<()> {
        let bytes = write_geojson_to_bytes(fc)?;
        self.write_bytes(key, &bytes)
    }
}

// ─── Filesystem ─────────────────────────────────────────────────────────

/// Raw input templates resolved against the artifact root
#[derive(Debug, Clone)]
pub struct RawLayout {
    pub boundaries: String,
    pub population: String,
    pub hazard: String,
    pub wealth: Option<String>,
    pub coastal_lookup: Option<String>,
}

impl From<&PipelineConfig> for RawLayout {
    fn from(config: &PipelineConfig) -> Self {
        let inputs = &config.inputs;
        Self {
            boundaries: inputs.boundaries.clone(),
            population: inputs.population.clone(),
            hazard: inputs.hazard.clone(),
            wealth: inputs.wealth.clone(),
            coastal_lookup: inputs.coastal_lookup.clone(),
        }
    }
}

/// Artifacts stored as files under a root directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    layout: RawLayout,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, layout: RawLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.base_path.clone(), RawLayout::from(config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of an artifact, `None` for an unconfigured input
    pub fn path(&self, key: &ArtifactKey) -> Option<PathBuf> {
        let relative = match key {
            ArtifactKey::RawBoundaries { level } => {
                expand_template(&self.layout.boundaries, &[("level", &level.to_string())])
            }
            ArtifactKey::RawPopulation { iso3 } => {
                expand_template(&self.layout.population, &[("iso3", iso3)])
            }
            ArtifactKey::RawHazard { scenario } => {
                expand_template(&self.layout.hazard, &[("scenario", scenario)])
            }
            ArtifactKey::RawWealth { iso3 } => {
                expand_template(self.layout.wealth.as_deref()?, &[("iso3", iso3)])
            }
            ArtifactKey::CoastalLookup { iso3 } => {
                expand_template(self.layout.coastal_lookup.as_deref()?, &[("iso3", iso3)])
            }
            other => return other.relative_path().map(|p| self.root.join(p)),
        };
        let relative = PathBuf::from(relative);
        Some(if relative.is_absolute() {
            relative
        } else {
            self.root.join(relative)
        })
    }

    fn require_path(&self, key: &ArtifactKey) -> Result<PathBuf> {
        self.path(key)
            .ok_or_else(|| Error::MissingArtifact(format!("{} (not configured)", key)))
    }
}

impl ArtifactStore for FsStore {
    fn exists(&self, key: &ArtifactKey) -> bool {
        self.path(key).is_some_and(|p| p.is_file())
    }

    fn read_bytes(&self, key: &ArtifactKey) -> Result<Vec<u8>> {
        let path = self.require_path(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingArtifact(path.display().to_string()),
            _ => Error::Io(e),
        })
    }

    fn write_bytes(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        let path = self.require_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A truncated file never appears under the final name.
        let tmp = path.with_extension("partial");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────

/// Artifacts held in memory, for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    artifacts: HashMap<ArtifactKey, Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes since creation
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<&ArtifactKey> {
        let mut keys: Vec<_> = self.artifacts.keys().collect();
        keys.sort();
        keys
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, key: &ArtifactKey) -> bool {
        self.artifacts.contains_key(key)
    }

    fn read_bytes(&self, key: &ArtifactKey) -> Result<Vec<u8>> {
        self.artifacts
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingArtifact(key.to_string()))
    }

    fn write_bytes(&mut self, key: &ArtifactKey, bytes: &[u8]) -> Result<()> {
        self.writes += 1;
        self.artifacts.insert(key.clone(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodrisk_core::{Feature, GeoTransform, CRS};
    use geo::point;

    fn layout() -> RawLayout {
        RawLayout {
            boundaries: "raw/gadm36_{level}.geojson".into(),
            population: "raw/{iso3}_ppp.tif".into(),
            hazard: "/hazard/{scenario}.tif".into(),
            wealth: None,
            coastal_lookup: Some("processed/{iso3}/coastal/coastal_lookup.csv".into()),
        }
    }

    #[test]
    fn test_paths() {
        let store = FsStore::new("/data", layout());
        assert_eq!(
            store.path(&ArtifactKey::RawBoundaries { level: 2 }),
            Some(PathBuf::from("/data/raw/gadm36_2.geojson"))
        );
        assert_eq!(
            store.path(&ArtifactKey::RawHazard { scenario: "rp100".into() }),
            Some(PathBuf::from("/hazard/rp100.tif"))
        );
        assert_eq!(store.path(&ArtifactKey::RawWealth { iso3: "BGD".into() }), None);
        assert_eq!(
            store.path(&ArtifactKey::CountryTable {
                iso3: "BGD".into(),
                scenario: "rp100".into()
            }),
            Some(PathBuf::from("/data/BGD/csv/rp100/vul_pop.csv"))
        );
    }

    #[test]
    fn test_every_output_has_a_distinct_path() {
        let keys = vec![
            ArtifactKey::NationalOutline { iso3: "A".into() },
            ArtifactKey::Regions { iso3: "A".into() },
            ArtifactKey::HazardRaster { iso3: "A".into(), scenario: "s".into(), gid_id: "g".into() },
            ArtifactKey::HazardVector { iso3: "A".into(), scenario: "s".into(), gid_id: "g".into() },
            ArtifactKey::PopulationRaster { iso3: "A".into(), gid_id: "g".into() },
            ArtifactKey::PopulationVector { iso3: "A".into(), gid_id: "g".into() },
            ArtifactKey::RegionWealth { iso3: "A".into(), gid_id: "g".into() },
            ArtifactKey::Exposure { iso3: "A".into(), scenario: "s".into(), gid_id: "g".into() },
            ArtifactKey::WealthExposure { iso3: "A".into(), scenario: "s".into(), gid_id: "g".into() },
            ArtifactKey::RegionStats { iso3: "A".into(), scenario: "s".into(), gid_id: "g".into() },
            ArtifactKey::CountryTable { iso3: "A".into(), scenario: "s".into() },
        ];
        let mut paths: Vec<_> = keys.iter().filter_map(|k| k.relative_path()).collect();
        assert_eq!(paths.len(), keys.len());
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), keys.len());
    }

    #[test]
    fn test_fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path(), layout());

        let key = ArtifactKey::PopulationRaster { iso3: "BGD".into(), gid_id: "BGD.1_1".into() };
        assert!(!store.exists(&key));
        assert!(matches!(store.read_raster(&key), Err(Error::MissingArtifact(_))));

        let raster = Raster::filled(3, 4, 12.0)
            .with_transform(GeoTransform::new(90.0, 24.0, 0.01, -0.01))
            .with_crs(CRS::wgs84())
            .with_nodata(255.0);
        store.write_raster(&key, &raster).unwrap();
        assert!(store.exists(&key));
        assert_eq!(store.read_raster(&key).unwrap(), raster);

        let layer_key = ArtifactKey::Regions { iso3: "BGD".into() };
        let fc = FeatureCollection::from_features(
            vec![Feature::new(point!(x: 90.1, y: 23.9)).with_property("GID_1", "BGD.1_1")],
            Some(CRS::wgs84()),
        );
        store.write_features(&layer_key, &fc).unwrap();
        assert_eq!(store.read_features(&layer_key).unwrap(), fc);
        assert!(dir.path().join("BGD/regions/regions.geojson").is_file());
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let mut store = MemoryStore::new();
        let key = ArtifactKey::Regions { iso3: "X".into() };
        assert!(matches!(store.read_bytes(&key), Err(Error::MissingArtifact(_))));
        store.write_bytes(&key, b"{}").unwrap();
        store.write_bytes(&key, b"{}").unwrap();
        assert_eq!(store.writes(), 2);
        assert_eq!(store.len(), 1);
    }
}
