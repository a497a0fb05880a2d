//! Pipeline configuration
//!
//! Loaded once from TOML and handed to the runner by value. Input paths
//! are templates relative to `base_path`; `{iso3}`, `{level}` and
//! `{scenario}` are substituted per job.

use floodrisk_core::CRS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the artifact tree.
    pub base_path: PathBuf,

    /// Country registry CSV.
    pub countries_csv: PathBuf,

    /// Hazard scenarios processed for every region.
    pub scenarios: Vec<String>,

    /// Sentinel assigned to every raw raster before clipping.
    #[serde(default = "default_nodata")]
    pub nodata: f64,

    /// Projected CRS used for overlay and area computation.
    #[serde(default = "default_metric_epsg")]
    pub metric_epsg: u32,

    /// CRS assumed for raw inputs that do not declare one.
    #[serde(default = "default_input_crs")]
    pub input_crs: String,

    /// Boundary simplification tolerance in degrees.
    #[serde(default = "default_simplify_tolerance")]
    pub simplify_tolerance: f64,

    /// Income groups that are not processed.
    #[serde(default = "default_skip_income_groups")]
    pub skip_income_groups: Vec<String>,

    /// Raw input locations.
    pub inputs: InputPaths,
}

/// Raw input path templates, relative to `base_path` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    /// Global boundary layer per admin level (`{level}`).
    pub boundaries: String,

    /// Population raster per country (`{iso3}`).
    pub population: String,

    /// Hazard raster per scenario (`{scenario}`).
    pub hazard: String,

    /// Wealth index point table per country (`{iso3}`).
    #[serde(default)]
    pub wealth: Option<String>,

    /// Coastal region lookup per country (`{iso3}`). When set, only
    /// listed regions are processed and countries without a lookup are
    /// skipped.
    #[serde(default)]
    pub coastal_lookup: Option<String>,
}

fn default_nodata() -> f64 {
    255.0
}

const fn default_metric_epsg() -> u32 {
    3857
}

fn default_input_crs() -> String {
    "EPSG:4326".to_string()
}

fn default_simplify_tolerance() -> f64 {
    0.01
}

fn default_skip_income_groups() -> Vec<String> {
    vec!["HIC".to_string()]
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::Validation(
                "at least one hazard scenario is required".to_string(),
            ));
        }
        if let Some(dup) = self
            .scenarios
            .iter()
            .enumerate()
            .find(|(i, s)| self.scenarios[..*i].contains(s))
        {
            return Err(ConfigError::Validation(format!(
                "scenario '{}' is listed twice",
                dup.1
            )));
        }
        if !self.inputs.hazard.contains("{scenario}") && self.scenarios.len() > 1 {
            return Err(ConfigError::Validation(
                "inputs.hazard must contain {scenario} when several scenarios are configured"
                    .to_string(),
            ));
        }
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(ConfigError::Validation(format!(
                "simplify_tolerance must be a non-negative number, got {}",
                self.simplify_tolerance
            )));
        }
        if !self.nodata.is_finite() {
            return Err(ConfigError::Validation("nodata must be finite".to_string()));
        }

        let metric = self.metric_crs();
        if metric.is_geographic() {
            return Err(ConfigError::Validation(format!(
                "metric_epsg {} is geographic; areas need a projected CRS",
                self.metric_epsg
            )));
        }
        metric
            .proj_definition()
            .map_err(|e| ConfigError::Validation(format!("metric_epsg: {}", e)))?;
        self.input_crs()?;
        Ok(())
    }

    /// Projected CRS for overlays
    pub fn metric_crs(&self) -> CRS {
        CRS::from_epsg(self.metric_epsg)
    }

    /// CRS given to raw inputs without one
    pub fn input_crs(&self) -> Result<CRS, ConfigError> {
        CRS::parse(&self.input_crs)
            .map_err(|e| ConfigError::Validation(format!("input_crs: {}", e)))
    }
}

/// Fill `{name}` placeholders of a path template
pub fn expand_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        base_path = "data"
        countries_csv = "data/countries.csv"
        scenarios = ["inuncoast_rcp8p5_wtsub_2080_rp1000_0"]

        [inputs]
        boundaries = "raw/boundaries/gadm36_{level}.geojson"
        population = "raw/worldpop/{iso3}_ppp_2020_1km_Aggregated.tif"
        hazard = "raw/hazard/{scenario}.tif"
    "#;

    #[test]
    fn test_parse_minimal_config() {
        let config = PipelineConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.nodata, 255.0);
        assert_eq!(config.metric_epsg, 3857);
        assert_eq!(config.simplify_tolerance, 0.01);
        assert_eq!(config.skip_income_groups, vec!["HIC".to_string()]);
        assert_eq!(config.input_crs().unwrap(), CRS::wgs84());
        assert!(config.inputs.wealth.is_none());
        assert!(config.inputs.coastal_lookup.is_none());
    }

    #[test]
    fn test_overrides() {
        let toml = MINIMAL.replace(
            "scenarios =",
            "metric_epsg = 6933\nnodata = -1.0\nskip_income_groups = []\nscenarios =",
        );
        let config = PipelineConfig::from_toml(&toml).unwrap();
        assert_eq!(config.metric_crs(), CRS::from_epsg(6933));
        assert_eq!(config.nodata, -1.0);
        assert!(config.skip_income_groups.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let config = PipelineConfig::from_toml(MINIMAL).unwrap();
        let text = config.to_toml().unwrap();
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back.scenarios, config.scenarios);
        assert_eq!(back.inputs.hazard, config.inputs.hazard);
    }

    #[test]
    fn test_rejects_empty_scenarios() {
        let toml = MINIMAL.replace(
            r#"scenarios = ["inuncoast_rcp8p5_wtsub_2080_rp1000_0"]"#,
            "scenarios = []",
        );
        match PipelineConfig::from_toml(&toml) {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("scenario")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_geographic_metric_crs() {
        let toml = MINIMAL.replace("scenarios =", "metric_epsg = 4326\nscenarios =");
        assert!(matches!(
            PipelineConfig::from_toml(&toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_metric_crs() {
        let toml = MINIMAL.replace("scenarios =", "metric_epsg = 2154\nscenarios =");
        assert!(matches!(
            PipelineConfig::from_toml(&toml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_inputs_is_parse_error() {
        let toml = r#"
            base_path = "data"
            countries_csv = "countries.csv"
            scenarios = ["a"]
        "#;
        assert!(matches!(
            PipelineConfig::from_toml(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("raw/{iso3}/{scenario}.tif", &[("iso3", "BGD"), ("scenario", "rp100")]),
            "raw/BGD/rp100.tif"
        );
    }
}
