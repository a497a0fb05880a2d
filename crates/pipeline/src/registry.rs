//! Country registry and coastal region lookup

use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// One row of the country registry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountryRecord {
    pub iso3: String,
    /// Admin level at which regions are analysed
    pub gid_region: u8,
    #[serde(default)]
    pub income_group: String,
    #[serde(default)]
    pub continent: String,
    #[serde(rename = "Exclude", default, deserialize_with = "csv::invalid_option")]
    pub exclude: Option<i64>,
}

impl CountryRecord {
    /// Region identifier attribute, e.g. `GID_1`
    pub fn gid_field(&self) -> String {
        format!("GID_{}", self.gid_region)
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude == Some(1)
    }
}

/// Countries listed in `countries.csv`
#[derive(Debug, Clone, Default)]
pub struct CountryRegistry {
    countries: Vec<CountryRecord>,
}

impl CountryRegistry {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(floodrisk_core::Error::from)?;
        Self::from_reader(file).map_err(|e| match e {
            PipelineError::Csv { source, .. } => PipelineError::csv(path.display().to_string(), source),
            other => other,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let countries = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<CountryRecord>, _>>()
            .map_err(|e| PipelineError::csv("countries", e))?;
        Ok(Self { countries })
    }

    pub fn get(&self, iso3: &str) -> Option<&CountryRecord> {
        self.countries.iter().find(|c| c.iso3 == iso3)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountryRecord> {
        self.countries.iter()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Countries to process: not excluded and not in a skipped income group
    pub fn selected<'a: 's, 's>(
        &'a self,
        skip_income_groups: &'s [String],
    ) -> impl Iterator<Item = &'a CountryRecord> + 's {
        self.countries
            .iter()
            .filter(move |c| !c.is_excluded() && !skip_income_groups.contains(&c.income_group))
    }
}

/// Regions of one country that need hazard processing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoastalLookup {
    regions: BTreeSet<String>,
}

#[derive(Deserialize)]
struct CoastalRow {
    gid_id: String,
}

impl CoastalLookup {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let regions = rdr
            .deserialize()
            .map(|row| row.map(|r: CoastalRow| r.gid_id))
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(|e| PipelineError::csv("coastal lookup", e))?;
        Ok(Self { regions })
    }

    pub fn contains(&self, gid_id: &str) -> bool {
        self.regions.contains(gid_id)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTRIES: &str = "\
iso3,country,gid_region,income_group,continent,Exclude
BGD,Bangladesh,1,LMC,Asia,
NLD,Netherlands,1,HIC,Europe,0
MMR,Myanmar,2,LMC,Asia,1
VNM,Vietnam,2,LMC,Asia,0
";

    #[test]
    fn test_registry_parse() {
        let reg = CountryRegistry::from_reader(COUNTRIES.as_bytes()).unwrap();
        assert_eq!(reg.len(), 4);

        let bgd = reg.get("BGD").unwrap();
        assert_eq!(bgd.gid_region, 1);
        assert_eq!(bgd.gid_field(), "GID_1");
        assert_eq!(bgd.continent, "Asia");
        assert_eq!(bgd.exclude, None);
        assert!(reg.get("MMR").unwrap().is_excluded());
    }

    #[test]
    fn test_selection_skips_excluded_and_income() {
        let reg = CountryRegistry::from_reader(COUNTRIES.as_bytes()).unwrap();
        let skip = vec!["HIC".to_string()];
        let picked: Vec<_> = reg.selected(&skip).map(|c| c.iso3.as_str()).collect();
        assert_eq!(picked, vec!["BGD", "VNM"]);

        let none: Vec<String> = vec![];
        assert_eq!(reg.selected(&none).count(), 3);
    }

    #[test]
    fn test_bad_level_is_error() {
        let text = "iso3,gid_region,income_group,continent\nBGD,one,LMC,Asia\n";
        assert!(matches!(
            CountryRegistry::from_reader(text.as_bytes()),
            Err(PipelineError::Csv { .. })
        ));
    }

    #[test]
    fn test_coastal_lookup() {
        let text = "gid_id,iso3\nBGD.1_1,BGD\nBGD.4_1,BGD\n";
        let lookup = CoastalLookup::from_reader(text.as_bytes()).unwrap();
        assert_eq!(lookup.len(), 2);
        assert!(lookup.contains("BGD.4_1"));
        assert!(!lookup.contains("BGD.2_1"));
    }
}
