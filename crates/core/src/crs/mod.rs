//! Coordinate Reference System handling
//!
//! Layers carry an optional [`CRS`]. Operations that combine two layers
//! (clipping, overlay, reprojection) refuse to guess: a missing or
//! mismatched CRS is an error, never a silent assumption.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// WGS84 UTM zone (EPSG:326xx north, 327xx south)
    pub fn utm(zone: u8, south: bool) -> Self {
        let base = if south { 32700 } else { 32600 };
        Self::from_epsg(base + u32::from(zone))
    }

    /// Parse `EPSG:4326`, `epsg:4326`, the OGC URN form, or a bare `+proj=` string.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with("+proj=") {
            return Ok(Self::from_proj(trimmed));
        }
        let code = trimmed
            .rsplit(':')
            .next()
            .filter(|_| trimmed.to_ascii_lowercase().contains("epsg"))
            .and_then(|c| c.parse::<u32>().ok());
        match code {
            Some(code) => Ok(Self::from_epsg(code)),
            None => Err(Error::parse("crs", format!("unrecognised CRS '{}'", s))),
        }
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match (self.epsg, &self.proj) {
            (Some(4326), _) => true,
            (_, Some(p)) => p.contains("+proj=longlat") || p.contains("+proj=latlong"),
            _ => false,
        }
    }

    /// PROJ definition understood by the reprojection layer.
    ///
    /// Known codes: 4326, 3857, 6933 and the WGS84 UTM zones.
    pub fn proj_definition(&self) -> Result<String> {
        if let Some(proj) = &self.proj {
            return Ok(proj.clone());
        }
        let code = self
            .epsg
            .ok_or_else(|| Error::Projection("CRS has neither EPSG code nor PROJ string".into()))?;
        let def = match code {
            4326 => "+proj=longlat +datum=WGS84 +no_defs".to_string(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
                .to_string(),
            6933 => "+proj=cea +lat_ts=30 +lon_0=0 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"
                .to_string(),
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs", code - 32600),
            32701..=32760 => format!(
                "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
                code - 32700
            ),
            other => {
                return Err(Error::Projection(format!(
                    "no PROJ definition known for EPSG:{}",
                    other
                )))
            }
        };
        Ok(def)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        "Unknown".to_string()
    }
}

/// Both layers must carry a CRS and agree on it.
pub fn require_same(
    left_name: &str,
    left: Option<&CRS>,
    right_name: &str,
    right: Option<&CRS>,
) -> Result<CRS> {
    let l = left.ok_or_else(|| Error::MissingCrs(left_name.to_string()))?;
    let r = right.ok_or_else(|| Error::MissingCrs(right_name.to_string()))?;
    if !l.is_equivalent(r) {
        return Err(Error::CrsMismatch(l.identifier(), r.identifier()));
    }
    Ok(l.clone())
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
        assert!(!CRS::web_mercator().is_geographic());
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(CRS::parse("EPSG:3857").unwrap(), CRS::web_mercator());
        assert_eq!(CRS::parse("epsg:4326").unwrap(), CRS::wgs84());
        assert_eq!(
            CRS::parse("urn:ogc:def:crs:EPSG::6933").unwrap(),
            CRS::from_epsg(6933)
        );
        assert!(CRS::parse("+proj=longlat +datum=WGS84").unwrap().is_geographic());
        assert!(CRS::parse("not a crs").is_err());
    }

    #[test]
    fn test_utm_definition() {
        let north = CRS::utm(33, false);
        assert_eq!(north.epsg(), Some(32633));
        assert!(north.proj_definition().unwrap().contains("+zone=33"));

        let south = CRS::utm(19, true);
        let def = south.proj_definition().unwrap();
        assert!(def.contains("+zone=19") && def.contains("+south"));
    }

    #[test]
    fn test_require_same() {
        let a = CRS::wgs84();
        let b = CRS::web_mercator();
        assert!(require_same("a", Some(&a), "b", Some(&a)).is_ok());
        assert!(matches!(
            require_same("a", Some(&a), "b", Some(&b)),
            Err(Error::CrsMismatch(_, _))
        ));
        assert!(matches!(
            require_same("a", None, "b", Some(&b)),
            Err(Error::MissingCrs(name)) if name == "a"
        ));
    }
}
