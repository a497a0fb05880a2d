//! Delimited point tables
//!
//! Reads CSV files with a longitude and a latitude column into a point
//! layer. Every other column becomes an attribute: numeric when it parses
//! as a number, text otherwise, null when empty.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::Point;
use std::io::Read;
use std::path::Path;

/// Column names and CRS for a point table
#[derive(Debug, Clone)]
pub struct PointTableOptions {
    pub x_column: String,
    pub y_column: String,
    pub crs: CRS,
}

impl Default for PointTableOptions {
    fn default() -> Self {
        Self {
            x_column: "longitude".to_string(),
            y_column: "latitude".to_string(),
            crs: CRS::wgs84(),
        }
    }
}

/// Read a CSV point table from disk
pub fn read_point_table<P: AsRef<Path>>(
    path: P,
    options: &PointTableOptions,
) -> Result<FeatureCollection> {
    let file = std::fs::File::open(path.as_ref())?;
    read_point_table_from_reader(file, options)
        .map_err(|e| Error::parse(path.as_ref().display().to_string(), e))
}

/// Read a CSV point table from any reader
pub fn read_point_table_from_reader<R: Read>(
    reader: R,
    options: &PointTableOptions,
) -> Result<FeatureCollection> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::parse("point table", format!("missing column '{}'", name)))
    };
    let xi = column(&options.x_column)?;
    let yi = column(&options.y_column)?;

    let mut fc = FeatureCollection::with_crs(options.crs.clone());
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let coord = |i: usize| -> Result<f64> {
            record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| {
                    Error::parse("point table", format!("row {}: bad coordinate", line + 1))
                })
        };
        let mut feature = Feature::new(Point::new(coord(xi)?, coord(yi)?));

        for (i, (name, raw)) in headers.iter().zip(record.iter()).enumerate() {
            if i == xi || i == yi {
                continue;
            }
            let value = if raw.is_empty() {
                AttributeValue::Null
            } else if let Ok(v) = raw.parse::<f64>() {
                AttributeValue::Float(v)
            } else {
                AttributeValue::String(raw.to_string())
            };
            feature.set_property(name, value);
        }
        fc.push(feature);
    }
    Ok(fc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wealth_table() {
        let csv = "latitude,longitude,rwi,error\n\
                   23.5, 90.25, 0.42, 0.51\n\
                   23.6,90.30,-1.1,\n";
        let fc = read_point_table_from_reader(csv.as_bytes(), &PointTableOptions::default()).unwrap();

        assert_eq!(fc.len(), 2);
        assert_eq!(fc.crs, Some(CRS::wgs84()));
        match &fc.features[0].geometry {
            geo_types::Geometry::Point(p) => {
                assert_eq!(p.x(), 90.25);
                assert_eq!(p.y(), 23.5);
            }
            other => panic!("expected point, got {:?}", other),
        }
        assert_eq!(fc.features[1].get_f64("rwi"), Some(-1.1));
        assert_eq!(fc.features[1].get_property("error"), Some(&AttributeValue::Null));
    }

    #[test]
    fn test_missing_coordinate_column() {
        let csv = "lat,lon,rwi\n1,2,3\n";
        let err = read_point_table_from_reader(csv.as_bytes(), &PointTableOptions::default());
        assert!(matches!(err, Err(Error::Parse { .. })));
    }
}
