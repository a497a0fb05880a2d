//! Layer reprojection
//!
//! Overlay inputs are moved into the metric CRS explicitly before any area
//! is measured. A layer without CRS metadata is rejected rather than
//! assumed to be WGS84.

use floodrisk_core::{Error, FeatureCollection, Feature, Result, CRS};
use geo::{Coord, Geometry, MapCoords};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Coordinate transform between two CRS
pub struct Reprojector {
    source: CRS,
    target: CRS,
    from: Proj,
    to: Proj,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

fn build_proj(crs: &CRS) -> Result<Proj> {
    let definition = crs.proj_definition()?;
    Proj::from_proj_string(&definition)
        .map_err(|e| Error::Projection(format!("failed to build '{}': {}", definition, e)))
}

impl Reprojector {
    pub fn new(source: &CRS, target: &CRS) -> Result<Self> {
        Ok(Self {
            from: build_proj(source)?,
            to: build_proj(target)?,
            source: source.clone(),
            target: target.clone(),
        })
    }

    pub fn source(&self) -> &CRS {
        &self.source
    }

    pub fn target(&self) -> &CRS {
        &self.target
    }

    /// Transform one coordinate. Geographic coordinates are degrees on both ends.
    pub fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = if self.source.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).map_err(|e| {
            Error::Projection(format!(
                "({}, {}) from {} to {}: {}",
                coord.x, coord.y, self.source, self.target, e
            ))
        })?;
        if self.target.is_geographic() {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }

    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>> {
        geometry.try_map_coords(|c| self.transform_coord(c))
    }
}

/// Reproject every feature of `fc` into `target`.
///
/// `layer` names the collection in the error raised when it has no CRS.
/// A layer already in `target` is returned as a plain copy.
pub fn reproject_collection(
    fc: &FeatureCollection,
    layer: &str,
    target: &CRS,
) -> Result<FeatureCollection> {
    let source = fc.require_crs(layer)?;
    if source.is_equivalent(target) {
        return Ok(fc.clone());
    }

    let reprojector = Reprojector::new(source, target)?;
    let features = fc
        .iter()
        .map(|f| {
            Ok(Feature {
                geometry: reprojector.transform_geometry(&f.geometry)?,
                properties: f.properties.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(layer, from = %source, to = %target, features = features.len(), "reprojected");
    Ok(FeatureCollection::from_features(features, Some(target.clone())))
}
