//! GeoJSON layers
//!
//! Supports Point, MultiPoint, Polygon and MultiPolygon geometries with
//! flat properties. The CRS is written as a named `crs` member so that
//! projected layers (metric CRS) round-trip; a file without one reads
//! back with `crs: None` and the caller decides what it is.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection, Properties};
use geo_types::{Coord, Geometry, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Serialize a layer to GeoJSON bytes.
pub fn write_geojson_to_bytes(fc: &FeatureCollection) -> Result<Vec<u8>> {
    let features = fc
        .features
        .iter()
        .map(|f| {
            Ok(json!({
                "type": "Feature",
                "geometry": geometry_to_json(&f.geometry)?,
                "properties": properties_to_json(&f.properties),
            }))
        })
        .collect::<Result<Vec<Value>>>()?;

    let mut root = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(crs) = &fc.crs {
        root["crs"] = json!({
            "type": "name",
            "properties": { "name": crs_urn(crs) },
        });
    }

    Ok(serde_json::to_vec(&root)?)
}

/// Write a layer to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(fc: &FeatureCollection, path: P) -> Result<()> {
    let bytes = write_geojson_to_bytes(fc)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read a GeoJSON file into a layer
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let bytes = std::fs::read(path.as_ref())?;
    read_geojson_from_bytes(&bytes)
        .map_err(|e| Error::parse(path.as_ref().display().to_string(), e))
}

/// Parse GeoJSON bytes into a layer.
///
/// Features with a null geometry are dropped.
pub fn read_geojson_from_bytes(bytes: &[u8]) -> Result<FeatureCollection> {
    let root: Value = serde_json::from_slice(bytes)?;

    let crs = match root.pointer("/crs/properties/name").and_then(Value::as_str) {
        Some(name) => Some(CRS::parse(name)?),
        None => None,
    };

    let features = root["features"]
        .as_array()
        .ok_or_else(|| Error::parse("geojson", "missing 'features' array"))?;

    let mut fc = FeatureCollection::from_features(Vec::with_capacity(features.len()), crs);
    for feature in features {
        if feature["geometry"].is_null() {
            continue;
        }
        let geometry = geometry_from_json(&feature["geometry"])?;
        let properties = feature["properties"]
            .as_object()
            .map(properties_from_json)
            .unwrap_or_default();
        fc.push(Feature {
            geometry,
            properties,
        });
    }
    Ok(fc)
}

fn crs_urn(crs: &CRS) -> String {
    match crs.epsg() {
        Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
        None => crs.identifier(),
    }
}

// ─── Properties ─────────────────────────────────────────────────────────

fn properties_to_json(props: &Properties) -> Value {
    let map: Map<String, Value> = props
        .iter()
        .map(|(k, v)| {
            let value = match v {
                AttributeValue::Null => Value::Null,
                AttributeValue::Bool(b) => json!(b),
                AttributeValue::Int(i) => json!(i),
                AttributeValue::Float(f) => json!(f),
                AttributeValue::String(s) => json!(s),
            };
            (k.clone(), value)
        })
        .collect();
    Value::Object(map)
}

fn properties_from_json(map: &Map<String, Value>) -> Properties {
    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::Bool(b) => AttributeValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => AttributeValue::Int(i),
                    None => n
                        .as_f64()
                        .map_or(AttributeValue::Null, AttributeValue::Float),
                },
                Value::String(s) => AttributeValue::String(s.clone()),
                // Nested values are kept as their JSON text.
                Value::Array(_) | Value::Object(_) => AttributeValue::String(v.to_string()),
                Value::Null => AttributeValue::Null,
            };
            (k.clone(), value)
        })
        .collect()
}

// ─── Geometry ───────────────────────────────────────────────────────────

fn ring_to_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_to_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_to_json));
    Value::Array(rings)
}

fn geometry_to_json(geometry: &Geometry<f64>) -> Result<Value> {
    let value = match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| json!([p.x(), p.y()])).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": polygon_to_json(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
        other => {
            return Err(Error::InvalidGeometry(format!(
                "cannot encode {} as GeoJSON",
                geometry_kind(other)
            )))
        }
    };
    Ok(value)
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn coord_from_json(value: &Value) -> Result<Coord<f64>> {
    let pair = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| Error::parse("geojson", "position must have at least two numbers"))?;
    let x = pair[0]
        .as_f64()
        .ok_or_else(|| Error::parse("geojson", "x must be a number"))?;
    let y = pair[1]
        .as_f64()
        .ok_or_else(|| Error::parse("geojson", "y must be a number"))?;
    Ok(Coord { x, y })
}

fn ring_from_json(value: &Value) -> Result<LineString<f64>> {
    let coords = value
        .as_array()
        .ok_or_else(|| Error::parse("geojson", "ring must be an array"))?
        .iter()
        .map(coord_from_json)
        .collect::<Result<Vec<_>>>()?;
    // LineString::close is a no-op on already-closed rings.
    let mut ring = LineString(coords);
    ring.close();
    Ok(ring)
}

fn polygon_from_json(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| Error::parse("geojson", "polygon must be an array of rings"))?;
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| Error::parse("geojson", "polygon without exterior ring"))?;
    Ok(Polygon::new(
        ring_from_json(exterior)?,
        interiors
            .iter()
            .map(ring_from_json)
            .collect::<Result<Vec<_>>>()?,
    ))
}

fn geometry_from_json(value: &Value) -> Result<Geometry<f64>> {
    let coords = &value["coordinates"];
    let as_array = || {
        coords
            .as_array()
            .ok_or_else(|| Error::parse("geojson", "coordinates must be an array"))
    };

    match value["type"].as_str() {
        Some("Point") => Ok(Point::from(coord_from_json(coords)?).into()),
        Some("MultiPoint") => Ok(MultiPoint(
            as_array()?
                .iter()
                .map(|c| coord_from_json(c).map(Point::from))
                .collect::<Result<Vec<_>>>()?,
        )
        .into()),
        Some("Polygon") => Ok(polygon_from_json(coords)?.into()),
        Some("MultiPolygon") => Ok(MultiPolygon(
            as_array()?
                .iter()
                .map(polygon_from_json)
                .collect::<Result<Vec<_>>>()?,
        )
        .into()),
        other => Err(Error::InvalidGeometry(format!(
            "unsupported GeoJSON geometry type {:?}",
            other
        ))),
    }
}
