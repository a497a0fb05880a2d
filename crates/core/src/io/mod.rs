//! I/O for rasters (GeoTIFF), vector layers (GeoJSON) and point tables (CSV)

mod geojson;
mod native;
mod points;

pub use geojson::{read_geojson, read_geojson_from_bytes, write_geojson, write_geojson_to_bytes};
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
pub use points::{read_point_table, read_point_table_from_reader, PointTableOptions};
