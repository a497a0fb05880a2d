//! # floodrisk core
//!
//! Data model and storage formats shared by the flood-exposure pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with an explicit no-data sentinel
//! - `GeoTransform`: affine pixel/world mapping
//! - `CRS`: coordinate reference system tags and PROJ definitions
//! - `FeatureCollection`: attributed vector layers
//! - I/O for GeoTIFF rasters, GeoJSON layers and CSV point tables

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Processing component with typed input, output and parameters.
///
/// Implementations hold no state between calls; the runner relies on
/// this when it skips a stage whose artifact already exists.
pub trait Algorithm {
    type Input;
    type Output;
    /// Knobs of the component; `Default` gives the production settings
    type Params: Default;
    type Error: std::error::Error;

    fn name(&self) -> &'static str;

    /// One-line summary
    fn description(&self) -> &'static str;

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
