//! # floodrisk algorithms
//!
//! Geometry and raster processing for flood exposure analysis.
//!
//! ## Algorithm categories
//!
//! - **vector**: boundary cleaning, layer overlay, area measurement
//! - **raster**: mask clipping, polygonization
//! - **reproject**: CRS transforms for layers
//! - **exposure**: population, area and wealth aggregates

pub mod exposure;
pub mod raster;
pub mod reproject;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::exposure::{
        annotate_exposure, exposed_area_km2, exposed_population, population_baseline,
        summarize_region, wealth_stats, ExposureCalculator, ExposureParams, RegionExposure,
        RegionLayers, WealthStats,
    };
    pub use crate::raster::{
        clip, has_coverage, vectorize, vectorize_to_features, ClipParams, RasterClipper,
        RasterVectorizer, VectorizeParams,
    };
    pub use crate::reproject::{reproject_collection, Reprojector};
    pub use crate::vector::{
        area, area_km2, clean, intersect, intersect_named, CleanParams, GeometryCleaner,
        OverlayEngine, OverlayParams,
    };
    pub use floodrisk_core::prelude::*;
}
