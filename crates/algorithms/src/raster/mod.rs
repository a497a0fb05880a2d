//! Raster operations: mask clipping and polygonization

mod clip;
mod vectorize;

pub use clip::{clip, has_coverage, ClipParams, RasterClipper};
pub use vectorize::{vectorize, vectorize_to_features, RasterVectorizer, VectorizeParams};
