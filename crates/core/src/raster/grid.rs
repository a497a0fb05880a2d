//! Georeferenced grid with an explicit no-data sentinel

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2};

/// Row-major grid of cells plus the metadata needed to place it.
///
/// The sentinel is never guessed from the data: a raster read from a
/// file only has one when the file declares it, and every clipping or
/// vectorizing operation refuses a raster without one.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

/// Rectangular block of cells of a parent raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled grid with an identity-like transform
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::wrap(Array2::zeros((rows, cols)))
    }

    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::wrap(Array2::from_elem((rows, cols), value))
    }

    /// Grid from row-major cell values
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Array2::from_shape_vec((rows, cols), data)
            .map(Self::wrap)
            .map_err(|e| Error::Other(e.to_string()))
    }

    fn wrap(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    // ─── Shape and cells ────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for the 0×0 result of clipping to a mask outside the grid
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Cell values that are not the sentinel, as `f64`
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .filter(move |v| !self.is_nodata(**v))
            .filter_map(|v| v.to_f64())
    }

    /// Owned copy of a block, georeferenced at its own origin
    pub fn window(&self, window: Window) -> Result<Self> {
        let row_end = window.row_off + window.rows;
        let col_end = window.col_off + window.cols;
        if row_end > self.rows() || col_end > self.cols() {
            return Err(self.out_of_bounds(row_end, col_end));
        }

        Ok(Self {
            data: self
                .data
                .slice(s![window.row_off..row_end, window.col_off..col_end])
                .to_owned(),
            transform: self.transform.shifted(window.col_off, window.row_off),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    // ─── Georeferencing ─────────────────────────────────────────────────

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// `(min_x, min_y, max_x, max_y)` in CRS units
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.extent(self.cols(), self.rows())
    }

    // ─── Sentinel ───────────────────────────────────────────────────────

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Replace the sentinel; cell values are left untouched
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    pub fn require_nodata(&self) -> Result<T> {
        self.nodata.ok_or(Error::NoDataNotSet)
    }

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Range, mean and counts over valid cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut stats = RasterStatistics {
            min: None,
            max: None,
            mean: None,
            sum: 0.0,
            valid_count: 0,
            nodata_count: 0,
        };
        for v in self.valid_values() {
            stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
            stats.sum += v;
            stats.valid_count += 1;
        }
        stats.mean = (stats.valid_count > 0).then(|| stats.sum / stats.valid_count as f64);
        stats.nodata_count = self.len() - stats.valid_count;
        stats
    }
}

/// Summary of the valid cells of a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub sum: f64,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sentinel_is_never_implied() {
        let raster: Raster<f32> = Raster::filled(3, 4, 255.0);
        assert_eq!(raster.shape(), (3, 4));
        assert!(matches!(raster.require_nodata(), Err(Error::NoDataNotSet)));
        assert_eq!(raster.valid_values().count(), 12);
        assert_eq!(raster.with_nodata(255.0).valid_values().count(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut raster: Raster<u8> = Raster::new(2, 2);
        raster.set(1, 1, 7).unwrap();
        assert_eq!(raster.get(1, 1).unwrap(), 7);
        assert!(matches!(
            raster.set(2, 0, 1),
            Err(Error::IndexOutOfBounds { row: 2, col: 0, rows: 2, cols: 2 })
        ));
        assert!(Raster::<f64>::from_vec(vec![1.0; 5], 2, 2).is_err());
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let raster = Raster::from_vec(vec![1.0, 2.0, 255.0, 3.0], 2, 2)
            .unwrap()
            .with_nodata(255.0);

        let stats = raster.statistics();
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.nodata_count, 1);
        assert_relative_eq!(stats.sum, 6.0);
        assert_eq!(stats.max, Some(3.0));
    }

    #[test]
    fn test_window_keeps_metadata() {
        let data: Vec<f64> = (0..20).map(|v| v as f64).collect();
        let raster = Raster::from_vec(data, 4, 5)
            .unwrap()
            .with_transform(GeoTransform::new(10.0, 20.0, 1.0, -1.0))
            .with_crs(CRS::wgs84())
            .with_nodata(255.0);

        let w = raster
            .window(Window { row_off: 1, col_off: 2, rows: 2, cols: 3 })
            .unwrap();

        assert_eq!(w.shape(), (2, 3));
        assert_eq!(w.get(0, 0).unwrap(), 7.0);
        assert_relative_eq!(w.transform().origin_x, 12.0);
        assert_relative_eq!(w.transform().origin_y, 19.0);
        assert_eq!(w.crs(), Some(&CRS::wgs84()));
        assert_eq!(w.nodata(), Some(255.0));

        assert!(raster
            .window(Window { row_off: 3, col_off: 0, rows: 2, cols: 1 })
            .is_err());
    }
}
