//! Pixel/world mapping of a raster grid

use serde::{Deserialize, Serialize};

/// Six-coefficient affine transform in GDAL order.
///
/// Pixel space has its origin at the outer corner of cell `(0, 0)`;
/// integer coordinates are cell corners, `+0.5` is a cell centre.
///
/// ```text
/// x = origin_x + col * pixel_width + row * x_skew
/// y = origin_y + col * y_skew      + row * pixel_height
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up grids
    pub pixel_height: f64,
    pub x_skew: f64,
    pub y_skew: f64,
}

impl GeoTransform {
    /// North-up transform without skew
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            x_skew: 0.0,
            y_skew: 0.0,
        }
    }

    /// World position of a pixel-space point
    pub fn corner(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.x_skew,
            self.origin_y + col * self.y_skew + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of a world point, NaN for a singular transform
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.x_skew * self.y_skew;
        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }
        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.x_skew * dy) / det,
            (self.pixel_width * dy - self.y_skew * dx) / det,
        )
    }

    /// Same grid with cell `(col_off, row_off)` as the new origin cell
    pub fn shifted(&self, col_off: usize, row_off: usize) -> Self {
        let (origin_x, origin_y) = self.corner(col_off as f64, row_off as f64);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.x_skew.abs() < 1e-12 && self.y_skew.abs() < 1e-12
    }

    /// `(min_x, min_y, max_x, max_y)` covered by `cols × rows` cells
    pub fn extent(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let (w, h) = (cols as f64, rows as f64);
        [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .into_iter()
            .map(|(c, r)| self.corner(c, r))
            .fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(x0, y0, x1, y1), (x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
