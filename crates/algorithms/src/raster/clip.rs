//! Crop a raster to a polygon mask
//!
//! The output window is the set of cells touched by the mask's bounding
//! box, clamped to the raster extent. Inside that window every cell whose
//! center is not covered by the mask (even-odd over all rings) is set to
//! the no-data sentinel. The source raster must have its sentinel
//! assigned beforehand.

use floodrisk_core::crs::require_same;
use floodrisk_core::raster::Window;
use floodrisk_core::{Algorithm, Error, Raster, RasterElement, Result, CRS};
use geo::{BoundingRect, LineString, MultiPolygon};

/// Parameters for clipping
#[derive(Debug, Clone)]
pub struct ClipParams {
    pub mask: MultiPolygon<f64>,
    pub mask_crs: Option<CRS>,
}

impl Default for ClipParams {
    fn default() -> Self {
        Self {
            mask: MultiPolygon::new(vec![]),
            mask_crs: None,
        }
    }
}

/// Raster-to-mask clipping algorithm
#[derive(Debug, Clone, Default)]
pub struct RasterClipper;

impl Algorithm for RasterClipper {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ClipParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Raster Clipper"
    }

    fn description(&self) -> &'static str {
        "Crop a raster to a polygon mask, setting uncovered cells to no-data"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clip(&input, &params.mask, params.mask_crs.as_ref())
    }
}

/// Clip `raster` to `mask`.
///
/// A mask that misses the raster entirely yields a 0×0 raster; use
/// [`has_coverage`] to tell "no coverage" apart from real data.
pub fn clip<T: RasterElement>(
    raster: &Raster<T>,
    mask: &MultiPolygon<f64>,
    mask_crs: Option<&CRS>,
) -> Result<Raster<T>> {
    let nodata = raster.require_nodata()?;
    require_same("raster", raster.crs(), "mask", mask_crs)?;

    let gt = *raster.transform();
    if !gt.is_axis_aligned() || gt.pixel_width <= 0.0 || gt.pixel_height == 0.0 {
        return Err(Error::InvalidParameter {
            name: "transform",
            value: format!("{:?}", gt),
            reason: "clipping needs a rotation-free transform".into(),
        });
    }

    let window = match mask_window(raster, mask) {
        Some(w) => w,
        None => return Ok(empty_like(raster)),
    };

    let mut out = raster.window(window)?;
    let ogt = *out.transform();
    let (rows, cols) = out.shape();
    let rings: Vec<&LineString<f64>> = mask
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .collect();

    let mut inside = vec![false; cols];
    let mut crossings: Vec<f64> = Vec::new();
    for r in 0..rows {
        let yc = ogt.origin_y + (r as f64 + 0.5) * ogt.pixel_height;
        scanline_crossings(&rings, yc, &mut crossings);

        inside.iter_mut().for_each(|v| *v = false);
        for pair in crossings.chunks_exact(2) {
            let start = center_index(pair[0], ogt.origin_x, ogt.pixel_width, cols);
            let end = center_index(pair[1], ogt.origin_x, ogt.pixel_width, cols);
            inside[start..end].iter_mut().for_each(|v| *v = true);
        }

        let data = out.data_mut();
        for (c, covered) in inside.iter().enumerate() {
            if !covered {
                data[(r, c)] = nodata;
            }
        }
    }

    Ok(out)
}

/// True when at least one cell holds a valid value
pub fn has_coverage<T: RasterElement>(raster: &Raster<T>) -> bool {
    raster.data().iter().any(|v| !raster.is_nodata(*v))
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn empty_like<T: RasterElement>(raster: &Raster<T>) -> Raster<T> {
    let mut empty = Raster::new(0, 0).with_transform(*raster.transform());
    empty.set_crs(raster.crs().cloned());
    empty.set_nodata(raster.nodata());
    empty
}

/// Snap values within float noise of an integer onto it.
fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < 1e-9 {
        r
    } else {
        v
    }
}

fn mask_window<T: RasterElement>(raster: &Raster<T>, mask: &MultiPolygon<f64>) -> Option<Window> {
    let rect = mask.bounding_rect()?;
    let gt = raster.transform();

    let (c0, r0) = gt.to_pixel(rect.min().x, rect.min().y);
    let (c1, r1) = gt.to_pixel(rect.max().x, rect.max().y);

    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let col_start = clamp(snap(c0.min(c1)).floor(), raster.cols());
    let col_end = clamp(snap(c0.max(c1)).ceil(), raster.cols());
    let row_start = clamp(snap(r0.min(r1)).floor(), raster.rows());
    let row_end = clamp(snap(r0.max(r1)).ceil(), raster.rows());

    let window = Window {
        row_off: row_start,
        col_off: col_start,
        rows: row_end.saturating_sub(row_start),
        cols: col_end.saturating_sub(col_start),
    };
    (!window.is_empty()).then_some(window)
}

/// Sorted x positions where ring edges cross the horizontal line `y`.
///
/// Edges are half-open in y so a vertex on the line counts once.
fn scanline_crossings(rings: &[&LineString<f64>], y: f64, out: &mut Vec<f64>) {
    out.clear();
    for ring in rings {
        for line in ring.lines() {
            let (a, b) = (line.start, line.end);
            if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                out.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }
    out.sort_by(f64::total_cmp);
}

/// First column whose center lies at or right of `x`
fn center_index(x: f64, origin_x: f64, pixel_width: f64, cols: usize) -> usize {
    let c = ((x - origin_x) / pixel_width - 0.5).ceil();
    c.max(0.0).min(cols as f64) as usize
}
