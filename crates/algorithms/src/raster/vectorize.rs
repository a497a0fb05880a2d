//! Raster to polygon conversion
//!
//! Cells with identical values are grouped into 4-connected regions. Each
//! region's boundary is traced along cell edges in pixel-corner space and
//! then mapped through the raster transform, so vertices land on cell
//! corners in world coordinates.
//!
//! Only cells that are valid (not no-data) and strictly positive produce
//! polygons. Holes left by other values are kept as interior rings.
//!
//! Tracing: every cell edge facing a different label becomes a directed
//! boundary edge, oriented so the region is on its right in (col, row)
//! space. Following edges head to tail closes rings. At a vertex shared by
//! two diagonal cells of the same region the walk stays with the edge of
//! the cell it arrived on, so rings never cross there; a ring that comes
//! back to such a corner is split into a shell and a hole touching at it.

use floodrisk_core::{Algorithm, Error, Feature, FeatureCollection, Raster, RasterElement, Result};
use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon};
use std::collections::HashMap;

/// Parameters for vectorization
#[derive(Debug, Clone)]
pub struct VectorizeParams {
    /// Attribute that receives the cell value
    pub attribute: String,
}

impl Default for VectorizeParams {
    fn default() -> Self {
        Self {
            attribute: "value".to_string(),
        }
    }
}

/// Raster vectorization algorithm
#[derive(Debug, Clone, Default)]
pub struct RasterVectorizer;

impl Algorithm for RasterVectorizer {
    type Input = Raster<f64>;
    type Output = FeatureCollection;
    type Params = VectorizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Raster Vectorizer"
    }

    fn description(&self) -> &'static str {
        "Polygonize 4-connected regions of equal positive value"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        vectorize_to_features(&input, &params.attribute)
    }
}

/// Polygonize a raster into `(polygon, value)` pairs.
///
/// Regions are reported in row-major order of their first cell. An empty
/// result means no qualifying cell exists.
pub fn vectorize<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<(Polygon<f64>, f64)>> {
    raster.require_nodata()?;
    let (rows, cols) = raster.shape();
    let regions = label_regions(raster);

    let gt = raster.transform();
    let mut out = Vec::with_capacity(regions.regions.len());
    for (label, region) in regions.regions.iter().enumerate() {
        let rings = trace_region(&regions.labels, rows, cols, label as u32 + 1, &region.cells)?;
        let polygon = assemble(rings)?;
        let world = Polygon::new(
            to_world(polygon.exterior(), gt),
            polygon.interiors().iter().map(|r| to_world(r, gt)).collect(),
        );
        out.push((world.orient(Direction::Default), region.value));
    }

    tracing::debug!(rows, cols, polygons = out.len(), "vectorized raster");
    Ok(out)
}

/// Polygonize into a layer with the cell value in `attribute`.
///
/// The layer inherits the raster CRS.
pub fn vectorize_to_features<T: RasterElement>(
    raster: &Raster<T>,
    attribute: &str,
) -> Result<FeatureCollection> {
    let features = vectorize(raster)?
        .into_iter()
        .map(|(polygon, value)| Feature::new(polygon).with_property(attribute, value))
        .collect();
    Ok(FeatureCollection::from_features(features, raster.crs().cloned()))
}

// ─── Labeling ───────────────────────────────────────────────────────────

struct Region {
    value: f64,
    cells: Vec<usize>,
}

struct Labels {
    /// 0 = not part of any region, otherwise region index + 1
    labels: Vec<u32>,
    regions: Vec<Region>,
}

fn qualifying<T: RasterElement>(raster: &Raster<T>, v: T) -> Option<f64> {
    if raster.is_nodata(v) {
        return None;
    }
    v.to_f64().filter(|x| *x > 0.0)
}

fn label_regions<T: RasterElement>(raster: &Raster<T>) -> Labels {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let mut labels = vec![0u32; rows * cols];
    let mut regions = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            let idx = r * cols + c;
            if labels[idx] != 0 {
                continue;
            }
            let v = data[(r, c)];
            let Some(value) = qualifying(raster, v) else {
                continue;
            };

            let label = regions.len() as u32 + 1;
            let cells = flood_fill(raster, &mut labels, label, r, c, v);
            regions.push(Region { value, cells });
        }
    }

    Labels { labels, regions }
}

fn flood_fill<T: RasterElement>(
    raster: &Raster<T>,
    labels: &mut [u32],
    label: u32,
    r: usize,
    c: usize,
    class: T,
) -> Vec<usize> {
    let (rows, cols) = raster.shape();
    let data = raster.data();
    let mut cells = Vec::new();
    let mut stack = vec![(r, c)];

    while let Some((cr, cc)) = stack.pop() {
        let idx = cr * cols + cc;
        if labels[idx] != 0 || data[(cr, cc)] != class {
            continue;
        }

        labels[idx] = label;
        cells.push(idx);

        // 4-connected neighbors
        if cr > 0 { stack.push((cr - 1, cc)); }
        if cr + 1 < rows { stack.push((cr + 1, cc)); }
        if cc > 0 { stack.push((cr, cc - 1)); }
        if cc + 1 < cols { stack.push((cr, cc + 1)); }
    }

    cells
}

// ─── Tracing ────────────────────────────────────────────────────────────

/// Cell corner in (col, row) space
type Corner = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Corner,
    to: Corner,
    cell: usize,
}

fn boundary_edges(labels: &[u32], rows: usize, cols: usize, label: u32, cells: &[usize]) -> Vec<Edge> {
    let same = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && labels[r as usize * cols + c as usize] == label
    };

    let mut edges = Vec::new();
    for &cell in cells {
        let (r, c) = (cell / cols, cell % cols);
        let (ri, ci) = (r as isize, c as isize);
        if !same(ri - 1, ci) {
            edges.push(Edge { from: (c, r), to: (c + 1, r), cell });
        }
        if !same(ri, ci + 1) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1), cell });
        }
        if !same(ri + 1, ci) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1), cell });
        }
        if !same(ri, ci - 1) {
            edges.push(Edge { from: (c, r + 1), to: (c, r), cell });
        }
    }
    edges
}

fn trace_region(
    labels: &[u32],
    rows: usize,
    cols: usize,
    label: u32,
    cells: &[usize],
) -> Result<Vec<Vec<Corner>>> {
    let edges = boundary_edges(labels, rows, cols, label, cells);

    let mut outgoing: HashMap<Corner, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, e) in edges.iter().enumerate() {
        outgoing.entry(e.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = vec![edges[start].from];
        let mut cur = start;
        loop {
            let e = edges[cur];
            ring.push(e.to);
            if cur != start {
                used[cur] = true;
            }

            let candidates = outgoing.get(&e.to).map(Vec::as_slice).unwrap_or(&[]);
            let open = |i: &&usize| **i == start || !used[**i];
            let next = candidates
                .iter()
                .filter(open)
                .find(|&&i| edges[i].cell == e.cell)
                .or_else(|| candidates.iter().find(open))
                .copied();

            match next {
                Some(n) if n == start => break,
                Some(n) => cur = n,
                None => {
                    return Err(Error::Other(format!(
                        "open boundary at corner {:?} while tracing region {}",
                        e.to, label
                    )))
                }
            }
        }
        used[start] = true;
        rings.extend(split_at_pinches(ring).into_iter().map(drop_collinear));
    }

    Ok(rings)
}

/// Split a closed ring that revisits a corner into closed loops.
///
/// A region whose boundary pinches at a diagonal contact traces as one
/// ring touching itself; the loops are its shell and the hole it nearly
/// encloses.
fn split_at_pinches(ring: Vec<Corner>) -> Vec<Vec<Corner>> {
    let mut loops = Vec::new();
    let mut path: Vec<Corner> = Vec::with_capacity(ring.len());
    let mut seen: HashMap<Corner, usize> = HashMap::new();

    for &v in &ring[..ring.len() - 1] {
        if let Some(&pos) = seen.get(&v) {
            let mut closed: Vec<Corner> = path.drain(pos..).collect();
            for p in &closed {
                seen.remove(p);
            }
            closed.push(v);
            loops.push(closed);
        }
        seen.insert(v, path.len());
        path.push(v);
    }

    if let Some(&first) = path.first() {
        path.push(first);
        loops.push(path);
    }
    loops
}

/// Remove vertices in the middle of straight runs. Input and output are closed.
fn drop_collinear(ring: Vec<Corner>) -> Vec<Corner> {
    let open = &ring[..ring.len() - 1];
    let n = open.len();
    let mut kept: Vec<Corner> = (0..n)
        .filter(|&i| {
            let (p, q, s) = (open[(i + n - 1) % n], open[i], open[(i + 1) % n]);
            !((p.0 == q.0 && q.0 == s.0) || (p.1 == q.1 && q.1 == s.1))
        })
        .map(|i| open[i])
        .collect();
    if let Some(&first) = kept.first() {
        kept.push(first);
    }
    kept
}

fn signed_area(ring: &[Corner]) -> f64 {
    ring.windows(2)
        .map(|w| {
            let (a, b) = (w[0], w[1]);
            a.0 as f64 * b.1 as f64 - b.0 as f64 * a.1 as f64
        })
        .sum::<f64>()
        / 2.0
}

/// One shell (positive area in (col, row) space) plus any holes.
fn assemble(rings: Vec<Vec<Corner>>) -> Result<Polygon<f64>> {
    let (shells, holes): (Vec<_>, Vec<_>) = rings.into_iter().partition(|r| signed_area(r) > 0.0);

    let [shell] = <[Vec<Corner>; 1]>::try_from(shells).map_err(|s| {
        Error::Other(format!("region traced to {} outer rings", s.len()))
    })?;

    let to_ls = |ring: Vec<Corner>| {
        LineString::from(
            ring.into_iter()
                .map(|(c, r)| Coord { x: c as f64, y: r as f64 })
                .collect::<Vec<_>>(),
        )
    };
    Ok(Polygon::new(to_ls(shell), holes.into_iter().map(to_ls).collect()))
}

fn to_world(ring: &LineString<f64>, gt: &floodrisk_core::GeoTransform) -> LineString<f64> {
    ring.coords()
        .map(|c| {
            let (x, y) = gt.corner(c.x, c.y);
            Coord { x, y }
        })
        .collect()
}
