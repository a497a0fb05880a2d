//! Benchmarks for raster polygonization and mask clipping

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use floodrisk_algorithms::raster::{clip, vectorize};
use floodrisk_core::{GeoTransform, Raster, CRS};
use geo::{polygon, MultiPolygon};

/// Classified hazard grid: concentric depth bands with scattered dry cells
fn create_hazard(size: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    r.set_crs(Some(CRS::web_mercator()));
    r.set_nodata(Some(255.0));
    let center = size as f64 / 2.0;
    for row in 0..size {
        for col in 0..size {
            let dx = col as f64 - center;
            let dy = row as f64 - center;
            let band = ((dx * dx + dy * dy).sqrt() / 16.0).floor();
            let dry = (row * 7 + col * 13) % 29 == 0;
            let v = if dry { 0.0 } else { 1.0 + band % 4.0 };
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster/vectorize");
    for size in [64, 128, 256, 512] {
        let hazard = create_hazard(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| vectorize(black_box(&hazard)).unwrap())
        });
    }
    group.finish();
}

fn bench_clip(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster/clip");
    for size in [256, 512, 1024] {
        let hazard = create_hazard(size);
        let s = size as f64;
        let mask = MultiPolygon::new(vec![polygon![
            (x: 0.1 * s, y: 0.2 * s),
            (x: 0.9 * s, y: 0.1 * s),
            (x: 0.7 * s, y: 0.9 * s),
            (x: 0.2 * s, y: 0.8 * s),
        ]]);
        let crs = CRS::web_mercator();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| clip(black_box(&hazard), &mask, Some(&crs)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_vectorize, bench_clip);
criterion_main!(benches);
