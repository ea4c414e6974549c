//! Oracle Benchmarks
//!
//! Benchmarks for perceptual colour distance and whole-image diffing.
//!
//! Run with: `cargo bench --bench oracle_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use goldshot::{ciede2000, perceptual_diff, ComparisonOptions, ImageOracle, Lab};
use image::{Rgba, RgbaImage};

fn bench_ciede2000(c: &mut Criterion) {
    let mut group = c.benchmark_group("ciede2000");

    let pairs = vec![
        (Lab::new(50.0, 2.6772, -79.7751), Lab::new(50.0, 0.0, -82.7485), "blue"),
        (Lab::new(50.0, -1.0, 2.0), Lab::new(50.0, 0.0, 0.0), "near_gray"),
        (Lab::new(60.2574, -34.0099, 36.2677), Lab::new(60.4626, -34.1751, 39.4387), "green"),
    ];

    for (first, second, name) in pairs {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(first, second),
            |bench, (a, b): &(Lab, Lab)| {
                bench.iter(|| black_box(ciede2000(black_box(*a), black_box(*b))));
            },
        );
    }

    group.finish();
}

fn bench_perceptual_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("perceptual_diff");

    for size in [10usize, 100, 1000] {
        let pixels: Vec<Rgba<u8>> = (0..size)
            .map(|i| Rgba([(i % 256) as u8, ((i * 7) % 256) as u8, ((i * 13) % 256) as u8, 255]))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &pixels, |bench, px| {
            bench.iter(|| {
                for pair in px.windows(2) {
                    black_box(perceptual_diff(pair[0], pair[1]));
                }
            });
        });
    }

    group.finish();
}

fn bench_image_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("image_diff");
    let options = ComparisonOptions::default();

    for dim in [64u32, 256, 512] {
        let reference = RgbaImage::from_pixel(dim, dim, Rgba([40, 90, 200, 255]));
        let mut current = reference.clone();
        for i in 0..dim {
            current.put_pixel(i, i, Rgba([255, 0, 0, 255]));
        }

        group.bench_with_input(
            BenchmarkId::new("identical", dim),
            &reference,
            |bench, img| {
                bench.iter(|| black_box(ImageOracle::diff(img, img, &options)));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("diagonal", dim),
            &(current, reference),
            |bench, (cur, refr): &(RgbaImage, RgbaImage)| {
                bench.iter(|| black_box(ImageOracle::diff(cur, refr, &options)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ciede2000, bench_perceptual_diff, bench_image_diff);
criterion_main!(benches);
