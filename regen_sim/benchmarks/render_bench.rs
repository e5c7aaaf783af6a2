use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use regen_protocol::{CategoryKind, InterventionId};
use regen_sim::{composite, InMemoryAssets, InterventionCatalog, SimulationController};

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");

    for size in [128u32, 256, 512, 1024] {
        let base = RgbaImage::from_pixel(size, size, Rgba([30, 30, 30, 255]));
        let overlays: Vec<RgbaImage> = (0..3u8)
            .map(|layer| RgbaImage::from_pixel(size, size, Rgba([80 * layer, 120, 200, 128])))
            .collect();
        group.bench_with_input(BenchmarkId::new("three_layers", size), &size, |b, _| {
            b.iter(|| composite(&base, overlays.iter()))
        });
    }

    group.finish();
}

fn bench_session_render(c: &mut Criterion) {
    let catalog = InterventionCatalog::builtin();
    let mut assets = InMemoryAssets::new();
    for asset in catalog.referenced_assets() {
        assets.insert(asset, RgbaImage::from_pixel(512, 512, Rgba([90, 140, 60, 160])));
    }
    let assets = Arc::new(assets);

    c.bench_function("session_render_uncached", |b| {
        b.iter_batched(
            || {
                let mut session =
                    SimulationController::with_seed(Arc::clone(&catalog), assets.clone(), 7);
                session
                    .activate(CategoryKind::SupportCell, &InterventionId::new("Schwann"))
                    .expect("builtin support cell");
                session
                    .activate(CategoryKind::Scaffold, &InterventionId::new("Laminin"))
                    .expect("builtin scaffold");
                session
            },
            |mut session| session.current_image().expect("assets are in memory"),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(render_benches, bench_composite, bench_session_render);
criterion_main!(render_benches);
