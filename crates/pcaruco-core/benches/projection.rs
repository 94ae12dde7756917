use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pcaruco_core::{project, split_tiles, Point, PointCloud, TileMask};

fn synthetic_cloud(n: usize) -> PointCloud {
    let mut cloud = PointCloud::empty();
    for i in 0..n {
        let t = i as f32 * 0.001;
        let p = Point::new(t.sin() * 2.0, t.cos() * 1.5, t * 0.01, [i as u8, 128, 64]);
        cloud.push(p, 1u8 << (i % 4));
    }
    cloud
}

fn bench_projection(c: &mut Criterion) {
    let cloud = synthetic_cloud(400_000);

    c.bench_function("project_400k_512", |b| {
        b.iter(|| project(black_box(cloud.points()), 512, 512).expect("projection"))
    });

    c.bench_function("split_tiles_400k", |b| {
        b.iter(|| split_tiles(black_box(&cloud), &TileMask::DEFAULT_SET))
    });
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
