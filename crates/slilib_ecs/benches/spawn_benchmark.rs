//! # Spawn Benchmark
//!
//! Entity creation throughput through the builder and raw-mask paths,
//! including the block expansions large spawns trigger.
//!
//! Run with: `cargo bench --package slilib_ecs --bench spawn_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::hint::black_box;

use bytemuck::{Pod, Zeroable};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slilib_ecs::{Component, EcsConfig, EntityBuilder, Prefab, World};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Velocity {}

fn world() -> World {
    let mut world = World::new(EcsConfig::production()).unwrap();
    world.register::<Position>().unwrap();
    world.register::<Velocity>().unwrap();
    world
}

/// Benchmark: builder spawns at increasing counts.
fn bench_spawn_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_builder");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut world = world();
                for i in 0..count {
                    let f = i as f32;
                    let builder = EntityBuilder::new()
                        .with(Position { x: f, y: f, z: f })
                        .with(Velocity { x: 1.0, y: 0.0, z: 0.0 });
                    black_box(world.spawn(builder).unwrap());
                }
                world.entity_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: zeroed spawns through a prebuilt mask.
fn bench_spawn_with_mask(c: &mut Criterion) {
    c.bench_function("spawn_with_mask_100k", |b| {
        b.iter(|| {
            let mut world = world();
            let mask = world
                .mask_builder()
                .with::<Position>()
                .with::<Velocity>()
                .build()
                .unwrap();
            for _ in 0..100_000 {
                black_box(world.spawn_with_mask(&mask).unwrap());
            }
            world.entity_count()
        });
    });
}

/// Benchmark: prefab mass spawn.
fn bench_prefab(c: &mut Criterion) {
    let prefab = Prefab::new((
        Position { x: 1.0, y: 2.0, z: 3.0 },
        Velocity { x: 0.1, y: 0.2, z: 0.3 },
    ));
    c.bench_function("prefab_spawn_many_100k", |b| {
        b.iter(|| {
            let mut world = world();
            black_box(prefab.spawn_many(&mut world, 100_000).unwrap().len())
        });
    });
}

criterion_group!(benches, bench_spawn_builder, bench_spawn_with_mask, bench_prefab);
criterion_main!(benches);
