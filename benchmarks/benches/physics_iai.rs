//! Physics core benchmarks (iai-callgrind - instruction counts).
//!
//! Prerequisites:
//!   cargo install iai-callgrind-runner
//!   sudo dnf install valgrind   # Fedora/WSL2
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics_iai
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics_iai -- grid

use std::hint::black_box;

use glam::{Vec2, Vec3};
use iai_callgrind::{library_benchmark, library_benchmark_group, main};
use minicore::physics::narrowphase::{CollisionDetector, circle_circle, collide};
use minicore::{Object, Shape};
use minicore_bench::*;

// ---------------------------------------------------------------------------
// Object grid
// ---------------------------------------------------------------------------

fn pair_all(n: usize) -> usize {
    let (grid, store, ids) = setup_grid(black_box(n), 50.0);
    ids.iter()
        .map(|&id| grid.bbox_collisions(id, &store).len())
        .sum()
}

#[library_benchmark]
fn grid_pairs_100() {
    black_box(pair_all(100));
}

#[library_benchmark]
fn grid_pairs_500() {
    black_box(pair_all(500));
}

#[library_benchmark]
fn grid_pairs_1000() {
    black_box(pair_all(1000));
}

#[library_benchmark]
fn grid_query_sparse_1000() {
    let world = setup_sparse_world(black_box(1000));
    black_box(world.objects_within_distance(Vec2::splat(ARENA_SIZE * 0.5), 200.0));
}

library_benchmark_group!(
    name = grid_group;
    benchmarks =
        grid_pairs_100,
        grid_pairs_500,
        grid_pairs_1000,
        grid_query_sparse_1000
);

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

#[library_benchmark]
fn narrowphase_circle_circle_hit() {
    black_box(circle_circle(Vec2::ZERO, 1.0, black_box(Vec2::new(1.5, 0.0)), 1.0));
}

#[library_benchmark]
fn narrowphase_circle_circle_miss() {
    black_box(circle_circle(Vec2::ZERO, 1.0, black_box(Vec2::new(5.0, 0.0)), 1.0));
}

#[library_benchmark]
fn narrowphase_dispatch_all() {
    let car = |x: f32, angle: f32| {
        Object::new("car", Shape::rect(20.0, 10.0))
            .with_location(Vec3::new(x, 0.0, 0.0))
            .with_angle(angle)
    };
    let tire = Object::new("tire", Shape::circle(4.0)).with_location(Vec3::new(12.0, 0.0, 0.0));
    let (a, b) = (car(0.0, 0.0), car(15.0, 30.0));
    black_box(collide(&a, &b));
    black_box(collide(&a, &tire));
    black_box(collide(&tire, &a));
    black_box(collide(&tire, &tire));
}

#[library_benchmark]
fn narrowphase_detect_500() {
    let (grid, mut store, ids) = setup_grid(black_box(500), 50.0);
    black_box(CollisionDetector::new().detect(&mut store, &grid, &ids));
}

library_benchmark_group!(
    name = narrowphase_group;
    benchmarks =
        narrowphase_circle_circle_hit,
        narrowphase_circle_circle_miss,
        narrowphase_dispatch_all,
        narrowphase_detect_500
);

// ---------------------------------------------------------------------------
// Full step
// ---------------------------------------------------------------------------

#[library_benchmark]
fn step_100() {
    let mut world = setup_world(black_box(100));
    black_box(world.step_time(1.0 / 60.0));
}

#[library_benchmark]
fn step_500() {
    let mut world = setup_world(black_box(500));
    black_box(world.step_time(1.0 / 60.0));
}

#[library_benchmark]
fn step_sustained_100() {
    let mut world = setup_world(black_box(100));
    for _ in 0..10 {
        world.step_time(1.0 / 60.0);
    }
    black_box(world.len());
}

library_benchmark_group!(
    name = step_group;
    benchmarks =
        step_100,
        step_500,
        step_sustained_100
);

// ---------------------------------------------------------------------------
// Sleep effect
// ---------------------------------------------------------------------------

#[library_benchmark]
fn sleep_settled_scene_100() {
    let mut world = setup_world(black_box(100));
    // Let friction bring everything to rest
    for _ in 0..300 {
        world.step_time(1.0 / 60.0);
    }
    // Measure stepping a settled scene
    for _ in 0..60 {
        world.step_time(1.0 / 60.0);
    }
    black_box(world.len());
}

library_benchmark_group!(
    name = sleep_group;
    benchmarks =
        sleep_settled_scene_100
);

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

main!(
    library_benchmark_groups = grid_group,
    narrowphase_group,
    step_group,
    sleep_group
);
