//! Shared setup helpers for minicore benchmarks.
//!
//! ## Running
//!
//! Wall-clock (criterion):
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! iai-callgrind (instruction counts, requires valgrind):
//!   cargo install iai-callgrind-runner
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics_iai
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- grid

use glam::Vec3;
use minicore::physics::broadphase::ObjectGrid;
use minicore::physics::object::ObjectStore;
use minicore::{BBox, Object, ObjectId, Shape, World, WorldConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Side length of the benchmark arena in world units.
pub const ARENA_SIZE: f32 = 2000.0;

pub fn arena_config() -> WorldConfig {
    WorldConfig {
        max_x: ARENA_SIZE,
        max_y: ARENA_SIZE,
        max_z: 0.0,
        grid_cell_width: 50.0,
        grid_cell_height: 50.0,
        boundary_walls: true,
        ..WorldConfig::default()
    }
}

/// A car-like rectangle with random heading and speed.
pub fn random_car(rng: &mut StdRng, spread: f32) -> Object {
    let center = ARENA_SIZE * 0.5;
    Object::new("car", Shape::rect(20.0, 10.0))
        .with_mass(1000.0)
        .with_xy_friction(0.1)
        .with_location(Vec3::new(
            rng.gen_range(center - spread..center + spread),
            rng.gen_range(center - spread..center + spread),
            0.0,
        ))
        .with_angle(rng.gen_range(0.0..360.0))
        .with_velocity(Vec3::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0), 0.0))
}

/// A tire-like circle.
pub fn random_tire(rng: &mut StdRng, spread: f32) -> Object {
    let center = ARENA_SIZE * 0.5;
    Object::new("tire", Shape::circle(4.0))
        .with_mass(10.0)
        .with_restitution(0.7)
        .with_location(Vec3::new(
            rng.gen_range(center - spread..center + spread),
            rng.gen_range(center - spread..center + spread),
            0.0,
        ))
}

/// World with `n` objects, alternating cars and tires, packed into a square whose side
/// grows with `n` so the density stays roughly constant.
pub fn setup_world(n: usize) -> World {
    let mut world = World::new(arena_config());
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let spread = (n as f32).sqrt().max(1.0) * 12.0;
    for i in 0..n {
        let object = if i % 2 == 0 {
            random_car(&mut rng, spread)
        } else {
            random_tire(&mut rng, spread)
        };
        world.add_object(object);
    }
    world
}

/// Like [`setup_world`] but spread over the whole arena, so few pairs touch.
pub fn setup_sparse_world(n: usize) -> World {
    let mut world = World::new(arena_config());
    let mut rng = StdRng::seed_from_u64(0xbeef);
    for _ in 0..n {
        world.add_object(random_tire(&mut rng, ARENA_SIZE * 0.45));
    }
    world
}

/// A bare grid and object store with `n` tires indexed, for broadphase benchmarks.
pub fn setup_grid(n: usize, leaf: f32) -> (ObjectGrid, ObjectStore, Vec<ObjectId>) {
    let mut grid = ObjectGrid::new(BBox::new(0.0, 0.0, ARENA_SIZE, ARENA_SIZE), leaf, leaf);
    let mut store = ObjectStore::with_key();
    let mut rng = StdRng::seed_from_u64(0xface);
    let spread = (n as f32).sqrt().max(1.0) * 12.0;

    let ids: Vec<ObjectId> = (0..n)
        .map(|_| store.insert(random_tire(&mut rng, spread)))
        .collect();
    for &id in &ids {
        grid.insert(id, &mut store[id]);
    }
    (grid, store, ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_world_counts() {
        // Four boundary walls on top of the requested objects
        assert_eq!(setup_world(10).len(), 14);
        let (grid, store, ids) = setup_grid(25, 50.0);
        assert_eq!(ids.len(), 25);
        assert_eq!(store.len(), 25);
        assert_eq!(grid.len(), 25);
    }

    #[test]
    fn test_seeded_scenes_repeat() {
        let (_, first, first_ids) = setup_grid(16, 50.0);
        let (_, second, second_ids) = setup_grid(16, 50.0);
        for (&a, &b) in first_ids.iter().zip(&second_ids) {
            assert_eq!(first[a].location, second[b].location);
        }

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let tire = random_tire(&mut rng, 30.0);
            let offset = tire.location_2d() - glam::Vec2::splat(ARENA_SIZE * 0.5);
            assert!(offset.x.abs() <= 30.0 && offset.y.abs() <= 30.0);
        }
    }
}
