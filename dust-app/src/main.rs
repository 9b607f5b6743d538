use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use anyhow::Context;
use glam::{Vec2, Vec3};
use minicore::{Object, ObjectId, Shape, World, WorldConfig};

const DEFAULT_STEPS: u32 = 600;
const DEFAULT_CARS: usize = 6;
const MAX_CARS: usize = 36;
const TIMESTEP: f32 = 1.0 / 60.0;

/// Engine force in kg·units/s², roughly 10 m/s² for a 1000 kg car at 0.05 m/unit.
const ENGINE_FORCE: f32 = 200_000.0;
const WAYPOINT_RADIUS: f32 = 150.0;
/// Hits a tire stack takes before it is knocked off the track.
const TIRE_DURABILITY: u32 = 3;

/// Rectangular loop around a central island, driven counter-clockwise.
const WAYPOINTS: [Vec2; 4] = [
    Vec2::new(1800.0, 200.0),
    Vec2::new(1800.0, 1000.0),
    Vec2::new(200.0, 1000.0),
    Vec2::new(200.0, 200.0),
];

struct Car {
    id: ObjectId,
    waypoint: usize,
    laps: u32,
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, value)),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", name)),
    }
}

fn build_track(world: &mut World) {
    // Central island
    world.add_object(
        Object::new("island", Shape::rect(1200.0, 400.0))
            .with_mass(0.0)
            .with_location(Vec3::new(1000.0, 600.0, 0.0))
            .stationary(),
    );

    // Tire stacks just off each island corner
    for corner in [
        Vec2::new(380.0, 380.0),
        Vec2::new(1620.0, 380.0),
        Vec2::new(1620.0, 820.0),
        Vec2::new(380.0, 820.0),
    ] {
        let outward = (corner - Vec2::new(1000.0, 600.0)).normalize_or_zero();
        for k in 0..3 {
            let location = corner + outward * (k as f32 * 22.0);
            world.add_object(
                Object::new("tire", Shape::circle(10.0))
                    .with_mass(5.0)
                    .with_restitution(0.8)
                    .with_xy_friction(0.6)
                    .with_location(location.extend(0.0)),
            );
        }
    }
}

fn spawn_cars(world: &mut World, count: usize) -> Vec<Car> {
    (0..count)
        .map(|i| {
            let (row, col) = (i % 3, i / 3);
            let location = Vec3::new(250.0 + col as f32 * 110.0, 100.0 + row as f32 * 100.0, 0.0);
            let id = world.add_object(
                Object::new("car", Shape::rect(80.0, 40.0))
                    .with_mass(1000.0)
                    .with_restitution(0.3)
                    .with_xy_friction(0.3)
                    .with_max_speed(600.0)
                    .with_location(location),
            );
            Car {
                id,
                waypoint: 0,
                laps: 0,
            }
        })
        .collect()
}

/// Steer every car toward its next waypoint and point it along its velocity.
fn drive(world: &mut World, cars: &mut [Car]) {
    for car in cars {
        let Some(object) = world.object_mut(car.id) else {
            continue;
        };

        let to_target = WAYPOINTS[car.waypoint] - object.location_2d();
        if to_target.length_squared() < WAYPOINT_RADIUS * WAYPOINT_RADIUS {
            car.waypoint = (car.waypoint + 1) % WAYPOINTS.len();
            if car.waypoint == 0 {
                car.laps += 1;
            }
        }

        let direction = (WAYPOINTS[car.waypoint] - object.location_2d()).normalize_or_zero();
        object.add_force((direction * ENGINE_FORCE).extend(0.0));

        let velocity = object.velocity().truncate();
        if velocity.length_squared() > 1.0 {
            object.set_angle(velocity.y.atan2(velocity.x).to_degrees());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let steps: u32 = env_or("DUST_SIM_STEPS", DEFAULT_STEPS)?;
    let car_count: usize = env_or("DUST_SIM_CARS", DEFAULT_CARS)?;
    anyhow::ensure!(
        car_count <= MAX_CARS,
        "DUST_SIM_CARS must be at most {}, got {}",
        MAX_CARS,
        car_count
    );

    let config = WorldConfig {
        max_x: 2000.0,
        max_y: 1200.0,
        max_z: 100.0,
        meters_per_unit: 0.05,
        boundary_walls: true,
        grid_cell_width: 100.0,
        grid_cell_height: 100.0,
        ..WorldConfig::default()
    };
    let mut world = World::try_new(config).context("failed to create world")?;

    build_track(&mut world);
    let mut cars = spawn_cars(&mut world, car_count);
    let tires: HashSet<ObjectId> = world
        .objects()
        .filter(|(_, object)| object.type_name() == "tire")
        .map(|(id, _)| id)
        .collect();

    log::info!(
        "simulating {} steps with {} cars, {} objects in total",
        steps,
        cars.len(),
        world.len()
    );

    let mut hits: HashMap<ObjectId, u32> = HashMap::new();
    let mut total_collisions = 0usize;
    let mut total_removed = 0usize;

    for step in 0..steps {
        drive(&mut world, &mut cars);

        let stats = world.step_time_with(TIMESTEP, |event, removals| {
            for id in [event.object, event.partner] {
                if !tires.contains(&id) {
                    continue;
                }
                let count = hits.entry(id).or_insert(0);
                *count += 1;
                if *count >= TIRE_DURABILITY {
                    removals.schedule(id);
                }
            }
        });

        total_collisions += stats.collisions;
        total_removed += stats.removed;

        if step % 60 == 0 {
            log::debug!(
                "step {}: {} collisions, {} impulses, {} reindexed",
                step,
                stats.collisions,
                stats.impulses,
                stats.reindexed
            );
        }
    }

    log::info!(
        "done: {} collisions, {} tires knocked off, {} objects left",
        total_collisions,
        total_removed,
        world.len()
    );

    for (index, car) in cars.iter().enumerate() {
        let Some(object) = world.object(car.id) else {
            continue;
        };
        let nearby = world
            .objects_within_distance(object.location_2d(), 200.0)
            .len()
            .saturating_sub(1);
        log::info!(
            "car {}: laps {}, at ({:.0}, {:.0}), speed {:.1} m/s, {} objects nearby",
            index,
            car.laps,
            object.location.x,
            object.location.y,
            object.velocity().truncate().length() * world.config().meters_per_unit,
            nearby
        );
    }

    Ok(())
}
