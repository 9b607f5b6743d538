//! Rigid body integration functions.

use glam::{Vec2, Vec3};

use crate::math::VectorExt;

use super::object::{Object, ObjectId, ObjectStore};

/// Linear speed (world units per second) below which a body may fall asleep.
pub const LINEAR_SLEEP_THRESHOLD: f32 = 0.1;
/// Angular speed (radians per second) below which a body may fall asleep.
pub const ANGULAR_SLEEP_THRESHOLD: f32 = 0.05;

/// World-level values the integrator needs, already converted to world units.
#[derive(Debug, Clone, Copy)]
pub struct IntegrationParams {
    /// Gravity in world units per second squared.
    pub gravity: Vec3,
    /// Magnitude of gravity in world units per second squared, used for ground friction.
    pub friction_gravity: f32,
    /// Floor and ceiling for the Z coordinate.
    pub min_z: f32,
    pub max_z: f32,
}

impl IntegrationParams {
    /// Convert gravity given in m/s² into world units.
    pub fn new(gravity: Vec3, meters_per_unit: f32, min_z: f32, max_z: f32) -> Self {
        let scale = if meters_per_unit > 0.0 {
            1.0 / meters_per_unit
        } else {
            1.0
        };
        Self {
            gravity: gravity * scale,
            friction_gravity: gravity.length() * scale,
            min_z: min_z.min(max_z),
            max_z: max_z.max(min_z),
        }
    }
}

/// True if the integrator should touch `object` at all.
#[inline]
fn is_integrated(object: &Object) -> bool {
    object.physics_object && !object.stationary && !object.physics.sleeping
}

/// Integrate velocities using semi-implicit Euler: v += (g + F/m) * dt.
///
/// Ground friction decelerates planar motion by `µ·|g|` without reversing it, and the
/// planar speed is clamped to the object's max speed.
pub fn integrate_velocities(
    store: &mut ObjectStore,
    ids: &[ObjectId],
    params: &IntegrationParams,
    dt: f32,
) {
    for &id in ids {
        let Some(object) = store.get_mut(id) else {
            continue;
        };
        if !is_integrated(object) {
            continue;
        }

        let physics = &mut object.physics;
        let inv_mass = physics.inv_mass();
        physics.velocity += (params.gravity + physics.force_accumulator * inv_mass) * dt;

        let mut planar = physics.velocity.truncate();
        if physics.xy_friction > 0.0 {
            let decel = physics.xy_friction * params.friction_gravity * dt;
            let speed = planar.length();
            planar = if speed <= decel {
                Vec2::ZERO
            } else {
                planar - planar.normalized_or_zero() * decel
            };
        }
        if let Some(max_speed) = physics.max_speed {
            planar = planar.clamped_to_length(max_speed);
        }
        physics.velocity = planar.extend(physics.velocity.z);

        physics.angular_velocity +=
            physics.torque_accumulator * physics.inv_moment_of_inertia() * dt;
    }
}

/// Integrate positions: p += v * dt, angle += ω * dt.
///
/// The Z coordinate is kept within `[min_z, max_z]`; hitting either bound zeroes the
/// vertical velocity. Returns how many objects were integrated.
pub fn integrate_positions(
    store: &mut ObjectStore,
    ids: &[ObjectId],
    params: &IntegrationParams,
    dt: f32,
) -> usize {
    let mut integrated = 0;
    for &id in ids {
        let Some(object) = store.get_mut(id) else {
            continue;
        };
        if !is_integrated(object) {
            continue;
        }

        object.location += object.physics.velocity * dt;
        object.angle += object.physics.angular_velocity.to_degrees() * dt;
        object.angle = object.angle.rem_euclid(360.0);

        if object.location.z < params.min_z {
            object.location.z = params.min_z;
            object.physics.velocity.z = object.physics.velocity.z.max(0.0);
        } else if object.location.z > params.max_z {
            object.location.z = params.max_z;
            object.physics.velocity.z = object.physics.velocity.z.min(0.0);
        }
        integrated += 1;
    }
    integrated
}

/// Clear force and torque accumulators.
pub fn clear_forces(store: &mut ObjectStore, ids: &[ObjectId]) {
    for &id in ids {
        if let Some(object) = store.get_mut(id) {
            object.physics.force_accumulator = Vec3::ZERO;
            object.physics.torque_accumulator = 0.0;
        }
    }
}

/// Update sleep states for all dynamic objects.
///
/// Objects whose planar and angular speeds stay below the thresholds for `sleep_time`
/// seconds fall asleep and have their velocities zeroed. Sleeping objects skip
/// integration until a force, impulse or collision wakes them.
pub fn update_sleep_states(store: &mut ObjectStore, ids: &[ObjectId], sleep_time: f32, dt: f32) {
    for &id in ids {
        let Some(object) = store.get_mut(id) else {
            continue;
        };
        if !object.physics_object || object.stationary || object.physics.sleeping {
            continue;
        }

        let physics = &mut object.physics;
        let linear_speed = physics.velocity.truncate().length();
        let angular_speed = physics.angular_velocity.abs();

        if linear_speed < LINEAR_SLEEP_THRESHOLD && angular_speed < ANGULAR_SLEEP_THRESHOLD {
            physics.sleep_timer += dt;
            if physics.sleep_timer >= sleep_time {
                physics.sleeping = true;
                physics.velocity = Vec3::ZERO;
                physics.angular_velocity = 0.0;
            }
        } else {
            physics.sleep_timer = 0.0;
        }
    }
}
