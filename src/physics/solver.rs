//! Sequential impulse generation and positional correction.
//!
//! Both phases work on the contacts stored on the objects. For every object only the
//! deepest contact (per partner, in the position phase) is resolved, and the partner's
//! matching contacts are dropped so a pair is never handled twice from both sides.

use glam::Vec2;

use crate::math::cross_z;

use super::contact::Contact;
use super::object::{ObjectId, ObjectStore};

/// Snapshot of the per-object values the solver needs.
#[derive(Debug, Clone, Copy)]
struct BodyState {
    location: Vec2,
    velocity: Vec2,
    inv_mass: f32,
    inv_inertia: f32,
    restitution: f32,
}

impl BodyState {
    fn read(store: &ObjectStore, id: ObjectId) -> Option<Self> {
        let object = store.get(id)?;
        Some(Self {
            location: object.location_2d(),
            velocity: object.velocity().truncate(),
            inv_mass: object.inv_mass(),
            inv_inertia: object.inv_moment_of_inertia(),
            restitution: object.physics.restitution,
        })
    }
}

/// Velocity changes for one resolved pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PairImpulse {
    linear_a: Vec2,
    angular_a: f32,
    linear_b: Vec2,
    angular_b: f32,
}

/// Apply a restitution impulse for the deepest contact of every object in `ids`.
///
/// Pairs that are already separating along the contact normal, and pairs where both
/// objects have infinite mass, are left alone. Returns the number of impulses applied.
pub fn generate_impulses_from_deepest_contacts(
    store: &mut ObjectStore,
    ids: &[ObjectId],
    meters_per_unit: f32,
) -> usize {
    let mut applied = 0;

    for &id in ids {
        let contact = match store.get(id).and_then(|object| object.contacts.deepest()) {
            Some(contact) => contact,
            None => continue,
        };

        let impulse = match (
            BodyState::read(store, id),
            BodyState::read(store, contact.partner),
        ) {
            (Some(a), Some(b)) => pair_impulse(&a, &b, &contact, meters_per_unit),
            _ => None,
        };

        if let Some(impulse) = impulse {
            apply_pair_impulse(store, id, contact.partner, &impulse);
            applied += 1;
        }

        if let Some(partner) = store.get_mut(contact.partner) {
            partner.contacts.remove_partner(id);
        }
    }

    applied
}

/// Velocity changes that make the pair bounce apart with the smaller restitution.
fn pair_impulse(
    a: &BodyState,
    b: &BodyState,
    contact: &Contact,
    meters_per_unit: f32,
) -> Option<PairImpulse> {
    let inv_mass_sum = a.inv_mass + b.inv_mass;
    if inv_mass_sum <= 0.0 {
        return None;
    }

    let normal = contact.normal;
    let closing = normal.dot(b.velocity - a.velocity);
    if closing <= 0.0 {
        return None;
    }

    let restitution = a.restitution.min(b.restitution);
    // Relative velocity change that turns `closing` into `-restitution * closing`
    let delta = normal * ((1.0 + restitution) * closing);

    // Angular part in physical units, shared by inverse inertia
    let inv_inertia_sum = a.inv_inertia + b.inv_inertia;
    let (angular_a, angular_b) = if inv_inertia_sum > 0.0 {
        let physical_delta = delta * meters_per_unit;
        let arm_a = (contact.point - a.location) * meters_per_unit;
        let arm_b = (contact.point - b.location) * meters_per_unit;
        (
            cross_z(arm_a, physical_delta) * a.inv_inertia / inv_inertia_sum,
            cross_z(arm_b, -physical_delta) * b.inv_inertia / inv_inertia_sum,
        )
    } else {
        (0.0, 0.0)
    };

    Some(PairImpulse {
        linear_a: delta * (a.inv_mass / inv_mass_sum),
        angular_a,
        linear_b: -delta * (b.inv_mass / inv_mass_sum),
        angular_b,
    })
}

fn apply_pair_impulse(store: &mut ObjectStore, a: ObjectId, b: ObjectId, impulse: &PairImpulse) {
    for (id, linear, angular) in [
        (a, impulse.linear_a, impulse.angular_a),
        (b, impulse.linear_b, impulse.angular_b),
    ] {
        if linear == Vec2::ZERO && angular == 0.0 {
            continue;
        }
        if let Some(object) = store.get_mut(id) {
            object.apply_velocity_change(linear, angular);
        }
    }
}

/// Push interpenetrating objects apart.
///
/// Each object's deepest contact per partner moves the pair apart along the contact
/// normal by `depth * accuracy`, split by inverse mass. Objects with infinite mass never
/// move. Consumed contacts are removed from both sides. Returns the number of pairs moved.
pub fn resolve_positions(store: &mut ObjectStore, ids: &[ObjectId], accuracy: f32) -> usize {
    let accuracy = accuracy.max(0.0);
    let mut resolved = 0;

    for &id in ids {
        let contacts = match store.get(id) {
            Some(object) => object.contacts.deepest_per_partner(),
            None => continue,
        };

        for contact in contacts {
            let partner = contact.partner;
            let inv_a = store.get(id).map_or(0.0, |o| o.inv_mass());
            let inv_b = store.get(partner).map_or(0.0, |o| o.inv_mass());
            let inv_sum = inv_a + inv_b;

            if inv_sum > 0.0 && contact.depth > 0.0 {
                let correction = contact.normal * (contact.depth * accuracy / inv_sum);
                if inv_a > 0.0 {
                    if let Some(object) = store.get_mut(id) {
                        object.displace(correction * inv_a);
                    }
                }
                if inv_b > 0.0 {
                    if let Some(object) = store.get_mut(partner) {
                        object.displace(-correction * inv_b);
                    }
                }
                resolved += 1;
            }

            if let Some(object) = store.get_mut(partner) {
                object.contacts.remove_partner(id);
            }
        }

        if let Some(object) = store.get_mut(id) {
            object.contacts.clear();
        }
    }

    resolved
}
