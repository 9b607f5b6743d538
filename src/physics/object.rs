//! Simulated objects and their physics attributes.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::math::BBox;

use super::contact::ContactMap;
use super::shape::Shape;

slotmap::new_key_type! {
    /// Generational handle of an object owned by a [`World`](super::World).
    pub struct ObjectId;
}

/// Authoritative object storage. Grid cells and contacts refer into it by [`ObjectId`].
pub type ObjectStore = slotmap::SlotMap<ObjectId, Object>;

/// Interned object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectTypeId(pub u32);

impl ObjectTypeId {
    /// Handed out once the registry has run out of ids. Never names a type.
    pub const UNREGISTERED: ObjectTypeId = ObjectTypeId(u32::MAX);
}

/// Interns type-name strings into compact [`ObjectTypeId`]s.
///
/// At most `u32::MAX` distinct names are registered. Further names all map to
/// [`ObjectTypeId::UNREGISTERED`].
#[derive(Debug)]
pub struct ObjectTypeRegistry {
    ids: HashMap<String, ObjectTypeId>,
    names: Vec<String>,
    capacity: usize,
}

impl Default for ObjectTypeRegistry {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            names: Vec::new(),
            capacity: ObjectTypeId::UNREGISTERED.0 as usize,
        }
    }
}

impl ObjectTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, registering it on first use.
    pub fn intern(&mut self, name: &str) -> ObjectTypeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let index = match u32::try_from(self.names.len()) {
            Ok(index) if self.names.len() < self.capacity => index,
            _ => {
                tracing::warn!(
                    type_name = name,
                    registered = self.names.len(),
                    "object type registry is full"
                );
                return ObjectTypeId::UNREGISTERED;
            }
        };
        let id = ObjectTypeId(index);
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<ObjectTypeId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: ObjectTypeId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Inclusive range of grid cells an object was last inserted into.
///
/// Only the object grid reads or writes this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridHandle {
    pub i0: usize,
    pub i1: usize,
    pub j0: usize,
    pub j1: usize,
}

impl GridHandle {
    /// Number of cells covered.
    pub fn cell_count(&self) -> usize {
        (self.i1 - self.i0 + 1) * (self.j1 - self.j0 + 1)
    }
}

/// Mass, velocity and force state of an object.
#[derive(Debug, Clone)]
pub struct PhysicsComponent {
    mass: f32,
    inv_mass: f32,
    moment_of_inertia: f32,
    inv_moment_of_inertia: f32,
    explicit_inertia: bool,
    /// Linear velocity in world units per second.
    pub velocity: Vec3,
    /// Angular velocity in radians per second (counter-clockwise).
    pub angular_velocity: f32,
    pub force_accumulator: Vec3,
    pub torque_accumulator: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient against the ground plane.
    pub xy_friction: f32,
    /// Upper bound for the planar speed, if any.
    pub max_speed: Option<f32>,
    pub(crate) sleeping: bool,
    pub(crate) sleep_timer: f32,
}

impl Default for PhysicsComponent {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inv_mass: 1.0,
            moment_of_inertia: 1.0,
            inv_moment_of_inertia: 1.0,
            explicit_inertia: false,
            velocity: Vec3::ZERO,
            angular_velocity: 0.0,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: 0.0,
            restitution: 0.5,
            xy_friction: 0.0,
            max_speed: None,
            sleeping: false,
            sleep_timer: 0.0,
        }
    }
}

impl PhysicsComponent {
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Set the mass. Zero (or negative) mass means infinite mass.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Moment of inertia in kg·m².
    pub fn moment_of_inertia(&self) -> f32 {
        self.moment_of_inertia
    }

    /// Set the moment of inertia explicitly. It is then kept when the object is added to
    /// a world instead of being derived from the shape.
    pub fn set_moment_of_inertia(&mut self, inertia: f32) {
        self.explicit_inertia = true;
        self.store_inertia(inertia);
    }

    pub fn inv_moment_of_inertia(&self) -> f32 {
        self.inv_moment_of_inertia
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub(crate) fn derive_inertia(&mut self, shape: &Shape, meters_per_unit: f32) {
        if self.explicit_inertia {
            return;
        }
        let physical = shape.scaled(meters_per_unit);
        self.store_inertia(physical.default_moment_of_inertia(self.mass));
    }

    fn store_inertia(&mut self, inertia: f32) {
        self.moment_of_inertia = inertia.max(0.0);
        self.inv_moment_of_inertia = if self.moment_of_inertia > 0.0 {
            1.0 / self.moment_of_inertia
        } else {
            0.0
        };
    }

    pub(crate) fn wake(&mut self) {
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }
}

/// One simulated body.
#[derive(Debug, Clone)]
pub struct Object {
    type_name: String,
    type_id: Option<ObjectTypeId>,
    /// Position of the center. Z is used for layering.
    pub location: Vec3,
    /// Rotation in degrees, counter-clockwise.
    pub angle: f32,
    pub shape: Shape,
    pub physics: PhysicsComponent,
    /// Stationary objects never move and have infinite mass.
    pub stationary: bool,
    /// Objects that skip collision detection entirely (particles).
    pub bypass_collisions: bool,
    /// Objects without this flag are not integrated and are never pushed by collisions.
    pub physics_object: bool,
    pub(crate) contacts: ContactMap,
    pub(crate) grid_handle: Option<GridHandle>,
}

impl Object {
    pub fn new(type_name: impl Into<String>, shape: Shape) -> Self {
        Self {
            type_name: type_name.into(),
            type_id: None,
            location: Vec3::ZERO,
            angle: 0.0,
            shape,
            physics: PhysicsComponent::default(),
            stationary: false,
            bypass_collisions: false,
            physics_object: true,
            contacts: ContactMap::new(),
            grid_handle: None,
        }
    }

    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    pub fn with_angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.physics.set_mass(mass);
        self
    }

    pub fn with_moment_of_inertia(mut self, inertia: f32) -> Self {
        self.physics.set_moment_of_inertia(inertia);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.physics.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.physics.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    pub fn with_xy_friction(mut self, friction: f32) -> Self {
        self.physics.xy_friction = friction.max(0.0);
        self
    }

    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.physics.max_speed = Some(max_speed.max(0.0));
        self
    }

    pub fn stationary(mut self) -> Self {
        self.stationary = true;
        self
    }

    pub fn bypassing_collisions(mut self) -> Self {
        self.bypass_collisions = true;
        self
    }

    pub fn kinematic(mut self) -> Self {
        self.physics_object = false;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Interned type, assigned when the object is added to a world.
    pub fn type_id(&self) -> Option<ObjectTypeId> {
        self.type_id
    }

    pub(crate) fn set_type_id(&mut self, id: ObjectTypeId) {
        self.type_id = Some(id);
    }

    #[inline]
    pub fn location_2d(&self) -> Vec2 {
        self.location.truncate()
    }

    /// World-space bounding box of the shape.
    #[inline]
    pub fn bbox(&self) -> BBox {
        self.shape.bbox(self.location_2d(), self.angle)
    }

    pub fn velocity(&self) -> Vec3 {
        self.physics.velocity
    }

    pub fn angular_velocity(&self) -> f32 {
        self.physics.angular_velocity
    }

    /// Inverse mass as seen by the collision solver.
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.stationary || !self.physics_object {
            0.0
        } else {
            self.physics.inv_mass()
        }
    }

    /// Inverse moment of inertia as seen by the collision solver.
    #[inline]
    pub fn inv_moment_of_inertia(&self) -> f32 {
        if self.stationary || !self.physics_object {
            0.0
        } else {
            self.physics.inv_moment_of_inertia()
        }
    }

    /// True for stationary objects and for objects that have fallen asleep.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.stationary || self.physics.sleeping
    }

    pub fn contacts(&self) -> &ContactMap {
        &self.contacts
    }

    pub fn grid_handle(&self) -> Option<GridHandle> {
        self.grid_handle
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.physics.force_accumulator += force;
        self.physics.wake();
    }

    pub fn add_torque(&mut self, torque: f32) {
        self.physics.torque_accumulator += torque;
        self.physics.wake();
    }

    /// Apply a linear impulse (mass times velocity change).
    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.physics.velocity += impulse * self.inv_mass();
        self.physics.wake();
    }

    /// Apply an angular impulse (moment of inertia times angular velocity change).
    pub fn add_angular_impulse(&mut self, impulse: f32) {
        self.physics.angular_velocity += impulse * self.inv_moment_of_inertia();
        self.physics.wake();
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.physics.velocity = velocity;
        self.physics.wake();
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f32) {
        self.physics.angular_velocity = angular_velocity;
        self.physics.wake();
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.location += offset;
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.angle += degrees;
    }

    pub fn wake(&mut self) {
        self.physics.wake();
    }

    /// Velocity change applied by the collision solver.
    pub(crate) fn apply_velocity_change(&mut self, delta: Vec2, angular_delta: f32) {
        self.physics.velocity += delta.extend(0.0);
        self.physics.angular_velocity += angular_delta;
        self.physics.wake();
    }

    /// Position correction applied by the collision solver.
    pub(crate) fn displace(&mut self, offset: Vec2) {
        self.location += offset.extend(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mass_is_infinite() {
        let object = Object::new("wall", Shape::rect(1.0, 1.0)).with_mass(0.0);
        assert_eq!(object.inv_mass(), 0.0);
    }

    #[test]
    fn test_stationary_has_zero_inverse_mass() {
        let object = Object::new("tire", Shape::circle(1.0))
            .with_mass(10.0)
            .stationary();
        assert_eq!(object.physics.inv_mass(), 0.1);
        assert_eq!(object.inv_mass(), 0.0);
        assert_eq!(object.inv_moment_of_inertia(), 0.0);
        assert!(object.is_sleeping());
    }

    #[test]
    fn test_impulse_changes_velocity_by_inverse_mass() {
        let mut object = Object::new("car", Shape::rect(2.0, 1.0)).with_mass(4.0);
        object.add_impulse(Vec3::new(8.0, 0.0, 0.0));
        assert_eq!(object.velocity(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_derived_inertia_uses_meters_per_unit() {
        let mut object = Object::new("ball", Shape::circle(10.0)).with_mass(2.0);
        let shape = object.shape;
        object.physics.derive_inertia(&shape, 0.1);
        // r = 1 m, I = 0.5 * 2 * 1
        assert!((object.physics.moment_of_inertia() - 1.0).abs() < 1e-5);

        let mut explicit = Object::new("ball", Shape::circle(10.0)).with_moment_of_inertia(7.0);
        explicit.physics.derive_inertia(&shape, 0.1);
        assert_eq!(explicit.physics.moment_of_inertia(), 7.0);
    }

    #[test]
    fn test_type_registry_interns_once() {
        let mut registry = ObjectTypeRegistry::new();
        let car = registry.intern("car");
        let tire = registry.intern("tire");
        assert_ne!(car, tire);
        assert_eq!(registry.intern("car"), car);
        assert_eq!(registry.get("tire"), Some(tire));
        assert_eq!(registry.get("wall"), None);
        assert_eq!(registry.name(car), Some("car"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_type_registry_full() {
        let mut registry = ObjectTypeRegistry::new();
        registry.capacity = 2;
        let car = registry.intern("car");
        registry.intern("tire");

        assert_eq!(registry.intern("wall"), ObjectTypeId::UNREGISTERED);
        assert_eq!(registry.intern("cone"), ObjectTypeId::UNREGISTERED);
        assert_eq!(registry.get("wall"), None);
        assert_eq!(registry.name(ObjectTypeId::UNREGISTERED), None);
        assert_eq!(registry.len(), 2);
        // Names registered before the limit keep their ids
        assert_eq!(registry.intern("car"), car);
    }

    #[test]
    fn test_force_wakes_sleeping_object() {
        let mut object = Object::new("car", Shape::circle(1.0));
        object.physics.sleeping = true;
        assert!(object.is_sleeping());
        object.add_force(Vec3::X);
        assert!(!object.is_sleeping());
    }

    #[test]
    fn test_grid_handle_cell_count() {
        let handle = GridHandle {
            i0: 1,
            i1: 3,
            j0: 0,
            j1: 1,
        };
        assert_eq!(handle.cell_count(), 6);
    }
}
