//! 2D physics core with a uniform-grid broadphase and impulse-based collision response.
//!
//! # Architecture
//!
//! [`World::step_time`] runs a fixed sequence of phases:
//!
//! 1. Integrate velocities and positions (gravity, forces, friction)
//! 2. Re-index moved objects in the object grid
//! 3. Detect collisions (grid candidates, then exact shape tests)
//! 4. Resolve: impulses from the deepest contacts, then partial position correction,
//!    repeated `resolver_loop_count` times
//! 5. Update sleep states
//! 6. Erase objects scheduled for removal

pub mod broadphase;
pub mod contact;
pub mod narrowphase;
pub mod object;
pub mod rigid_body;
pub mod shape;
pub mod solver;

use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::error::ConfigError;
use crate::math::{BBox, BBox3};

use self::broadphase::{MAX_AXIS_CELLS, ObjectGrid};
use self::contact::{CollisionEvent, ContactMap};
use self::narrowphase::CollisionDetector;
use self::object::{Object, ObjectId, ObjectStore, ObjectTypeId, ObjectTypeRegistry};
use self::rigid_body::IntegrationParams;
use self::shape::Shape;

/// Type name given to the optional boundary walls.
pub const BOUNDARY_WALL_TYPE: &str = "boundary_wall";
/// Thickness of the boundary walls in world units.
const BOUNDARY_WALL_THICKNESS: f32 = 10.0;

/// How contacts are reused across resolver iterations within one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactStrategy {
    /// Detect once per step and resolve the same contact set on every iteration.
    #[default]
    ReuseContacts,
    /// Re-index and detect again before every iteration after the first.
    RedetectEachIteration,
}

/// Configuration for the physics world.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Playable area. Default: 0..1000 on x and y, 0..100 on z.
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub min_z: f32,
    pub max_z: f32,
    /// Size of one world unit in meters. Default: 0.05.
    pub meters_per_unit: f32,
    /// Surround the playable area with stationary walls. Default: false.
    pub boundary_walls: bool,
    /// Object grid leaf size in world units. Default: 100 x 100.
    pub grid_cell_width: f32,
    pub grid_cell_height: f32,
    /// Gravity in m/s². Default: (0, 0, -9.81).
    pub gravity: Vec3,
    /// Impulse/position resolution passes per step. Default: 5.
    pub resolver_loop_count: u32,
    /// Fraction of the penetration removed per pass. Default: `1 / resolver_loop_count`.
    pub resolver_accuracy: Option<f32>,
    pub contact_strategy: ContactStrategy,
    /// Seconds of near-rest before an object falls asleep. `None` disables sleeping.
    /// Default: 1.0.
    pub sleep_time: Option<f32>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1000.0,
            min_y: 0.0,
            max_y: 1000.0,
            min_z: 0.0,
            max_z: 100.0,
            meters_per_unit: 0.05,
            boundary_walls: false,
            grid_cell_width: 100.0,
            grid_cell_height: 100.0,
            gravity: Vec3::new(0.0, 0.0, -9.81),
            resolver_loop_count: 5,
            resolver_accuracy: None,
            contact_strategy: ContactStrategy::ReuseContacts,
            sleep_time: Some(1.0),
        }
    }
}

impl WorldConfig {
    /// Config covering `bbox` with defaults for everything else.
    pub fn with_bounds(bbox: BBox3) -> Self {
        Self {
            min_x: bbox.min.x,
            max_x: bbox.max.x,
            min_y: bbox.min.y,
            max_y: bbox.max.y,
            min_z: bbox.min.z,
            max_z: bbox.max.z,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> BBox3 {
        BBox3::new(
            Vec3::new(self.min_x, self.min_y, self.min_z),
            Vec3::new(self.max_x, self.max_y, self.max_z),
        )
    }

    /// Accuracy used for each position-resolution pass.
    pub fn accuracy(&self) -> f32 {
        match self.resolver_accuracy {
            Some(accuracy) => accuracy,
            None if self.resolver_loop_count > 0 => 1.0 / self.resolver_loop_count as f32,
            None => 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, min, max) in [('x', self.min_x, self.max_x), ('y', self.min_y, self.max_y)] {
            if !(max > min) || !min.is_finite() || !max.is_finite() {
                return Err(ConfigError::InvalidBounds { axis, min, max });
            }
        }
        if !(self.max_z >= self.min_z) || !self.min_z.is_finite() || !self.max_z.is_finite() {
            return Err(ConfigError::InvalidBounds {
                axis: 'z',
                min: self.min_z,
                max: self.max_z,
            });
        }

        let cell_ok = |v: f32| v > 0.0 && v.is_finite();
        if !cell_ok(self.grid_cell_width) || !cell_ok(self.grid_cell_height) {
            return Err(ConfigError::InvalidCellSize {
                width: self.grid_cell_width,
                height: self.grid_cell_height,
            });
        }
        for (axis, extent, cell) in [
            ('x', self.max_x - self.min_x, self.grid_cell_width),
            ('y', self.max_y - self.min_y, self.grid_cell_height),
        ] {
            let cells = extent / cell;
            if !(cells <= MAX_AXIS_CELLS as f32) {
                return Err(ConfigError::TooManyCells {
                    axis,
                    cells,
                    max: MAX_AXIS_CELLS,
                });
            }
        }
        if !(self.meters_per_unit > 0.0) || !self.meters_per_unit.is_finite() {
            return Err(ConfigError::InvalidScale(self.meters_per_unit));
        }
        if let Some(accuracy) = self.resolver_accuracy {
            if !(accuracy > 0.0 && accuracy <= 1.0) {
                return Err(ConfigError::InvalidAccuracy(accuracy));
            }
        }
        Ok(())
    }
}

/// Objects scheduled for removal at the end of the current step.
#[derive(Debug, Default)]
pub struct RemovalQueue {
    pending: Vec<ObjectId>,
    scheduled: HashSet<ObjectId>,
}

impl RemovalQueue {
    /// Schedule `id`. Returns `false` if it was already scheduled.
    pub fn schedule(&mut self, id: ObjectId) -> bool {
        if self.scheduled.insert(id) {
            self.pending.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.scheduled.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn forget(&mut self, id: ObjectId) {
        if self.scheduled.remove(&id) {
            self.pending.retain(|pending| *pending != id);
        }
    }

    fn take(&mut self) -> Vec<ObjectId> {
        self.scheduled.clear();
        std::mem::take(&mut self.pending)
    }
}

/// Counters collected during one [`World::step_time`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Objects whose position was integrated.
    pub integrated: usize,
    /// Objects moved between grid cells.
    pub reindexed: usize,
    /// Colliding pairs found by the first detection pass.
    pub collisions: usize,
    /// Impulses applied over all resolver passes.
    pub impulses: usize,
    /// Pair position corrections over all resolver passes.
    pub resolved: usize,
    /// Objects erased at the end of the step.
    pub removed: usize,
}

/// The physics world: owns every object, the object grid and the step sequence.
pub struct World {
    config: WorldConfig,
    objects: ObjectStore,
    /// Insertion order; integration and detection follow it.
    order: Vec<ObjectId>,
    grid: ObjectGrid,
    detector: CollisionDetector,
    types: ObjectTypeRegistry,
    removals: RemovalQueue,
    last_collisions: Vec<CollisionEvent>,
    boundary_walls: Vec<ObjectId>,
}

impl World {
    /// Create a world. Invalid configuration is logged and produces a degenerate but
    /// usable world.
    pub fn new(config: WorldConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(%err, "invalid world configuration, continuing with degenerate grid");
        }

        let grid = ObjectGrid::new(
            config.bounds().to_2d(),
            config.grid_cell_width,
            config.grid_cell_height,
        );

        let mut world = Self {
            config,
            objects: ObjectStore::with_key(),
            order: Vec::new(),
            grid,
            detector: CollisionDetector::new(),
            types: ObjectTypeRegistry::new(),
            removals: RemovalQueue::default(),
            last_collisions: Vec::new(),
            boundary_walls: Vec::new(),
        };

        if world.config.boundary_walls {
            world.add_boundary_walls();
        }
        world
    }

    /// Create a world, rejecting invalid configuration.
    pub fn try_new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn grid(&self) -> &ObjectGrid {
        &self.grid
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    /// Set gravity in m/s².
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_resolver_loop_count(&mut self, count: u32) {
        self.config.resolver_loop_count = count;
    }

    pub fn set_contact_strategy(&mut self, strategy: ContactStrategy) {
        self.config.contact_strategy = strategy;
    }

    /// Add an object with its initial transform already set.
    pub fn add_object(&mut self, mut object: Object) -> ObjectId {
        let type_id = self.types.intern(object.type_name());
        object.set_type_id(type_id);
        let shape = object.shape;
        object
            .physics
            .derive_inertia(&shape, self.config.meters_per_unit);
        object.contacts = ContactMap::new();
        object.grid_handle = None;

        let id = self.objects.insert(object);
        self.grid.insert(id, &mut self.objects[id]);
        self.order.push(id);

        tracing::debug!(?id, type_id = type_id.0, "added object");
        id
    }

    /// Schedule `id` for removal at the end of the next (or current) step.
    ///
    /// Returns `false` if the object does not exist or is already scheduled.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        self.objects.contains_key(id) && self.removals.schedule(id)
    }

    /// Remove `id` right away, dropping it from the grid and from every partner's contacts.
    pub fn remove_object_now(&mut self, id: ObjectId) -> Option<Object> {
        let object = self.objects.get_mut(id)?;
        self.grid.remove(id, object);
        let partners: Vec<ObjectId> = object.contacts.partners().collect();

        for partner in partners {
            if let Some(other) = self.objects.get_mut(partner) {
                other.contacts.remove_partner(id);
            }
        }

        self.order.retain(|other| *other != id);
        self.boundary_walls.retain(|other| *other != id);
        self.removals.forget(id);

        tracing::debug!(?id, "removed object");
        self.objects.remove(id)
    }

    pub fn is_scheduled_for_removal(&self, id: ObjectId) -> bool {
        self.removals.contains(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    /// Mutable access for gameplay code. Moving an object here leaves the grid stale
    /// until [`World::reindex`] or the next step.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.objects.get(*id).map(|object| (*id, object)))
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn boundary_walls(&self) -> &[ObjectId] {
        &self.boundary_walls
    }

    pub fn type_id(&self, name: &str) -> Option<ObjectTypeId> {
        self.types.get(name)
    }

    pub fn type_name(&self, id: ObjectTypeId) -> Option<&str> {
        self.types.name(id)
    }

    /// Collisions reported by the last step's detection pass.
    pub fn last_collisions(&self) -> &[CollisionEvent] {
        &self.last_collisions
    }

    /// Bring `id`'s grid cells up to date with its current bounding box.
    pub fn reindex(&mut self, id: ObjectId) -> bool {
        match self.objects.get_mut(id) {
            Some(object) => self.grid.update(id, object),
            None => false,
        }
    }

    pub fn objects_within_distance(&self, point: Vec2, distance: f32) -> Vec<ObjectId> {
        self.grid
            .objects_within_distance(point, distance, &self.objects)
    }

    pub fn objects_within_bbox(&self, bbox: &BBox) -> Vec<ObjectId> {
        self.grid.objects_within_bbox(bbox, &self.objects)
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step_time(&mut self, dt: f32) -> StepStats {
        self.step_time_with(dt, |_, _| {})
    }

    /// Advance the simulation by `dt` seconds, reporting each detected collision to
    /// `on_collision`. The callback may schedule removals; they take effect at the end
    /// of the step.
    pub fn step_time_with<F>(&mut self, dt: f32, mut on_collision: F) -> StepStats
    where
        F: FnMut(&CollisionEvent, &mut RemovalQueue),
    {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let order = std::mem::take(&mut self.order);
        let mut stats = StepStats::default();

        // 1. Integrate
        let params = IntegrationParams::new(
            self.config.gravity,
            self.config.meters_per_unit,
            self.config.min_z,
            self.config.max_z,
        );
        rigid_body::integrate_velocities(&mut self.objects, &order, &params, dt);
        stats.integrated = rigid_body::integrate_positions(&mut self.objects, &order, &params, dt);
        rigid_body::clear_forces(&mut self.objects, &order);

        // 2. Re-index
        stats.reindexed = self.reindex_all(&order);

        // 3. Detect
        self.clear_contacts(&order);
        let events = self.detector.detect(&mut self.objects, &self.grid, &order);
        stats.collisions = events.len();
        for event in &events {
            on_collision(event, &mut self.removals);
        }
        self.last_collisions = events;

        // 4. Resolve
        self.resolve(&order, &mut stats);

        // 5. Sleep
        if let Some(sleep_time) = self.config.sleep_time {
            rigid_body::update_sleep_states(&mut self.objects, &order, sleep_time, dt);
        }

        self.order = order;

        // 6. Erase scheduled objects
        for id in self.removals.take() {
            if self.remove_object_now(id).is_some() {
                stats.removed += 1;
            }
        }

        tracing::trace!(
            integrated = stats.integrated,
            reindexed = stats.reindexed,
            collisions = stats.collisions,
            impulses = stats.impulses,
            resolved = stats.resolved,
            removed = stats.removed,
            "physics step"
        );
        stats
    }

    fn resolve(&mut self, order: &[ObjectId], stats: &mut StepStats) {
        let loops = self.config.resolver_loop_count;
        if loops == 0 {
            self.clear_contacts(order);
            return;
        }

        let accuracy = self.config.accuracy();
        let mpu = self.config.meters_per_unit;
        let snapshot = match self.config.contact_strategy {
            ContactStrategy::ReuseContacts => self.snapshot_contacts(order),
            ContactStrategy::RedetectEachIteration => Vec::new(),
        };

        for iteration in 0..loops {
            if iteration > 0 {
                match self.config.contact_strategy {
                    ContactStrategy::ReuseContacts => self.restore_contacts(&snapshot),
                    ContactStrategy::RedetectEachIteration => {
                        stats.reindexed += self.reindex_all(order);
                        self.detector.detect(&mut self.objects, &self.grid, order);
                    }
                }
            }

            stats.impulses +=
                solver::generate_impulses_from_deepest_contacts(&mut self.objects, order, mpu);
            stats.resolved += solver::resolve_positions(&mut self.objects, order, accuracy);
            self.clear_contacts(order);
        }

        stats.reindexed += self.reindex_all(order);
    }

    fn reindex_all(&mut self, order: &[ObjectId]) -> usize {
        let mut moved = 0;
        for &id in order {
            if let Some(object) = self.objects.get_mut(id) {
                if self.grid.update(id, object) {
                    moved += 1;
                }
            }
        }
        moved
    }

    fn clear_contacts(&mut self, order: &[ObjectId]) {
        for &id in order {
            if let Some(object) = self.objects.get_mut(id) {
                object.contacts.clear();
            }
        }
    }

    fn snapshot_contacts(&self, order: &[ObjectId]) -> Vec<(ObjectId, ContactMap)> {
        order
            .iter()
            .filter_map(|id| {
                let object = self.objects.get(*id)?;
                (!object.contacts.is_empty()).then(|| (*id, object.contacts.clone()))
            })
            .collect()
    }

    fn restore_contacts(&mut self, snapshot: &[(ObjectId, ContactMap)]) {
        for (id, contacts) in snapshot {
            if let Some(object) = self.objects.get_mut(*id) {
                object.contacts = contacts.clone();
            }
        }
    }

    fn add_boundary_walls(&mut self) {
        let bounds = self.config.bounds().to_2d();
        let t = BOUNDARY_WALL_THICKNESS;
        let (w, h) = (bounds.width(), bounds.height());
        let center = bounds.center();
        let z = self.config.min_z;

        let walls = [
            (Vec2::new(bounds.x1 - t * 0.5, center.y), Shape::rect(t, h + 2.0 * t)),
            (Vec2::new(bounds.x2 + t * 0.5, center.y), Shape::rect(t, h + 2.0 * t)),
            (Vec2::new(center.x, bounds.y1 - t * 0.5), Shape::rect(w + 2.0 * t, t)),
            (Vec2::new(center.x, bounds.y2 + t * 0.5), Shape::rect(w + 2.0 * t, t)),
        ];

        for (location, shape) in walls {
            let wall = Object::new(BOUNDARY_WALL_TYPE, shape)
                .with_mass(0.0)
                .with_location(location.extend(z))
                .stationary();
            let id = self.add_object(wall);
            self.boundary_walls.push(id);
        }
    }
}
