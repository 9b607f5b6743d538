//! MiniCore
//!
//! A small 2D physics core for top-down racing games, with a 2.5D Z axis for height.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - Bounding boxes, segments and vector helpers on top of glam
//! 2. **physics::object** - Simulated objects, their physics component and type ids
//! 3. **physics::broadphase** - Uniform object grid for candidate pairs and spatial queries
//! 4. **physics::narrowphase** - Exact circle/rect tests producing per-object contacts
//! 5. **physics::solver** - Restitution impulses and partial position correction
//! 6. **physics** - [`World`], which owns everything and runs the step sequence

pub mod error;
pub mod math;
pub mod physics;

// Re-export commonly used types
pub use error::ConfigError;

pub use math::{BBox, BBox3, Segment, VectorExt};

pub use physics::broadphase::ObjectGrid;
pub use physics::contact::{CollisionEvent, Contact, ContactMap};
pub use physics::object::{Object, ObjectId, ObjectTypeId, PhysicsComponent};
pub use physics::shape::Shape;
pub use physics::{ContactStrategy, RemovalQueue, StepStats, World, WorldConfig};

// Re-export glam for convenience
pub use glam;
