//! Math primitives: `glam` vectors and matrices plus bounding boxes and segments.

pub mod bbox;
pub mod segment;
pub mod vector;

pub use bbox::{BBox, BBox3};
pub use segment::Segment;
pub use vector::{cross_z, fast_inv_sqrt, VectorExt, EPSILON};
