//! Directed line segment.

use glam::Vec2;

/// Directed segment from `from` to `to`.
///
/// Narrowphase tests use it to describe the path from a penetrating point back to the
/// center of the object that owns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Vec2,
    pub to: Vec2,
}

impl Segment {
    pub fn new(from: Vec2, to: Vec2) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn vector(&self) -> Vec2 {
        self.to - self.from
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.vector().length()
    }
}
