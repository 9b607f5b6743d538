//! Axis-aligned bounding boxes.

use glam::{Vec2, Vec3};

/// Axis-aligned 2D bounding box defined by two opposite corners.
///
/// Invariant: `x2 >= x1` and `y2 >= y1`. [`BBox::new`] sorts the corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    /// Create a box from any two opposite corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        let half = half_extents.abs();
        Self::new(
            center.x - half.x,
            center.y - half.y,
            center.x + half.x,
            center.y + half.y,
        )
    }

    /// Smallest box containing all `points`. Empty input gives a degenerate box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if !any {
            return Self::default();
        }
        Self::new(min.x, min.y, max.x, max.y)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    /// Overlap test. Boxes that only share an edge do not intersect.
    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x1 < other.x2 && self.x2 > other.x1 && self.y1 < other.y2 && self.y2 > other.y1
    }

    /// True if `other` lies completely inside this box.
    #[inline]
    pub fn contains(&self, other: &BBox) -> bool {
        other.x1 >= self.x1 && other.x2 <= self.x2 && other.y1 >= self.y1 && other.y2 <= self.y2
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            x1: self.x1 + offset.x,
            y1: self.y1 + offset.y,
            x2: self.x2 + offset.x,
            y2: self.y2 + offset.y,
        }
    }
}

/// Axis-aligned 3D bounding box, used for the world extents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3 {
    /// Create a box from any two opposite corners.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn intersects(&self, other: &BBox3) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    pub fn contains(&self, other: &BBox3) -> bool {
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn union(&self, other: &BBox3) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Projection onto the XY plane.
    pub fn to_2d(&self) -> BBox {
        BBox::new(self.min.x, self.min.y, self.max.x, self.max.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sorts_corners() {
        let b = BBox::new(5.0, 6.0, 1.0, 2.0);
        assert_eq!(b, BBox::new(1.0, 2.0, 5.0, 6.0));
        assert_eq!(b.width(), 4.0);
        assert_eq!(b.height(), 4.0);
    }

    #[test]
    fn test_intersects_is_strict() {
        let a = BBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BBox::new(1.0, 1.0, 3.0, 3.0);
        let touching = BBox::new(2.0, 0.0, 4.0, 2.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching), "shared edge should not count as overlap");
    }

    #[test]
    fn test_contains_and_union() {
        let outer = BBox::new(0.0, 0.0, 10.0, 10.0);
        let inner = BBox::new(2.0, 2.0, 3.0, 3.0);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains_point(Vec2::new(10.0, 0.0)));
        assert!(!outer.contains_point(Vec2::new(10.1, 0.0)));

        let far = BBox::new(20.0, -5.0, 21.0, 1.0);
        let u = inner.union(&far);
        assert_eq!(u, BBox::new(2.0, -5.0, 21.0, 3.0));
    }

    #[test]
    fn test_translated() {
        let b = BBox::from_center(Vec2::ZERO, Vec2::splat(1.0)).translated(Vec2::new(4.0, -1.0));
        assert_eq!(b, BBox::new(3.0, -2.0, 5.0, 0.0));
        assert_eq!(b.center(), Vec2::new(4.0, -1.0));
    }

    #[test]
    fn test_from_points() {
        let b = BBox::from_points([Vec2::new(1.0, 5.0), Vec2::new(-2.0, 3.0), Vec2::new(0.0, 7.0)]);
        assert_eq!(b, BBox::new(-2.0, 3.0, 1.0, 7.0));
        assert_eq!(BBox::from_points(std::iter::empty()), BBox::default());
    }

    #[test]
    fn test_bbox3() {
        let a = BBox3::new(Vec3::splat(1.0), Vec3::ZERO);
        assert_eq!(a.min, Vec3::ZERO);
        assert!(a.contains_point(Vec3::splat(0.5)));
        let b = a.translated(Vec3::new(0.5, 0.5, 0.5));
        assert!(a.intersects(&b));
        assert!(a.union(&b).contains(&b));
        assert_eq!(a.to_2d(), BBox::new(0.0, 0.0, 1.0, 1.0));
    }
}
