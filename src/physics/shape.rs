//! Collision shapes and their geometric queries.
//!
//! Shapes are stored in local space. Every query takes the owner's location and angle
//! (degrees, counter-clockwise) and works in world space.

use glam::{Mat2, Vec2};

use crate::math::{BBox, Segment, VectorExt};

/// Penetration of a point into a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Distance the point has to travel along `normal` to leave the shape.
    pub depth: f32,
    /// Outward unit normal of the shape at the exit side.
    pub normal: Vec2,
}

/// Collision shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    /// Rectangle centered on the owner's location.
    Rect { width: f32, height: f32 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle {
            radius: radius.abs(),
        }
    }

    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            width: width.abs(),
            height: height.abs(),
        }
    }

    /// Radius of the smallest origin-centered circle enclosing the shape.
    #[inline]
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Rect { width, height } => 0.5 * (width * width + height * height).sqrt(),
        }
    }

    /// World-space bounding box.
    pub fn bbox(&self, location: Vec2, angle: f32) -> BBox {
        match *self {
            Shape::Circle { radius } => BBox::from_center(location, Vec2::splat(radius)),
            Shape::Rect { .. } => match self.vertices(location, angle) {
                Some(vertices) => BBox::from_points(vertices),
                None => BBox::from_center(location, Vec2::ZERO),
            },
        }
    }

    /// World-space rectangle corners in counter-clockwise order. `None` for circles.
    pub fn vertices(&self, location: Vec2, angle: f32) -> Option<[Vec2; 4]> {
        match *self {
            Shape::Circle { .. } => None,
            Shape::Rect { width, height } => {
                let rot = Mat2::from_angle(angle.to_radians());
                let (hx, hy) = (width * 0.5, height * 0.5);
                Some([
                    location + rot * Vec2::new(-hx, -hy),
                    location + rot * Vec2::new(hx, -hy),
                    location + rot * Vec2::new(hx, hy),
                    location + rot * Vec2::new(-hx, hy),
                ])
            }
        }
    }

    pub fn contains_point(&self, location: Vec2, angle: f32, point: Vec2) -> bool {
        match *self {
            Shape::Circle { radius } => point.distance_squared(location) < radius * radius,
            Shape::Rect { width, height } => {
                let local = to_local(location, angle, point);
                local.x.abs() < width * 0.5 && local.y.abs() < height * 0.5
            }
        }
    }

    /// Closest point of the shape to `point`. Circles return the boundary point in the
    /// direction of `point`; rectangles clamp `point` into the rectangle.
    pub fn closest_point(&self, location: Vec2, angle: f32, point: Vec2) -> Vec2 {
        match *self {
            Shape::Circle { radius } => {
                let dir = (point - location).normalized_or_zero();
                location + dir * radius
            }
            Shape::Rect { width, height } => {
                let local = to_local(location, angle, point);
                let half = Vec2::new(width * 0.5, height * 0.5);
                to_world(location, angle, local.clamp(-half, half))
            }
        }
    }

    /// How deep `segment.from` sits inside the shape.
    ///
    /// For rectangles the exit edge is the one `segment` crosses on its way out; when
    /// `segment.to` is inside as well, the edge nearest to `segment.from` is used.
    /// Circles always use the radial direction. Returns `None` if `segment.from` is
    /// outside the shape.
    pub fn interpenetration(
        &self,
        location: Vec2,
        angle: f32,
        segment: &Segment,
    ) -> Option<Penetration> {
        if !self.contains_point(location, angle, segment.from) {
            return None;
        }

        match *self {
            Shape::Circle { radius } => {
                let offset = segment.from - location;
                let dist = offset.length();
                let normal = if dist > 1e-6 {
                    offset / dist
                } else {
                    // Point sits on the center, fall back to the segment direction
                    let dir = segment.vector().normalized_or_zero();
                    if dir == Vec2::ZERO {
                        Vec2::X
                    } else {
                        dir
                    }
                };
                Some(Penetration {
                    depth: radius - dist,
                    normal,
                })
            }
            Shape::Rect { width, height } => {
                let half = Vec2::new(width * 0.5, height * 0.5);
                let from = to_local(location, angle, segment.from);
                let to = to_local(location, angle, segment.to);

                let to_inside = to.x.abs() < half.x && to.y.abs() < half.y;
                let local_normal = if to_inside {
                    nearest_edge_normal(from, half)
                } else {
                    exit_edge_normal(from, to - from, half)
                };

                // Distance from the point to the edge line along the edge normal
                let depth = if local_normal.x != 0.0 {
                    half.x - from.x * local_normal.x
                } else {
                    half.y - from.y * local_normal.y
                };

                let rot = Mat2::from_angle(angle.to_radians());
                Some(Penetration {
                    depth,
                    normal: rot * local_normal,
                })
            }
        }
    }

    /// Moment of inertia around the center for a body of uniform density.
    pub fn default_moment_of_inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Rect { width, height } => mass * (width * width + height * height) / 12.0,
        }
    }

    /// Uniformly scaled copy of the shape.
    pub fn scaled(&self, factor: f32) -> Self {
        match *self {
            Shape::Circle { radius } => Shape::circle(radius * factor),
            Shape::Rect { width, height } => Shape::rect(width * factor, height * factor),
        }
    }
}

#[inline]
fn to_local(location: Vec2, angle: f32, point: Vec2) -> Vec2 {
    Mat2::from_angle(-angle.to_radians()) * (point - location)
}

#[inline]
fn to_world(location: Vec2, angle: f32, local: Vec2) -> Vec2 {
    location + Mat2::from_angle(angle.to_radians()) * local
}

/// Outward normal of the edge closest to an interior point.
pub(crate) fn nearest_edge_normal(p: Vec2, half: Vec2) -> Vec2 {
    let candidates = [
        (half.x - p.x, Vec2::X),
        (p.x + half.x, Vec2::NEG_X),
        (half.y - p.y, Vec2::Y),
        (p.y + half.y, Vec2::NEG_Y),
    ];
    let mut best = candidates[0];
    for c in &candidates[1..] {
        if c.0 < best.0 {
            best = *c;
        }
    }
    best.1
}

/// Outward normal of the edge a ray from an interior point leaves through.
fn exit_edge_normal(p: Vec2, dir: Vec2, half: Vec2) -> Vec2 {
    let (tx, nx) = if dir.x > 0.0 {
        ((half.x - p.x) / dir.x, Vec2::X)
    } else if dir.x < 0.0 {
        ((-half.x - p.x) / dir.x, Vec2::NEG_X)
    } else {
        (f32::INFINITY, Vec2::X)
    };
    let (ty, ny) = if dir.y > 0.0 {
        ((half.y - p.y) / dir.y, Vec2::Y)
    } else if dir.y < 0.0 {
        ((-half.y - p.y) / dir.y, Vec2::NEG_Y)
    } else {
        (f32::INFINITY, Vec2::Y)
    };

    if !tx.is_finite() && !ty.is_finite() {
        return nearest_edge_normal(p, half);
    }
    if tx <= ty {
        nx
    } else {
        ny
    }
}
