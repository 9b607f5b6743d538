//! Narrowphase collision detection and contact generation.

use std::collections::HashSet;

use glam::Vec2;

use crate::math::Segment;

use super::broadphase::ObjectGrid;
use super::contact::{CollisionEvent, Contact, ContactInfo};
use super::object::{Object, ObjectId, ObjectStore};
use super::shape::Shape;

/// Turns broadphase candidates into contacts stored on both participants.
#[derive(Debug, Default)]
pub struct CollisionDetector {
    tested: HashSet<(ObjectId, ObjectId)>,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one detection pass over `ids`.
    ///
    /// Every unordered pair is tested once. Contacts are appended to the contact maps of
    /// both objects, and one event per colliding pair is returned.
    pub fn detect(
        &mut self,
        store: &mut ObjectStore,
        grid: &ObjectGrid,
        ids: &[ObjectId],
    ) -> Vec<CollisionEvent> {
        self.tested.clear();
        let mut events = Vec::new();

        for &id in ids {
            match store.get(id) {
                Some(object) if !object.bypass_collisions => {}
                _ => continue,
            }

            for other in grid.bbox_collisions(id, store) {
                let key = if id < other { (id, other) } else { (other, id) };
                if !self.tested.insert(key) {
                    continue;
                }

                let infos = match (store.get(id), store.get(other)) {
                    (Some(a), Some(b)) if may_intersect(a, b) => collide(a, b),
                    _ => continue,
                };
                if infos.is_empty() {
                    continue;
                }

                if let Some(event) = record_contacts(store, id, other, &infos) {
                    events.push(event);
                }
            }
        }

        tracing::trace!(
            objects = ids.len(),
            pairs = self.tested.len(),
            collisions = events.len(),
            "collision detection pass"
        );
        events
    }
}

/// Attach `infos` (seen from `a`) to both objects and build the pair's event.
fn record_contacts(
    store: &mut ObjectStore,
    a: ObjectId,
    b: ObjectId,
    infos: &[ContactInfo],
) -> Option<CollisionEvent> {
    let mut deepest = infos[0];
    for info in &infos[1..] {
        if info.depth > deepest.depth {
            deepest = *info;
        }
    }

    let object_a = store.get_mut(a)?;
    for info in infos {
        object_a.contacts.add(Contact {
            partner: b,
            point: info.point,
            normal: info.normal,
            depth: info.depth,
        });
    }

    let object_b = store.get_mut(b)?;
    for info in infos {
        object_b.contacts.add(Contact {
            partner: a,
            point: info.point,
            normal: -info.normal,
            depth: info.depth,
        });
    }

    Some(CollisionEvent {
        object: a,
        partner: b,
        point: deepest.point,
        normal: deepest.normal,
        depth: deepest.depth,
    })
}

/// Quick rejection using the shapes' bounding radii.
#[inline]
pub fn may_intersect(a: &Object, b: &Object) -> bool {
    let reach = a.shape.bounding_radius() + b.shape.bounding_radius();
    a.location_2d().distance_squared(b.location_2d()) < reach * reach
}

/// Exact shape test. Contacts are reported from `a`'s point of view: normals point out of
/// `b` toward `a`.
pub fn collide(a: &Object, b: &Object) -> Vec<ContactInfo> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.location_2d(), ra, b.location_2d(), rb)
                .into_iter()
                .collect()
        }
        (Shape::Rect { .. }, Shape::Rect { .. }) => rect_rect(a, b),
        (Shape::Rect { .. }, Shape::Circle { radius }) => {
            rect_circle(a, b.location_2d(), radius)
                .map(|info| ContactInfo {
                    normal: -info.normal,
                    ..info
                })
                .into_iter()
                .collect()
        }
        (Shape::Circle { radius }, Shape::Rect { .. }) => {
            rect_circle(b, a.location_2d(), radius).into_iter().collect()
        }
    }
}

/// Circle A against circle B. The normal points from B's center toward A's.
pub fn circle_circle(
    center_a: Vec2,
    radius_a: f32,
    center_b: Vec2,
    radius_b: f32,
) -> Option<ContactInfo> {
    let diff = center_a - center_b;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec2::X };
    let depth = min_dist - dist;

    Some(ContactInfo {
        normal,
        depth,
        point: center_a - normal * (radius_a - depth * 0.5),
    })
}

/// Rectangle against a circle. The normal points out of the rectangle toward the circle.
pub fn rect_circle(rect: &Object, center: Vec2, radius: f32) -> Option<ContactInfo> {
    let location = rect.location_2d();

    if rect.shape.contains_point(location, rect.angle, center) {
        // Center is inside: push out through the nearest edge
        let pen = rect
            .shape
            .interpenetration(location, rect.angle, &Segment::new(center, center))?;
        return Some(ContactInfo {
            normal: pen.normal,
            depth: pen.depth + radius,
            point: center + pen.normal * pen.depth,
        });
    }

    let closest = rect.shape.closest_point(location, rect.angle, center);
    let diff = center - closest;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 {
        diff / dist
    } else {
        (center - location).normalize_or(Vec2::X)
    };

    Some(ContactInfo {
        normal,
        depth: radius - dist,
        point: closest,
    })
}

/// Rectangle against rectangle via vertex containment.
///
/// Each vertex of one rectangle that lies inside the other yields a contact. The depth is
/// measured along the exit edge crossed by the segment from the vertex back to its own
/// rectangle's center.
pub fn rect_rect(a: &Object, b: &Object) -> Vec<ContactInfo> {
    let (loc_a, loc_b) = (a.location_2d(), b.location_2d());
    let mut infos = Vec::new();

    if let Some(vertices) = a.shape.vertices(loc_a, a.angle) {
        for vertex in vertices {
            let segment = Segment::new(vertex, loc_a);
            if let Some(pen) = b.shape.interpenetration(loc_b, b.angle, &segment) {
                infos.push(ContactInfo {
                    normal: pen.normal,
                    depth: pen.depth,
                    point: vertex,
                });
            }
        }
    }

    if let Some(vertices) = b.shape.vertices(loc_b, b.angle) {
        for vertex in vertices {
            let segment = Segment::new(vertex, loc_b);
            if let Some(pen) = a.shape.interpenetration(loc_a, a.angle, &segment) {
                infos.push(ContactInfo {
                    normal: -pen.normal,
                    depth: pen.depth,
                    point: vertex,
                });
            }
        }
    }

    infos
}
