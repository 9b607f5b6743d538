//! Contact data structures for collision response.

use std::collections::HashMap;

use glam::Vec2;

use super::object::ObjectId;

/// Result of a narrowphase test between shapes A and B, seen from A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactInfo {
    /// Contact normal, pointing out of B toward A.
    pub normal: Vec2,
    /// Penetration depth.
    pub depth: f32,
    /// Contact point in world space.
    pub point: Vec2,
}

/// A single contact between the owning object and `partner`.
///
/// Contacts live for one step: the collision detector creates them and the solver
/// consumes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub partner: ObjectId,
    /// Contact point in world space.
    pub point: Vec2,
    /// Unit normal pointing out of the partner, toward the owner.
    pub normal: Vec2,
    /// Interpenetration depth.
    pub depth: f32,
}

/// Contacts of one object, grouped by partner.
#[derive(Debug, Clone, Default)]
pub struct ContactMap {
    by_partner: HashMap<ObjectId, Vec<Contact>>,
}

impl ContactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contact: Contact) {
        self.by_partner
            .entry(contact.partner)
            .or_default()
            .push(contact);
    }

    /// The contact with the largest depth over all partners. The first maximum found wins.
    pub fn deepest(&self) -> Option<Contact> {
        deepest_of(self.by_partner.values().flatten())
    }

    /// The deepest contact for every partner.
    pub fn deepest_per_partner(&self) -> Vec<Contact> {
        self.by_partner
            .values()
            .filter_map(|contacts| deepest_of(contacts.iter()))
            .collect()
    }

    pub fn contacts_with(&self, partner: ObjectId) -> &[Contact] {
        self.by_partner
            .get(&partner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_partner(&self, partner: ObjectId) -> bool {
        self.by_partner.contains_key(&partner)
    }

    /// Drop every contact with `partner`. Returns whether any existed.
    pub fn remove_partner(&mut self, partner: ObjectId) -> bool {
        self.by_partner.remove(&partner).is_some()
    }

    pub fn partners(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.by_partner.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.by_partner.values().flatten()
    }

    pub fn clear(&mut self) {
        self.by_partner.clear();
    }

    /// Total number of contacts.
    pub fn len(&self) -> usize {
        self.by_partner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_partner.is_empty()
    }
}

fn deepest_of<'a>(contacts: impl Iterator<Item = &'a Contact>) -> Option<Contact> {
    let mut best: Option<Contact> = None;
    for contact in contacts {
        if best.map_or(true, |b| contact.depth > b.depth) {
            best = Some(*contact);
        }
    }
    best
}

/// Reported once per colliding pair and detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub object: ObjectId,
    pub partner: ObjectId,
    pub point: Vec2,
    /// Normal pointing out of `partner`, toward `object`.
    pub normal: Vec2,
    pub depth: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<ObjectId> {
        let mut sm: SlotMap<ObjectId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn contact(partner: ObjectId, depth: f32) -> Contact {
        Contact {
            partner,
            point: Vec2::ZERO,
            normal: Vec2::X,
            depth,
        }
    }

    #[test]
    fn test_deepest_over_partners() {
        let ids = ids(2);
        let mut map = ContactMap::new();
        map.add(contact(ids[0], 0.5));
        map.add(contact(ids[1], 2.0));
        map.add(contact(ids[0], 1.0));

        let deepest = map.deepest().unwrap();
        assert_eq!(deepest.partner, ids[1]);
        assert_eq!(deepest.depth, 2.0);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_deepest_per_partner() {
        let ids = ids(2);
        let mut map = ContactMap::new();
        map.add(contact(ids[0], 0.5));
        map.add(contact(ids[0], 1.5));
        map.add(contact(ids[1], 0.25));

        let mut deepest = map.deepest_per_partner();
        deepest.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        assert_eq!(deepest.len(), 2);
        assert_eq!(deepest[0].depth, 0.25);
        assert_eq!(deepest[1].depth, 1.5);
    }

    #[test]
    fn test_empty_map_has_no_deepest() {
        let map = ContactMap::new();
        assert!(map.deepest().is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn test_remove_partner() {
        let ids = ids(2);
        let mut map = ContactMap::new();
        map.add(contact(ids[0], 0.5));
        map.add(contact(ids[1], 0.5));
        assert!(map.remove_partner(ids[0]));
        assert!(!map.remove_partner(ids[0]));
        assert!(!map.has_partner(ids[0]));
        assert_eq!(map.contacts_with(ids[1]).len(), 1);
        map.clear();
        assert!(map.is_empty());
    }
}
