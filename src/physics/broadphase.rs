//! Broadphase collision detection using a uniform object grid.
//!
//! The grid covers the world area with `hor_size x ver_size` cells. Each object is
//! registered in every cell its bounding box touches, and the touched index range is
//! cached on the object as a [`GridHandle`] so removal never depends on the object's
//! current (possibly already moved) bounding box.

use std::collections::HashSet;

use glam::Vec2;

use crate::math::BBox;

use super::object::{GridHandle, Object, ObjectId, ObjectStore};

/// Upper bound on cells along either grid axis.
pub const MAX_AXIS_CELLS: usize = 1024;

/// Uniform grid spatial index.
#[derive(Debug)]
pub struct ObjectGrid {
    bbox: BBox,
    hor_size: usize,
    ver_size: usize,
    /// Cells per world unit along x.
    help_hor: f32,
    /// Cells per world unit along y.
    help_ver: f32,
    /// Row-major, indexed by `j * hor_size + i`.
    cells: Vec<HashSet<ObjectId>>,
    members: HashSet<ObjectId>,
}

impl ObjectGrid {
    /// Create a grid over `bbox` with leaves of roughly `leaf_width x leaf_height`.
    ///
    /// Each axis gets between one and [`MAX_AXIS_CELLS`] cells, so leaves over a very
    /// large area may come out bigger than requested. Non-positive or non-finite leaf
    /// sizes collapse that axis to a single cell.
    pub fn new(bbox: BBox, leaf_width: f32, leaf_height: f32) -> Self {
        let hor_size = axis_size(bbox.width(), leaf_width);
        let ver_size = axis_size(bbox.height(), leaf_height);
        let help_hor = axis_scale(hor_size, bbox.width());
        let help_ver = axis_scale(ver_size, bbox.height());

        tracing::debug!(
            hor_size,
            ver_size,
            leaf_width,
            leaf_height,
            "created object grid"
        );

        Self {
            bbox,
            hor_size,
            ver_size,
            help_hor,
            help_ver,
            cells: vec![HashSet::new(); hor_size * ver_size],
            members: HashSet::new(),
        }
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Grid dimensions as `(horizontal, vertical)` cell counts.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.hor_size, self.ver_size)
    }

    /// Number of distinct objects in the grid.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.members.contains(&id)
    }

    /// Objects registered in cell `(i, j)`.
    pub fn cell(&self, i: usize, j: usize) -> Option<&HashSet<ObjectId>> {
        if i < self.hor_size && j < self.ver_size {
            self.cells.get(j * self.hor_size + i)
        } else {
            None
        }
    }

    /// Cells covered by `bbox`, clamped to the grid.
    pub fn index_range(&self, bbox: &BBox) -> GridHandle {
        GridHandle {
            i0: clamp_index((bbox.x1 - self.bbox.x1) * self.help_hor, self.hor_size),
            i1: clamp_index((bbox.x2 - self.bbox.x1) * self.help_hor, self.hor_size),
            j0: clamp_index((bbox.y1 - self.bbox.y1) * self.help_ver, self.ver_size),
            j1: clamp_index((bbox.y2 - self.bbox.y1) * self.help_ver, self.ver_size),
        }
    }

    /// Register `object` in every cell its bounding box touches and cache that range on it.
    ///
    /// An object that is already registered is removed first.
    pub fn insert(&mut self, id: ObjectId, object: &mut Object) {
        if object.grid_handle.is_some() {
            self.remove(id, object);
        }

        let handle = self.index_range(&object.bbox());
        for index in self.cell_indices(handle) {
            self.cells[index].insert(id);
        }
        object.grid_handle = Some(handle);
        self.members.insert(id);
    }

    /// Remove `object` from the cells recorded in its handle.
    ///
    /// Returns `false` if the object was not in the grid.
    pub fn remove(&mut self, id: ObjectId, object: &mut Object) -> bool {
        let handle = match object.grid_handle.take() {
            Some(handle) => handle,
            None => return false,
        };

        let mut removed = false;
        for index in self.cell_indices(handle) {
            removed |= self.cells[index].remove(&id);
        }
        self.members.remove(&id);
        removed
    }

    /// Re-insert `object` if its bounding box now covers different cells.
    ///
    /// Returns whether the object was moved between cells.
    pub fn update(&mut self, id: ObjectId, object: &mut Object) -> bool {
        let fresh = self.index_range(&object.bbox());
        if object.grid_handle == Some(fresh) {
            return false;
        }
        self.insert(id, object);
        true
    }

    pub fn clear(&mut self, store: &mut ObjectStore) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for id in self.members.drain() {
            if let Some(object) = store.get_mut(id) {
                object.grid_handle = None;
            }
        }
    }

    /// Objects whose bounding box intersects `bbox`.
    pub fn objects_within_bbox(&self, bbox: &BBox, store: &ObjectStore) -> Vec<ObjectId> {
        self.candidates(self.index_range(bbox))
            .into_iter()
            .filter(|id| {
                store
                    .get(*id)
                    .map_or(false, |object| object.bbox().intersects(bbox))
            })
            .collect()
    }

    /// Objects whose center lies within `distance` of `point`.
    pub fn objects_within_distance(
        &self,
        point: Vec2,
        distance: f32,
        store: &ObjectStore,
    ) -> Vec<ObjectId> {
        let distance = distance.max(0.0);
        let query = BBox::from_center(point, Vec2::splat(distance));
        let max_dist_sq = distance * distance;

        self.candidates(self.index_range(&query))
            .into_iter()
            .filter(|id| {
                store.get(*id).map_or(false, |object| {
                    object.location_2d().distance_squared(point) <= max_dist_sq
                })
            })
            .collect()
    }

    /// Broadphase candidates for `id`: other objects whose bounding box intersects its own.
    ///
    /// Pairs where both objects are sleeping are skipped, as are objects that bypass
    /// collisions. The object itself is never returned.
    pub fn bbox_collisions(&self, id: ObjectId, store: &ObjectStore) -> Vec<ObjectId> {
        let object = match store.get(id) {
            Some(object) if !object.bypass_collisions => object,
            _ => return Vec::new(),
        };

        let bbox = object.bbox();
        let sleeping = object.is_sleeping();

        self.candidates(self.index_range(&bbox))
            .into_iter()
            .filter(|other_id| *other_id != id)
            .filter(|other_id| {
                store.get(*other_id).map_or(false, |other| {
                    !other.bypass_collisions
                        && !(sleeping && other.is_sleeping())
                        && bbox.intersects(&other.bbox())
                })
            })
            .collect()
    }

    /// Union of the object sets of all cells in `range`, in row-major scan order.
    fn candidates(&self, range: GridHandle) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for index in self.cell_indices(range) {
            for id in &self.cells[index] {
                if seen.insert(*id) {
                    result.push(*id);
                }
            }
        }
        result
    }

    fn cell_indices(&self, range: GridHandle) -> impl Iterator<Item = usize> {
        let hor_size = self.hor_size;
        (range.j0..=range.j1)
            .flat_map(move |j| (range.i0..=range.i1).map(move |i| j * hor_size + i))
    }
}

fn axis_size(world_extent: f32, leaf: f32) -> usize {
    if !(leaf > 0.0) || !leaf.is_finite() || !(world_extent > 0.0) {
        return 1;
    }
    let size = world_extent / leaf;
    if size.is_finite() {
        (size as usize).clamp(1, MAX_AXIS_CELLS)
    } else {
        1
    }
}

fn axis_scale(size: usize, world_extent: f32) -> f32 {
    if world_extent > 0.0 {
        size as f32 / world_extent
    } else {
        0.0
    }
}

/// Map a scaled coordinate to a cell index in `[0, size - 1]`. NaN maps to 0.
#[inline]
fn clamp_index(value: f32, size: usize) -> usize {
    if !(value > 0.0) {
        0
    } else if value >= size as f32 {
        size - 1
    } else {
        value as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::shape::Shape;
    use glam::Vec3;

    fn world_grid() -> ObjectGrid {
        // 10 x 10 cells of 10 x 10 units
        ObjectGrid::new(BBox::new(0.0, 0.0, 100.0, 100.0), 10.0, 10.0)
    }

    fn spawn(store: &mut ObjectStore, grid: &mut ObjectGrid, object: Object) -> ObjectId {
        let id = store.insert(object);
        grid.insert(id, &mut store[id]);
        id
    }

    fn cells_containing(grid: &ObjectGrid, id: ObjectId) -> Vec<(usize, usize)> {
        let (w, h) = grid.dimensions();
        let mut cells = Vec::new();
        for j in 0..h {
            for i in 0..w {
                if grid.cell(i, j).map_or(false, |c| c.contains(&id)) {
                    cells.push((i, j));
                }
            }
        }
        cells
    }

    fn circle_at(x: f32, y: f32, r: f32) -> Object {
        Object::new("ball", Shape::circle(r)).with_location(Vec3::new(x, y, 0.0))
    }

    #[test]
    fn test_dimensions() {
        let grid = world_grid();
        assert_eq!(grid.dimensions(), (10, 10));

        let degenerate = ObjectGrid::new(BBox::new(0.0, 0.0, 100.0, 100.0), 0.0, -3.0);
        assert_eq!(degenerate.dimensions(), (1, 1));

        let huge = ObjectGrid::new(BBox::new(0.0, 0.0, 1.0e12, 1.0e12), 1.0, 1.0);
        assert_eq!(huge.dimensions(), (MAX_AXIS_CELLS, MAX_AXIS_CELLS));
        let thin = ObjectGrid::new(BBox::new(0.0, 0.0, 1.0e12, 100.0), 1.0e-3, 10.0);
        assert_eq!(thin.dimensions(), (MAX_AXIS_CELLS, 10));

        let oversized = ObjectGrid::new(BBox::new(0.0, 0.0, 100.0, 100.0), 500.0, 500.0);
        assert_eq!(oversized.dimensions(), (1, 1));
    }

    #[test]
    fn test_insert_covers_footprint() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let id = spawn(&mut store, &mut grid, circle_at(15.0, 15.0, 2.0));

        // bbox (13,13)-(17,17) sits inside cell (1,1)
        assert_eq!(cells_containing(&grid, id), vec![(1, 1)]);

        let wide = spawn(&mut store, &mut grid, circle_at(20.0, 25.0, 3.0));
        // bbox (17,22)-(23,28) spans columns 1..=2 in row 2
        assert_eq!(cells_containing(&grid, wide), vec![(1, 2), (2, 2)]);
        assert_eq!(store[wide].grid_handle().unwrap().cell_count(), 2);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_remove_uses_cached_range() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let id = spawn(&mut store, &mut grid, circle_at(15.0, 15.0, 2.0));

        // Move the object without re-inserting: removal must still clean the old cells
        store[id].location = Vec3::new(85.0, 85.0, 0.0);
        assert!(grid.remove(id, &mut store[id]));
        assert!(cells_containing(&grid, id).is_empty());
        assert!(!grid.contains(id));
        assert!(store[id].grid_handle().is_none());

        // Second removal reports nothing to do
        assert!(!grid.remove(id, &mut store[id]));
    }

    #[test]
    fn test_reinsert_matches_fresh_insert() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let id = spawn(&mut store, &mut grid, circle_at(15.0, 15.0, 2.0));

        store[id].location = Vec3::new(49.0, 51.0, 0.0);
        grid.remove(id, &mut store[id]);
        grid.insert(id, &mut store[id]);
        let reinserted = cells_containing(&grid, id);

        let mut fresh_store = ObjectStore::with_key();
        let mut fresh_grid = world_grid();
        let fresh = spawn(&mut fresh_store, &mut fresh_grid, circle_at(49.0, 51.0, 2.0));

        assert_eq!(reinserted, cells_containing(&fresh_grid, fresh));
        assert_eq!(store[id].grid_handle(), fresh_store[fresh].grid_handle());
    }

    #[test]
    fn test_update_only_moves_when_cells_change() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let id = spawn(&mut store, &mut grid, circle_at(15.0, 15.0, 2.0));

        store[id].location.x += 0.5;
        assert!(!grid.update(id, &mut store[id]));

        store[id].location.x += 20.0;
        assert!(grid.update(id, &mut store[id]));
        assert_eq!(cells_containing(&grid, id), vec![(3, 1)]);
    }

    #[test]
    fn test_index_range_clamps_outside_world() {
        let grid = world_grid();
        let far = grid.index_range(&BBox::new(-500.0, -500.0, -400.0, -400.0));
        assert_eq!(
            far,
            GridHandle {
                i0: 0,
                i1: 0,
                j0: 0,
                j1: 0
            }
        );

        let beyond = grid.index_range(&BBox::new(200.0, 300.0, 250.0, 350.0));
        assert_eq!(
            beyond,
            GridHandle {
                i0: 9,
                i1: 9,
                j0: 9,
                j1: 9
            }
        );

        let nan = grid.index_range(&BBox {
            x1: f32::NAN,
            y1: f32::NAN,
            x2: f32::NAN,
            y2: f32::NAN,
        });
        assert_eq!(nan.i0, 0);
        assert_eq!(nan.j1, 0);
    }

    #[test]
    fn test_bbox_collisions_excludes_self() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let a = spawn(&mut store, &mut grid, circle_at(50.0, 50.0, 3.0));
        let b = spawn(&mut store, &mut grid, circle_at(54.0, 50.0, 3.0));
        let _far = spawn(&mut store, &mut grid, circle_at(90.0, 10.0, 3.0));

        let hits = grid.bbox_collisions(a, &store);
        assert_eq!(hits, vec![b]);
        assert!(!hits.contains(&a));
    }

    #[test]
    fn test_sleeping_pairs_skipped() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let a = spawn(&mut store, &mut grid, circle_at(50.0, 50.0, 3.0).stationary());
        let b = spawn(&mut store, &mut grid, circle_at(52.0, 50.0, 3.0).stationary());

        assert!(grid.bbox_collisions(a, &store).is_empty());
        assert!(grid.bbox_collisions(b, &store).is_empty());

        // Only one sleeper: the pair is produced from both sides
        store[b].stationary = false;
        assert_eq!(grid.bbox_collisions(a, &store), vec![b]);
        assert_eq!(grid.bbox_collisions(b, &store), vec![a]);
    }

    #[test]
    fn test_bypassing_objects_ignored() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let a = spawn(&mut store, &mut grid, circle_at(50.0, 50.0, 3.0));
        let particle = spawn(
            &mut store,
            &mut grid,
            circle_at(51.0, 50.0, 1.0).bypassing_collisions(),
        );

        assert!(grid.bbox_collisions(a, &store).is_empty());
        assert!(grid.bbox_collisions(particle, &store).is_empty());
        // Still visible to spatial queries
        assert_eq!(
            grid.objects_within_distance(Vec2::new(51.0, 50.0), 0.5, &store),
            vec![particle]
        );
    }

    #[test]
    fn test_objects_within_bbox_and_distance() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let near = spawn(&mut store, &mut grid, circle_at(20.0, 20.0, 1.0));
        let mid = spawn(&mut store, &mut grid, circle_at(26.0, 20.0, 1.0));
        let _far = spawn(&mut store, &mut grid, circle_at(70.0, 70.0, 1.0));

        let mut in_box = grid.objects_within_bbox(&BBox::new(15.0, 15.0, 30.0, 25.0), &store);
        in_box.sort();
        let mut expected = vec![near, mid];
        expected.sort();
        assert_eq!(in_box, expected);

        let close = grid.objects_within_distance(Vec2::new(20.0, 20.0), 5.0, &store);
        assert_eq!(close, vec![near]);

        let mut wider = grid.objects_within_distance(Vec2::new(20.0, 20.0), 6.0, &store);
        wider.sort();
        assert_eq!(wider, expected);
    }

    #[test]
    fn test_empty_grid_queries() {
        let store = ObjectStore::with_key();
        let grid = world_grid();
        assert!(grid
            .objects_within_bbox(&BBox::new(-10.0, -10.0, 500.0, 500.0), &store)
            .is_empty());
        assert!(grid
            .objects_within_distance(Vec2::new(1e9, -1e9), 10.0, &store)
            .is_empty());
    }

    #[test]
    fn test_clear_drops_handles() {
        let mut store = ObjectStore::with_key();
        let mut grid = world_grid();
        let id = spawn(&mut store, &mut grid, circle_at(20.0, 20.0, 1.0));
        grid.clear(&mut store);
        assert!(grid.is_empty());
        assert!(store[id].grid_handle().is_none());
        assert!(cells_containing(&grid, id).is_empty());
    }
}
