use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point};

/// An entry in the R-tree spatial index: a payload and its bounding box.
#[derive(Debug, Clone)]
pub struct SpatialEntry<T> {
    pub bbox: BBox,
    pub item: T,
}

impl<T> SpatialEntry<T> {
    pub fn new(bbox: BBox, item: T) -> Self {
        Self { bbox, item }
    }
}

fn envelope(bbox: &BBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

impl<T> RTreeObject for SpatialEntry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.bbox)
    }
}

/// Spatial index for point and neighbourhood queries.
pub struct SpatialIndex<T> {
    tree: RTree<SpatialEntry<T>>,
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index in one pass.
    pub fn build(entries: Vec<SpatialEntry<T>>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: SpatialEntry<T>) {
        self.tree.insert(entry);
    }

    /// Find all entries whose bounding box contains the given point.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry<T>> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
            .collect()
    }

    /// Find all entries that touch or overlap `bbox`.
    pub fn query_bbox(&self, bbox: &BBox) -> Vec<&SpatialEntry<T>> {
        self.tree
            .locate_in_envelope_intersecting(&envelope(bbox))
            .collect()
    }

    /// Find all entries no further than `distance` from `bbox` (edge to edge).
    pub fn query_within(&self, bbox: &BBox, distance: f64) -> Vec<&SpatialEntry<T>> {
        self.tree
            .locate_in_envelope_intersecting(&envelope(&bbox.expanded(distance)))
            .filter(|e| e.bbox.gap_to(bbox) <= distance)
            .collect()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry<T>> {
        self.tree.iter()
    }
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
