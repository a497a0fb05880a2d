//! Bounding boxes and an R-tree over layer envelopes

use geo::{BoundingRect, Geometry};
use rstar::{RTree, RTreeObject, AABB};

/// Axis-aligned bounding box tagged with the index of its feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub index: usize,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(index: usize, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { index, min_x, min_y, max_x, max_y }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb()
    }
}

/// Compute the bounding box of a geometry; `None` for empty geometries
pub fn bounding_box(index: usize, geom: &Geometry<f64>) -> Option<BoundingBox> {
    geom.bounding_rect().map(|rect| {
        BoundingBox::new(index, rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    })
}

/// Envelope index over a slice of geometries
pub struct SpatialIndex {
    rtree: RTree<BoundingBox>,
}

impl SpatialIndex {
    pub fn build<'a>(geoms: impl IntoIterator<Item = &'a Geometry<f64>>) -> Self {
        let boxes = geoms
            .into_iter()
            .enumerate()
            .filter_map(|(i, g)| bounding_box(i, g))
            .collect();
        Self {
            rtree: RTree::bulk_load(boxes),
        }
    }

    /// Indices of geometries whose envelope touches `bbox`, ascending
    pub fn candidates(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&bbox.aabb())
            .map(|b| b.index)
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, Rect};

    #[test]
    fn test_candidates_sorted_and_filtered() {
        let geoms: Vec<Geometry<f64>> = vec![
            Rect::new((0.0, 0.0), (1.0, 1.0)).into(),
            Rect::new((5.0, 5.0), (6.0, 6.0)).into(),
            Point::new(0.5, 0.5).into(),
        ];
        let index = SpatialIndex::build(&geoms);

        let query = BoundingBox::new(0, 0.2, 0.2, 0.8, 0.8);
        assert_eq!(index.candidates(&query), vec![0, 2]);

        let far = BoundingBox::new(0, 10.0, 10.0, 11.0, 11.0);
        assert!(index.candidates(&far).is_empty());
    }

    #[test]
    fn test_bbox_intersects_on_touch() {
        let a = BoundingBox::new(0, 0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(1, 1.0, 0.0, 2.0, 1.0);
        assert!(a.intersects(&b));
    }
}
