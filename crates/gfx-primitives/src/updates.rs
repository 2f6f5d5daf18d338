//! Fixed-capacity dirty-region aggregator with bounding-box collapse.

use crate::geometry::Rectangle;

/// Collects non-overlapping dirty regions up to a fixed capacity, falling
/// back to a single bounding rectangle once that capacity is exhausted. A
/// single tracked region *is* the bounding box (there is no separate
/// "collapsed" state): once collapsed, a later non-merging add can push a
/// second region again and the list re-expands, exactly as the original
/// `dfb_updates_add` re-seeds `num_regions = 1` on collapse rather than
/// latching a permanent collapsed flag.
#[derive(Debug, Clone)]
pub struct Updates {
    max: usize,
    regions: Vec<Rectangle>,
    bounding: Rectangle,
}

impl Updates {
    pub fn new(max: usize) -> Self {
        Self {
            max: max.max(1),
            regions: Vec::with_capacity(max.max(1)),
            bounding: Rectangle::default(),
        }
    }

    pub fn reset(&mut self) {
        self.regions.clear();
        self.bounding = Rectangle::default();
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn bounding(&self) -> Rectangle {
        self.bounding
    }

    /// Adds `region` to the aggregator. If it extends or intersects any
    /// currently tracked region, it is unioned into that region in place and
    /// the bounding box is recomputed; otherwise it is appended. Once
    /// capacity is exhausted, the tracked list collapses to a single
    /// bounding rectangle; a later non-merging add re-expands past that
    /// single rectangle before potentially collapsing again.
    pub fn add(&mut self, region: Rectangle) {
        if region.is_empty() {
            return;
        }

        if self.regions.is_empty() {
            self.regions.push(region);
            self.bounding = region;
            return;
        }

        if let Some(slot) = self
            .regions
            .iter_mut()
            .find(|existing| existing.extends_or_intersects(&region))
        {
            *slot = slot.union(&region);
            self.bounding = self.bounding.union(&region);
            return;
        }

        self.bounding = self.bounding.union(&region);

        if self.regions.len() == self.max {
            self.regions.clear();
            self.regions.push(self.bounding);
        } else {
            self.regions.push(region);
        }
    }

    /// Returns either the tracked region list or the single bounding
    /// rectangle, whichever is estimated cheaper to repaint: the list wins
    /// when `total_area < bounding_area * n / (n + 1)`, with
    /// `n = max - num + 1` (fewer remaining slots favors collapsing sooner).
    pub fn get_rectangles(&self) -> &[Rectangle] {
        if self.regions.len() <= 1 {
            return &self.regions;
        }

        let num = self.regions.len();
        let n = (self.max.saturating_sub(num) + 1) as i64;
        let total: i64 = self.regions.iter().map(Rectangle::area).sum();
        let bounding_area = self.bounding.area();

        if total * (n + 1) < bounding_area * n {
            &self.regions
        } else {
            std::slice::from_ref(&self.bounding)
        }
    }
}
