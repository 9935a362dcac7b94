//! Regions: sets of pixels described by non-overlapping rectangles.
//!
//! Regions are used for the opaque and damage areas of surfaces. They are
//! immutable values: `union`, `subtract` and `intersect_rect` return a new
//! region and never touch the receiver, so a renderer can hold on to a region
//! while the scene moves on.

use std::fmt;

/// An axis-aligned rectangle in integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// A rectangle anchored at the origin.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// The overlapping part of both rectangles, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Self::new(x, y, right - x, bottom - y))
    }

    pub fn contains_rect(&self, other: &Self) -> bool {
        other.is_empty()
            || (self.x <= other.x
                && self.y <= other.y
                && self.right() >= other.right()
                && self.bottom() >= other.bottom())
    }

    /// The parts of `self` not covered by `cut`, as at most four disjoint
    /// rectangles (top and bottom bands, then left and right pieces).
    fn fragments_without(&self, cut: &Self) -> Vec<Self> {
        if !self.intersects(cut) {
            return vec![*self];
        }
        let mut out = Vec::with_capacity(4);
        if self.y < cut.y {
            out.push(Self::new(self.x, self.y, self.width, cut.y - self.y));
        }
        if self.bottom() > cut.bottom() {
            out.push(Self::new(
                self.x,
                cut.bottom(),
                self.width,
                self.bottom() - cut.bottom(),
            ));
        }
        let band_top = self.y.max(cut.y);
        let band_bottom = self.bottom().min(cut.bottom());
        if self.x < cut.x {
            out.push(Self::new(self.x, band_top, cut.x - self.x, band_bottom - band_top));
        }
        if self.right() > cut.right() {
            out.push(Self::new(
                cut.right(),
                band_top,
                self.right() - cut.right(),
                band_bottom - band_top,
            ));
        }
        out
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.width, self.height)
    }
}

/// A set of pixels, stored as disjoint non-empty rectangles.
///
/// Equality is set equality: two regions built from different rectangle
/// decompositions compare equal when they cover the same pixels.
#[derive(Debug, Clone, Default)]
pub struct Region {
    rects: Vec<Rectangle>,
}

impl Region {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rectangle) -> Self {
        if rect.is_empty() {
            Self::empty()
        } else {
            Self { rects: vec![rect] }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rectangle] {
        &self.rects
    }

    /// Number of pixels covered.
    pub fn area(&self) -> i64 {
        self.rects.iter().map(Rectangle::area).sum()
    }

    /// The smallest rectangle containing the whole region.
    pub fn extents(&self) -> Rectangle {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rectangle::default();
        };
        let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.right(), first.bottom());
        for r in iter {
            x1 = x1.min(r.x);
            y1 = y1.min(r.y);
            x2 = x2.max(r.right());
            y2 = y2.max(r.bottom());
        }
        Rectangle::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Adds the pixels of `rect`. Only the part of `rect` not already
    /// covered is stored, which keeps the rectangles disjoint and makes a
    /// repeated union a no-op.
    pub fn union_rect(&self, rect: Rectangle) -> Self {
        if rect.is_empty() {
            return self.clone();
        }
        let mut pending = vec![rect];
        for existing in &self.rects {
            pending = pending
                .iter()
                .flat_map(|p| p.fragments_without(existing))
                .collect();
            if pending.is_empty() {
                break;
            }
        }
        let mut rects = self.rects.clone();
        rects.extend(pending.into_iter().filter(|r| !r.is_empty()));
        Self { rects }
    }

    pub fn union(&self, other: &Region) -> Self {
        other.rects.iter().fold(self.clone(), |acc, r| acc.union_rect(*r))
    }

    pub fn subtract_rect(&self, cut: Rectangle) -> Self {
        if cut.is_empty() {
            return self.clone();
        }
        let rects = self
            .rects
            .iter()
            .flat_map(|r| r.fragments_without(&cut))
            .filter(|r| !r.is_empty())
            .collect();
        Self { rects }
    }

    pub fn subtract(&self, other: &Region) -> Self {
        other.rects.iter().fold(self.clone(), |acc, r| acc.subtract_rect(*r))
    }

    /// Clips the region to `clip`.
    pub fn intersect_rect(&self, clip: Rectangle) -> Self {
        let rects = self
            .rects
            .iter()
            .filter_map(|r| r.intersection(&clip))
            .collect();
        Self { rects }
    }

    /// Whether every pixel of `rect` is inside the region.
    pub fn contains_rect(&self, rect: Rectangle) -> bool {
        Region::from_rect(rect).subtract(self).is_empty()
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.area() == other.area() && self.subtract(other).is_empty()
    }
}

impl Eq for Region {}

impl From<Rectangle> for Region {
    fn from(rect: Rectangle) -> Self {
        Region::from_rect(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rectangle_intersection() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(5, 5, 5, 5)));
        assert_eq!(a.intersection(&Rectangle::new(10, 0, 5, 5)), None);
    }

    #[test]
    fn test_empty_rect_yields_empty_region() {
        assert!(Region::from_rect(Rectangle::new(3, 3, 0, 8)).is_empty());
        assert!(Region::empty().union_rect(Rectangle::new(0, 0, -1, 4)).is_empty());
    }

    #[test]
    fn test_union_is_idempotent() {
        let full = Rectangle::from_size(800, 600);
        let once = Region::empty().union_rect(full);
        let twice = once.union_rect(full).union_rect(full);
        assert_eq!(twice.rects(), once.rects());
        assert_eq!(twice.area(), 800 * 600);
    }

    #[test]
    fn test_union_of_overlapping_rects_keeps_area() {
        let region = Region::empty()
            .union_rect(Rectangle::new(0, 0, 10, 10))
            .union_rect(Rectangle::new(5, 5, 10, 10));
        assert_eq!(region.area(), 100 + 100 - 25);
        assert_eq!(region.extents(), Rectangle::new(0, 0, 15, 15));
        for (i, a) in region.rects().iter().enumerate() {
            for b in &region.rects()[i + 1..] {
                assert!(!a.intersects(b), "{a} overlaps {b}");
            }
        }
    }

    #[test]
    fn test_union_does_not_mutate_receiver() {
        let base = Region::from_rect(Rectangle::new(0, 0, 4, 4));
        let _grown = base.union_rect(Rectangle::new(4, 0, 4, 4));
        assert_eq!(base.area(), 16);
    }

    #[test]
    fn test_subtract_center_leaves_frame() {
        let region = Region::from_rect(Rectangle::new(0, 0, 10, 10))
            .subtract_rect(Rectangle::new(2, 2, 6, 6));
        assert_eq!(region.area(), 100 - 36);
        assert!(!region.contains_rect(Rectangle::new(3, 3, 1, 1)));
        assert!(region.contains_rect(Rectangle::new(0, 0, 10, 2)));
    }

    #[test]
    fn test_equality_ignores_decomposition() {
        let split = Region::empty()
            .union_rect(Rectangle::new(0, 0, 5, 10))
            .union_rect(Rectangle::new(5, 0, 5, 10));
        assert_eq!(split, Region::from_rect(Rectangle::new(0, 0, 10, 10)));
        assert_ne!(split, Region::from_rect(Rectangle::new(0, 0, 10, 9)));
    }

    #[test]
    fn test_intersect_rect_clips() {
        let region = Region::from_rect(Rectangle::new(-10, -10, 100, 100));
        let clipped = region.intersect_rect(Rectangle::from_size(20, 30));
        assert_eq!(clipped, Region::from_rect(Rectangle::from_size(20, 30)));
    }
}
