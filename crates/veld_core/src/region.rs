//! Disjoint-rectangle regions
//!
//! A `Region` is an arbitrary-shaped area stored as a set of
//! non-overlapping rectangles. Union is amortized: repeated invalidation
//! merges into the set instead of growing an unbounded list, which is what
//! keeps redraw cost bounded under repeated `queue_draw` calls.

use smallvec::SmallVec;

use crate::geometry::{Point, Rect};

/// A set of disjoint rectangles
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

/// `a` minus `b`, as up to four disjoint pieces
fn rect_subtract(a: &Rect, b: &Rect) -> SmallVec<[Rect; 4]> {
    let mut out = SmallVec::new();
    let Some(overlap) = a.intersect(b) else {
        out.push(*a);
        return out;
    };
    // Band above the overlap
    if overlap.y > a.y {
        out.push(Rect::new(a.x, a.y, a.width, overlap.y - a.y));
    }
    // Band below the overlap
    if overlap.bottom() < a.bottom() {
        out.push(Rect::new(
            a.x,
            overlap.bottom(),
            a.width,
            a.bottom() - overlap.bottom(),
        ));
    }
    // Left piece within the overlap band
    if overlap.x > a.x {
        out.push(Rect::new(a.x, overlap.y, overlap.x - a.x, overlap.height));
    }
    // Right piece within the overlap band
    if overlap.right() < a.right() {
        out.push(Rect::new(
            overlap.right(),
            overlap.y,
            a.right() - overlap.right(),
            overlap.height,
        ));
    }
    out
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.union_rect(&rect);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The disjoint rectangles making up this region
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Bounding box of the region
    pub fn extents(&self) -> Rect {
        let mut extents = Rect::ZERO;
        for rect in &self.rects {
            extents = extents.union(rect);
        }
        extents
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|r| r.contains(point))
    }

    /// Whether the region fully covers `rect`
    pub fn contains_rect(&self, rect: &Rect) -> bool {
        if rect.is_empty() {
            return true;
        }
        let mut remainder: Vec<Rect> = vec![*rect];
        for covered in &self.rects {
            let mut next = Vec::with_capacity(remainder.len());
            for piece in &remainder {
                next.extend(rect_subtract(piece, covered));
            }
            remainder = next;
            if remainder.is_empty() {
                return true;
            }
        }
        false
    }

    /// Add a rectangle to the region
    pub fn union_rect(&mut self, rect: &Rect) {
        if rect.is_empty() {
            return;
        }
        // Keep only the parts not already covered, so rects stay disjoint.
        let mut pieces: Vec<Rect> = vec![*rect];
        for existing in &self.rects {
            let mut next = Vec::with_capacity(pieces.len());
            for piece in &pieces {
                next.extend(rect_subtract(piece, existing));
            }
            pieces = next;
            if pieces.is_empty() {
                return;
            }
        }
        self.rects.extend(pieces);
        self.coalesce();
    }

    /// Union with another region
    pub fn union(&mut self, other: &Region) {
        for rect in &other.rects {
            self.union_rect(rect);
        }
    }

    /// Remove a rectangle from the region
    pub fn subtract_rect(&mut self, rect: &Rect) {
        if rect.is_empty() || self.rects.is_empty() {
            return;
        }
        let mut next = Vec::with_capacity(self.rects.len());
        for existing in &self.rects {
            next.extend(rect_subtract(existing, rect));
        }
        self.rects = next;
    }

    /// Intersect with a rectangle
    pub fn intersect_rect(&mut self, rect: &Rect) {
        self.rects = self
            .rects
            .iter()
            .filter_map(|r| r.intersect(rect))
            .collect();
    }

    /// Intersect with another region
    pub fn intersect(&mut self, other: &Region) {
        let mut result = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(overlap) = a.intersect(b) {
                    result.push(overlap);
                }
            }
        }
        // Disjoint inputs produce disjoint intersections.
        self.rects = result;
    }

    /// Translate the whole region by a delta
    pub fn offset(&mut self, dx: i32, dy: i32) {
        for rect in &mut self.rects {
            *rect = rect.offset(dx, dy);
        }
    }

    /// Merge adjacent rects that form a larger rect
    fn coalesce(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'outer: for i in 0..self.rects.len() {
                for j in (i + 1)..self.rects.len() {
                    let (a, b) = (self.rects[i], self.rects[j]);
                    let joined = a.union(&b);
                    if joined.width * joined.height == a.width * a.height + b.width * b.height {
                        self.rects[i] = joined;
                        self.rects.swap_remove(j);
                        merged = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

impl PartialEq for Region {
    /// Geometric equality, independent of how the rect set is partitioned
    fn eq(&self, other: &Self) -> bool {
        self.rects.iter().all(|r| other.contains_rect(r))
            && other.rects.iter().all(|r| self.contains_rect(r))
    }
}

impl Eq for Region {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_rect_disjoint() {
        let mut region = Region::new();
        region.union_rect(&Rect::new(0, 0, 10, 10));
        region.union_rect(&Rect::new(20, 0, 10, 10));
        assert_eq!(region.rects().len(), 2);
        assert!(region.contains(Point::new(5, 5)));
        assert!(region.contains(Point::new(25, 5)));
        assert!(!region.contains(Point::new(15, 5)));
    }

    #[test]
    fn test_union_rect_overlapping_stays_disjoint() {
        let mut region = Region::new();
        region.union_rect(&Rect::new(0, 0, 10, 10));
        region.union_rect(&Rect::new(5, 5, 10, 10));
        // No double coverage
        let total: i32 = region.rects().iter().map(|r| r.width * r.height).sum();
        assert_eq!(total, 100 + 100 - 25);
    }

    #[test]
    fn test_repeated_union_amortizes() {
        let mut region = Region::new();
        for _ in 0..100 {
            region.union_rect(&Rect::new(0, 0, 10, 10));
        }
        assert_eq!(region.rects().len(), 1);
    }

    #[test]
    fn test_adjacent_rects_coalesce() {
        let mut region = Region::new();
        region.union_rect(&Rect::new(0, 0, 10, 10));
        region.union_rect(&Rect::new(10, 0, 10, 10));
        assert_eq!(region.rects(), &[Rect::new(0, 0, 20, 10)]);
    }

    #[test]
    fn test_intersect() {
        let mut a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let b = Region::from_rect(Rect::new(5, 5, 10, 10));
        a.intersect(&b);
        assert_eq!(a, Region::from_rect(Rect::new(5, 5, 5, 5)));
    }

    #[test]
    fn test_subtract_rect() {
        let mut region = Region::from_rect(Rect::new(0, 0, 10, 10));
        region.subtract_rect(&Rect::new(0, 0, 10, 5));
        assert_eq!(region, Region::from_rect(Rect::new(0, 5, 10, 5)));
    }

    #[test]
    fn test_contains_rect_across_pieces() {
        let mut region = Region::new();
        region.union_rect(&Rect::new(0, 0, 5, 10));
        region.union_rect(&Rect::new(5, 0, 5, 10));
        // Covered only by both pieces together
        assert!(region.contains_rect(&Rect::new(2, 2, 6, 6)));
        assert!(!region.contains_rect(&Rect::new(2, 2, 10, 6)));
    }

    #[test]
    fn test_equality_ignores_partitioning() {
        let mut a = Region::new();
        a.union_rect(&Rect::new(0, 0, 5, 10));
        a.union_rect(&Rect::new(5, 0, 5, 10));
        let b = Region::from_rect(Rect::new(0, 0, 10, 10));
        assert_eq!(a, b);
    }

    #[test]
    fn test_offset() {
        let mut region = Region::from_rect(Rect::new(0, 0, 10, 10));
        region.offset(3, 4);
        assert_eq!(region.extents(), Rect::new(3, 4, 10, 10));
    }
}
