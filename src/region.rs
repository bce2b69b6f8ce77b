// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Region algebra: sets of axis-aligned, non-overlapping rectangles.
//!
//! Every higher layer (per-client dirty tracking, the update scheduler,
//! CopyRect composition) is built on top of [`Region`]. The representation
//! is a flat, eagerly-normalized list of rectangles rather than an
//! interval/banded tree; screen-update rectangle counts are small enough
//! (tens, not thousands) that this stays cheap and keeps the algebra easy
//! to verify against the invariants in the crate's test suite.

/// An axis-aligned rectangle with integer pixel coordinates.
///
/// Distinct from [`crate::protocol::Rectangle`], which additionally carries
/// an encoding number for the wire format; `Rect` is pure geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width in pixels.
    pub w: u16,
    /// Height in pixels.
    pub h: u16,
}

impl Rect {
    /// Creates a new rectangle. A zero width or height denotes an empty rectangle.
    #[must_use]
    pub fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// `true` if this rectangle has no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    #[must_use]
    fn right(&self) -> i32 {
        self.x as i32 + self.w as i32
    }

    #[must_use]
    fn bottom(&self) -> i32 {
        self.y as i32 + self.h as i32
    }

    /// Intersection of two rectangles, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.right()).min(other.right());
        let y2 = (self.bottom()).min(other.bottom());
        if x2 <= x1 as i32 || y2 <= y1 as i32 {
            return None;
        }
        Some(Rect::new(x1, y1, (x2 - x1 as i32) as u16, (y2 - y1 as i32) as u16))
    }

    /// Translates the rectangle by `(dx, dy)`, clamping to `[0, u16::MAX]`.
    ///
    /// Coordinates that would go negative saturate to 0 rather than wrap;
    /// wire-level wraparound (used for CopyRect source coordinates, which
    /// are allowed to be "negative" on the wire) is handled separately by
    /// the caller at serialization time, not by this geometric helper.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        let x = (self.x as i32 + dx).max(0) as u16;
        let y = (self.y as i32 + dy).max(0) as u16;
        Rect::new(x, y, self.w, self.h)
    }

    /// Smallest rectangle enclosing both `self` and `other`.
    #[must_use]
    pub fn union_bbox(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, (x2 - x1 as i32) as u16, (y2 - y1 as i32) as u16)
    }
}

/// A set of non-overlapping rectangles.
#[derive(Debug, Clone, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// An empty region.
    #[must_use]
    pub fn empty() -> Self {
        Self { rects: Vec::new() }
    }

    /// A region containing exactly one rectangle (a no-op if it is empty).
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        if rect.is_empty() {
            Self::empty()
        } else {
            Self { rects: vec![rect] }
        }
    }

    /// `true` if the region contains no rectangles with area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of rectangles currently stored (post-normalization).
    #[must_use]
    pub fn rect_count(&self) -> usize {
        self.rects.len()
    }

    /// Rectangles in insertion order.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Forward iterator in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }

    /// Smallest rectangle enclosing every rectangle in the region.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut it = self.rects.iter();
        let first = *it.next()?;
        Some(it.fold(first, |acc, r| acc.union_bbox(r)))
    }

    /// Discards all rectangles.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Unions `other` into `self` in place.
    pub fn union_with(&mut self, other: &Region) {
        if other.is_empty() {
            return;
        }
        self.rects.extend_from_slice(&other.rects);
        simplify(&mut self.rects);
    }

    /// Returns the union of two regions without mutating either.
    #[must_use]
    pub fn union(&self, other: &Region) -> Region {
        let mut r = self.clone();
        r.union_with(other);
        r
    }

    /// Adds a single rectangle to the region in place.
    pub fn add_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.rects.push(rect);
        simplify(&mut self.rects);
    }

    /// Intersection of two regions.
    #[must_use]
    pub fn intersect(&self, other: &Region) -> Region {
        let mut out = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersect(b) {
                    out.push(r);
                }
            }
        }
        simplify(&mut out);
        Region { rects: out }
    }

    /// Intersection with a single rectangle.
    #[must_use]
    pub fn intersect_rect(&self, rect: &Rect) -> Region {
        self.intersect(&Region::new(*rect))
    }

    /// Subtracts `other` from `self`, returning the remainder.
    #[must_use]
    pub fn subtract(&self, other: &Region) -> Region {
        if other.is_empty() || self.is_empty() {
            return self.clone();
        }
        let mut remaining: Vec<Rect> = self.rects.clone();
        for cut in &other.rects {
            let mut next = Vec::new();
            for r in &remaining {
                next.extend(subtract_rect(r, cut));
            }
            remaining = next;
        }
        simplify(&mut remaining);
        Region { rects: remaining }
    }

    /// Subtracts `other` from `self` in place.
    pub fn subtract_with(&mut self, other: &Region) {
        *self = self.subtract(other);
    }

    /// Translates every rectangle in the region by `(dx, dy)`.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32) -> Region {
        let mut rects: Vec<Rect> = self.rects.iter().map(|r| r.offset(dx, dy)).collect();
        simplify(&mut rects);
        Region { rects }
    }

    /// Iteration order for CopyRect rectangle emission: reverse-sorted by x
    /// if `dx > 0`, reverse-sorted by y if `dy > 0`. This prevents a viewer
    /// performing copies in-place from overwriting source pixels it has not
    /// yet read.
    #[must_use]
    pub fn iter_copyrect_order(&self, dx: i32, dy: i32) -> Vec<Rect> {
        let mut rects = self.rects.clone();
        sort_for_copy(&mut rects, dx > 0, dy > 0);
        rects
    }

    /// Iteration order for the scheduler's physical pixel move via
    /// [`crate::framebuffer::Framebuffer::copy_within`]: reverse in x if
    /// `dx < 0`, reverse in y if `dy < 0`.
    #[must_use]
    pub fn iter_docopy_order(&self, dx: i32, dy: i32) -> Vec<Rect> {
        let mut rects = self.rects.clone();
        sort_for_copy(&mut rects, dx < 0, dy < 0);
        rects
    }

    /// Clips every rectangle to `bounds` and drops rectangles that fall
    /// entirely outside it.
    #[must_use]
    pub fn clip(&self, bounds: &Rect) -> Region {
        self.intersect_rect(bounds)
    }
}

fn sort_for_copy(rects: &mut [Rect], rev_x: bool, rev_y: bool) {
    rects.sort_by(|a, b| {
        let by_y = if rev_y {
            b.y.cmp(&a.y)
        } else {
            a.y.cmp(&b.y)
        };
        by_y.then_with(|| if rev_x { b.x.cmp(&a.x) } else { a.x.cmp(&b.x) })
    });
}

/// Subtracts `cut` from `r`, returning zero or more rectangles covering
/// the remainder. Classic "subtract one rectangle from another" split into
/// up to four non-overlapping pieces (top band, bottom band, left band,
/// right band of the intersection).
fn subtract_rect(r: &Rect, cut: &Rect) -> Vec<Rect> {
    let Some(overlap) = r.intersect(cut) else {
        return vec![*r];
    };
    let mut out = Vec::with_capacity(4);

    // Band above the overlap.
    if overlap.y > r.y {
        out.push(Rect::new(r.x, r.y, r.w, overlap.y - r.y));
    }
    // Band below the overlap.
    let r_bottom = r.y as u32 + r.h as u32;
    let overlap_bottom = overlap.y as u32 + overlap.h as u32;
    if overlap_bottom < r_bottom {
        out.push(Rect::new(
            r.x,
            overlap_bottom as u16,
            r.w,
            (r_bottom - overlap_bottom) as u16,
        ));
    }
    // Band left of the overlap, restricted to the overlap's row range.
    if overlap.x > r.x {
        out.push(Rect::new(r.x, overlap.y, overlap.x - r.x, overlap.h));
    }
    // Band right of the overlap, restricted to the overlap's row range.
    let r_right = r.x as u32 + r.w as u32;
    let overlap_right = overlap.x as u32 + overlap.w as u32;
    if overlap_right < r_right {
        out.push(Rect::new(
            overlap_right as u16,
            overlap.y,
            (r_right - overlap_right) as u16,
            overlap.h,
        ));
    }
    out.into_iter().filter(|r| !r.is_empty()).collect()
}

/// Opportunistic normalization: drops empty rectangles and merges a
/// rectangle into a neighbor when one exactly abuts another along a full
/// edge (same row span, adjacent in x, or same column span, adjacent in
/// y). Not a full minimal-cover algorithm — merging is an optimization,
/// not a correctness requirement, since every consumer treats the region
/// as a set, not caring how many rectangles realize it.
fn simplify(rects: &mut Vec<Rect>) {
    rects.retain(|r| !r.is_empty());
    loop {
        let mut merged = false;
        'outer: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if let Some(m) = try_merge(&rects[i], &rects[j]) {
                    rects[i] = m;
                    rects.remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }
}

fn try_merge(a: &Rect, b: &Rect) -> Option<Rect> {
    // Horizontally adjacent, identical vertical span.
    if a.y == b.y && a.h == b.h {
        if a.x as u32 + a.w as u32 == b.x as u32 {
            return Some(Rect::new(a.x, a.y, a.w + b.w, a.h));
        }
        if b.x as u32 + b.w as u32 == a.x as u32 {
            return Some(Rect::new(b.x, b.y, a.w + b.w, a.h));
        }
    }
    // Vertically adjacent, identical horizontal span.
    if a.x == b.x && a.w == b.w {
        if a.y as u32 + a.h as u32 == b.y as u32 {
            return Some(Rect::new(a.x, a.y, a.w, a.h + b.h));
        }
        if b.y as u32 + b.h as u32 == a.y as u32 {
            return Some(Rect::new(b.x, b.y, a.w, a.h + b.h));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region_has_no_bbox() {
        assert!(Region::empty().bounding_box().is_none());
    }

    #[test]
    fn union_merges_adjacent_rects() {
        let mut r = Region::new(Rect::new(0, 0, 10, 10));
        r.add_rect(Rect::new(10, 0, 10, 10));
        assert_eq!(r.rect_count(), 1);
        assert_eq!(r.bounding_box(), Some(Rect::new(0, 0, 20, 10)));
    }

    #[test]
    fn bbox_union_distributes_over_bbox() {
        let r1 = Region::new(Rect::new(0, 0, 5, 5));
        let r2 = Region::new(Rect::new(100, 100, 5, 5));
        let union = r1.union(&r2);
        let lhs = union.bounding_box().unwrap();
        let rhs = r1
            .bounding_box()
            .unwrap()
            .union_bbox(&r2.bounding_box().unwrap());
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn intersect_basic() {
        let a = Region::new(Rect::new(0, 0, 10, 10));
        let b = Region::new(Rect::new(5, 5, 10, 10));
        let i = a.intersect(&b);
        assert_eq!(i.bounding_box(), Some(Rect::new(5, 5, 5, 5)));
    }

    #[test]
    fn subtract_splits_into_remainder() {
        let a = Region::new(Rect::new(0, 0, 10, 10));
        let b = Region::new(Rect::new(3, 3, 4, 4));
        let r = a.subtract(&b);
        // Area should equal 100 - 16 = 84.
        let area: u32 = r.rects().iter().map(|x| x.w as u32 * x.h as u32).sum();
        assert_eq!(area, 84);
        // The removed rectangle must not intersect the remainder.
        for rect in r.rects() {
            assert!(rect.intersect(&Rect::new(3, 3, 4, 4)).is_none());
        }
    }

    #[test]
    fn subtract_disjoint_is_noop() {
        let a = Region::new(Rect::new(0, 0, 10, 10));
        let b = Region::new(Rect::new(20, 20, 5, 5));
        let r = a.subtract(&b);
        assert_eq!(r.bounding_box(), Some(Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn offset_moves_every_rect() {
        let r = Region::new(Rect::new(10, 10, 5, 5));
        let moved = r.offset(-5, 20);
        assert_eq!(moved.bounding_box(), Some(Rect::new(5, 30, 5, 5)));
    }

    #[test]
    fn offset_clamps_negative_to_zero() {
        let r = Region::new(Rect::new(2, 2, 5, 5));
        let moved = r.offset(-10, -10);
        assert_eq!(moved.bounding_box(), Some(Rect::new(0, 0, 5, 5)));
    }

    #[test]
    fn copyrect_order_reverses_when_dx_positive() {
        let mut r = Region::empty();
        r.add_rect(Rect::new(0, 0, 5, 5));
        r.add_rect(Rect::new(100, 0, 5, 5));
        let ordered = r.iter_copyrect_order(1, 0);
        assert_eq!(ordered[0].x, 100);
        assert_eq!(ordered[1].x, 0);
    }

    #[test]
    fn copyrect_order_forward_when_dx_negative() {
        let mut r = Region::empty();
        r.add_rect(Rect::new(0, 0, 5, 5));
        r.add_rect(Rect::new(100, 0, 5, 5));
        let ordered = r.iter_copyrect_order(-1, 0);
        assert_eq!(ordered[0].x, 0);
        assert_eq!(ordered[1].x, 100);
    }

    #[test]
    fn idempotent_add_same_rect_twice() {
        let mut r = Region::empty();
        r.add_rect(Rect::new(1, 1, 5, 5));
        r.add_rect(Rect::new(1, 1, 5, 5));
        assert_eq!(r.rect_count(), 1);
        assert_eq!(r.bounding_box(), Some(Rect::new(1, 1, 5, 5)));
    }
}
