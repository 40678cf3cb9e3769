//! Which contour lives inside which
//!
//! Glyphs nest: the counter of an "O" sits inside its bowl, the island of a
//! "®" sits inside a counter. We recover that nesting as a parent/depth tree
//! so later stages can tell solid rings (even depth) from holes (odd depth).
//!
//! The test is all-pairs over the contour count, which stays in the tens even
//! for dense ideographs.

use crate::types::{Outline, Point2};

/// Shoelace area, positive for counter-clockwise rings in y-up space
pub fn signed_area(ring: &[Point2]) -> f32 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        sum += ring[j].x as f64 * ring[i].y as f64 - ring[i].x as f64 * ring[j].y as f64;
        j = i;
    }
    (sum * 0.5) as f32
}

/// Crossing-number point-in-polygon test
pub fn point_in_polygon(p: Point2, ring: &[Point2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let cross_x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Parent and depth for every contour of an outline
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainmentTree {
    /// Tightest enclosing contour, `None` for roots
    pub parent: Vec<Option<usize>>,
    /// Length of the parent chain; 0 for roots
    pub depth: Vec<u32>,
}

impl ContainmentTree {
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Contours with no parent
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.parent
            .iter()
            .enumerate()
            .filter(|(_, parent)| parent.is_none())
            .map(|(index, _)| index)
    }

    /// Contours whose tightest enclosure is `index`
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.parent
            .iter()
            .enumerate()
            .filter(move |(_, parent)| **parent == Some(index))
            .map(|(child, _)| child)
    }
}

/// Build the containment tree for `outline`
///
/// A contour's first vertex stands in for the whole contour. Contours come
/// out of the extractor as simple polylines, so for glyph data the first
/// vertex of a nested ring lies strictly inside every ring that encloses it.
/// The parent is the enclosing contour with the smallest area that is still
/// larger than the child's.
pub fn build_tree(outline: &Outline) -> ContainmentTree {
    let count = outline.contour_count();
    let areas: Vec<f32> = outline.contours().map(|c| signed_area(c).abs()).collect();

    let mut parent = vec![None; count];
    for child in 0..count {
        let ring = outline.contour(child);
        let Some(&anchor) = ring.first() else {
            continue;
        };

        let mut best: Option<usize> = None;
        for candidate in 0..count {
            if candidate == child || areas[candidate] <= areas[child] {
                continue;
            }
            if !point_in_polygon(anchor, outline.contour(candidate)) {
                continue;
            }
            if best.map_or(true, |b| areas[candidate] < areas[b]) {
                best = Some(candidate);
            }
        }
        parent[child] = best;
    }

    // Parents are strictly larger than their children, so chains end after at
    // most `count` steps.
    let depth = (0..count)
        .map(|index| {
            let mut depth = 0;
            let mut cursor = parent[index];
            while let Some(up) = cursor {
                depth += 1;
                cursor = parent[up];
            }
            depth
        })
        .collect();

    ContainmentTree { parent, depth }
}
