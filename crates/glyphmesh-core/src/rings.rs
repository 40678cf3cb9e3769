//! Pair solid rings with the holes punched into them

use crate::containment::{signed_area, ContainmentTree};
use crate::types::{Outline, RingGroup};

/// Group contours into outer rings and their direct holes
///
/// Even-depth contours are solid and start a group. Odd-depth contours are
/// holes of their immediate parent. An island inside a hole (depth 2) starts
/// a group of its own rather than joining the outermost ring. Holes with no
/// area cannot cut anything and are dropped.
///
/// Groups come out in contour order; holes within a group are sorted by
/// increasing area.
pub fn group_rings(outline: &Outline, tree: &ContainmentTree) -> Vec<RingGroup> {
    let count = outline.contour_count().min(tree.len());

    let mut groups: Vec<RingGroup> = Vec::new();
    let mut group_of = vec![None; count];
    for index in 0..count {
        if tree.depth[index] % 2 == 0 {
            group_of[index] = Some(groups.len());
            groups.push(RingGroup {
                outer: index,
                holes: Vec::new(),
            });
        }
    }

    for index in 0..count {
        if tree.depth[index] % 2 == 0 {
            continue;
        }
        let area = signed_area(outline.contour(index)).abs();
        if area <= 0.0 {
            log::debug!("Dropping zero-area hole contour {}", index);
            continue;
        }
        match tree.parent[index].and_then(|parent| group_of.get(parent).copied().flatten()) {
            Some(group) => groups[group].holes.push(index),
            None => log::warn!("Hole contour {} has no solid parent", index),
        }
    }

    for group in &mut groups {
        group.holes.sort_by(|&a, &b| {
            let area_a = signed_area(outline.contour(a)).abs();
            let area_b = signed_area(outline.contour(b)).abs();
            area_a.total_cmp(&area_b).then(a.cmp(&b))
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containment::build_tree;
    use crate::types::Point2;

    fn square(x: f32, y: f32, size: f32) -> Vec<Point2> {
        vec![
            Point2::new(x, y),
            Point2::new(x + size, y),
            Point2::new(x + size, y + size),
            Point2::new(x, y + size),
        ]
    }

    fn groups_for(rings: &[Vec<Point2>]) -> Vec<RingGroup> {
        let mut outline = Outline::new();
        for ring in rings {
            outline.push_contour(ring);
        }
        group_rings(&outline, &build_tree(&outline))
    }

    #[test]
    fn test_single_ring() {
        let groups = groups_for(&[square(0.0, 0.0, 1.0)]);
        assert_eq!(groups, vec![RingGroup { outer: 0, holes: vec![] }]);
    }

    #[test]
    fn test_square_with_hole() {
        let groups = groups_for(&[square(0.0, 0.0, 10.0), square(3.0, 3.0, 4.0)]);
        assert_eq!(groups, vec![RingGroup { outer: 0, holes: vec![1] }]);
    }

    #[test]
    fn test_two_holes_sorted_by_area() {
        // Like a "B": one body, two counters of different size
        let groups = groups_for(&[
            square(0.0, 0.0, 20.0),
            square(2.0, 11.0, 6.0),
            square(2.0, 2.0, 8.0),
        ]);
        assert_eq!(groups, vec![RingGroup { outer: 0, holes: vec![1, 2] }]);
    }

    #[test]
    fn test_island_starts_its_own_group() {
        let groups = groups_for(&[
            square(0.0, 0.0, 30.0),
            square(5.0, 5.0, 20.0),
            square(10.0, 10.0, 10.0),
        ]);
        assert_eq!(
            groups,
            vec![
                RingGroup { outer: 0, holes: vec![1] },
                RingGroup { outer: 2, holes: vec![] },
            ]
        );
    }

    #[test]
    fn test_separate_bodies() {
        // Like an "i": dot and stem
        let groups = groups_for(&[square(0.0, 0.0, 2.0), square(0.0, 4.0, 2.0)]);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.holes.is_empty()));
    }
}
