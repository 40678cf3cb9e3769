//! Ear clipping with holes
//!
//! Each ring group is handed to `earcutr` on its own and the results are
//! appended to one shared vertex/index buffer. A group the triangulator
//! rejects contributes nothing; the rest of the glyph still renders.

use earcutr::earcut;

use crate::containment::build_tree;
use crate::error::TriangulationError;
use crate::rings::group_rings;
use crate::types::{GlyphMesh, Outline, Point2, RingGroup};

/// Triangulate every group of `outline` into one mesh
///
/// Metrics and bounds are left at their defaults for the caller to fill in.
pub fn triangulate(outline: &Outline, groups: &[RingGroup]) -> GlyphMesh {
    let mut mesh = GlyphMesh {
        outline_points: outline.points.clone(),
        outline_contours: outline.contours.clone(),
        ..GlyphMesh::default()
    };

    for (index, group) in groups.iter().enumerate() {
        if outline.contours.get(group.outer).is_some_and(|c| c.is_degenerate()) {
            continue;
        }
        if let Err(e) = triangulate_group(outline, group, &mut mesh) {
            log::warn!("Skipping ring group {} (outer contour {}): {}", index, group.outer, e);
        }
    }

    mesh
}

/// Containment, grouping and triangulation in one call
pub fn tessellate(outline: &Outline) -> GlyphMesh {
    let tree = build_tree(outline);
    let groups = group_rings(outline, &tree);
    triangulate(outline, &groups)
}

fn triangulate_group(
    outline: &Outline,
    group: &RingGroup,
    mesh: &mut GlyphMesh,
) -> Result<(), TriangulationError> {
    let mut ring_points: Vec<Point2> = Vec::new();
    let mut hole_starts: Vec<usize> = Vec::with_capacity(group.holes.len());

    let contour = move |index: usize| {
        outline
            .get_contour(index)
            .map(open_ring)
            .ok_or(TriangulationError::UnknownContour { index })
    };

    let outer = contour(group.outer)?;
    if outer.len() < 3 {
        return Ok(());
    }
    ring_points.extend_from_slice(outer);
    for &hole in &group.holes {
        let ring = contour(hole)?;
        if ring.len() < 3 {
            continue;
        }
        hole_starts.push(ring_points.len());
        ring_points.extend_from_slice(ring);
    }

    let mut coords: Vec<f64> = Vec::with_capacity(ring_points.len() * 2);
    for p in &ring_points {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(TriangulationError::NonFinite);
        }
        coords.push(p.x as f64);
        coords.push(p.y as f64);
    }

    let local = earcut(&coords, &hole_starts, 2)
        .map_err(|e| TriangulationError::Earcut(format!("{:?}", e)))?;
    if local.len() % 3 != 0 || local.iter().any(|&i| i >= ring_points.len()) {
        return Err(TriangulationError::MalformedIndices { len: local.len() });
    }
    if local.is_empty() {
        log::debug!("Ring group at contour {} produced no triangles", group.outer);
        return Ok(());
    }

    let base = mesh.positions.len() as u32;
    mesh.positions.extend_from_slice(&ring_points);
    mesh.indices.extend(local.iter().map(|&i| base + i as u32));
    Ok(())
}

/// Drop an explicit closing vertex, earcut expects implicit closure
fn open_ring(ring: &[Point2]) -> &[Point2] {
    match ring {
        [first, rest @ .., last] if first == last && !rest.is_empty() => &ring[..ring.len() - 1],
        _ => ring,
    }
}
