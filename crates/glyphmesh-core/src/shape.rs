//! Indexed shape for scene-graph consumers
//!
//! Many 3D toolkits describe polygon meshes as one flat vertex list plus
//! index lists where `-1` terminates each face or line strip. This module
//! converts a [`GlyphMesh`] into that form.

use crate::types::GlyphMesh;

/// Face/edge terminator
pub const END_OF_PRIMITIVE: i32 = -1;

/// A glyph mesh as `-1`-terminated index lists
///
/// `vertices` holds the triangulated positions followed by the outline
/// points. `face_indices` are triangles `a, b, c, -1` over the first part;
/// `edge_indices` are the outline's segments `a, b, -1` over the second,
/// each contour wrapping back to its first point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedShape {
    pub vertices: Vec<[f32; 2]>,
    pub face_indices: Vec<i32>,
    pub edge_indices: Vec<i32>,
}

impl IndexedShape {
    pub fn face_count(&self) -> usize {
        self.face_indices.len() / 4
    }

    pub fn edge_count(&self) -> usize {
        self.edge_indices.len() / 3
    }
}

impl From<&GlyphMesh> for IndexedShape {
    fn from(mesh: &GlyphMesh) -> Self {
        let mut vertices = Vec::with_capacity(mesh.positions.len() + mesh.outline_points.len());
        vertices.extend(mesh.positions.iter().map(|p| [p.x, p.y]));
        let outline_base = vertices.len();
        vertices.extend(mesh.outline_points.iter().map(|p| [p.x, p.y]));

        let mut face_indices = Vec::with_capacity(mesh.triangle_count() * 4);
        for tri in mesh.indices.chunks_exact(3) {
            face_indices.extend(tri.iter().map(|&i| i as i32));
            face_indices.push(END_OF_PRIMITIVE);
        }

        let mut edge_indices = Vec::with_capacity(mesh.outline_points.len() * 3);
        for span in &mesh.outline_contours {
            if span.count < 2 {
                continue;
            }
            let first = outline_base + span.start;
            for k in 0..span.count {
                let a = first + k;
                let b = first + (k + 1) % span.count;
                edge_indices.extend([a as i32, b as i32, END_OF_PRIMITIVE]);
            }
        }

        Self {
            vertices,
            face_indices,
            edge_indices,
        }
    }
}
