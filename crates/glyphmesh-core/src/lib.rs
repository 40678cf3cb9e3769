//! Glyphmesh Core: from flattened outlines to triangles
//!
//! A glyph leaves the font parser as a handful of contours. This crate holds
//! everything that happens to those contours once they are polylines, without
//! knowing anything about font files.
//!
//! ## The Stages
//!
//! 1. **Flattening** - [`curves::Flattener`] turns quadratic and cubic segments
//!    into polylines within a tolerance
//! 2. **Containment** - [`containment::build_tree`] finds which contour sits
//!    inside which
//! 3. **Grouping** - [`rings::group_rings`] pairs every solid ring with its holes
//! 4. **Triangulation** - [`triangulate::triangulate`] ear-clips each group into
//!    one shared vertex/index buffer
//!
//! ```
//! use glyphmesh_core::types::{Outline, Point2};
//! use glyphmesh_core::triangulate::tessellate;
//!
//! let mut outline = Outline::new();
//! outline.push_contour(&[
//!     Point2::new(0.0, 0.0),
//!     Point2::new(10.0, 0.0),
//!     Point2::new(10.0, 10.0),
//!     Point2::new(0.0, 10.0),
//! ]);
//! outline.push_contour(&[
//!     Point2::new(3.0, 3.0),
//!     Point2::new(3.0, 7.0),
//!     Point2::new(7.0, 7.0),
//!     Point2::new(7.0, 3.0),
//! ]);
//!
//! let mesh = tessellate(&outline);
//! assert!((mesh.triangle_area() - 84.0).abs() < 1e-3);
//! ```
//!
//! Shared data lives in [`types`]; the 3D consumer format lives in [`shape`].

pub mod config;
pub mod containment;
pub mod curves;
pub mod error;
pub mod rings;
pub mod shape;
pub mod triangulate;

pub use config::{CacheConfig, EvictionPolicy, FlattenConfig, PipelineConfig, ScaleMode};
pub use error::{FontLoadError, GlyphError, Result, TriangulationError};

/// The data structures every stage passes along
pub mod types {
    use std::ops::Range;

    /// Index of a glyph inside one font
    pub type GlyphId = u32;

    /// A coordinate in output space, already scaled
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Point2 {
        pub x: f32,
        pub y: f32,
    }

    impl Point2 {
        pub const fn new(x: f32, y: f32) -> Self {
            Self { x, y }
        }

        pub fn midpoint(self, other: Self) -> Self {
            Self::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
        }

        pub fn distance(self, other: Self) -> f32 {
            (self.x - other.x).hypot(self.y - other.y)
        }
    }

    impl From<(f32, f32)> for Point2 {
        fn from((x, y): (f32, f32)) -> Self {
            Self::new(x, y)
        }
    }

    /// One closed polyline inside a shared point buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContourSpan {
        pub start: usize,
        pub count: usize,
    }

    impl ContourSpan {
        pub const fn new(start: usize, count: usize) -> Self {
            Self { start, count }
        }

        pub fn range(&self) -> Range<usize> {
            self.start..self.start + self.count
        }

        /// Fewer than three points cannot enclose anything
        pub fn is_degenerate(&self) -> bool {
            self.count < 3
        }
    }

    /// Every flattened contour of one glyph
    ///
    /// Contours are stored back to back in `points` in the order the font
    /// emitted them, and never share indices.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Outline {
        pub points: Vec<Point2>,
        pub contours: Vec<ContourSpan>,
    }

    impl Outline {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_empty(&self) -> bool {
            self.contours.is_empty()
        }

        pub fn contour_count(&self) -> usize {
            self.contours.len()
        }

        /// Points of contour `index`
        ///
        /// Panics when `index` is out of range; see [`Outline::get_contour`].
        pub fn contour(&self, index: usize) -> &[Point2] {
            &self.points[self.contours[index].range()]
        }

        /// Points of contour `index`, `None` when the index or its span is out of range
        pub fn get_contour(&self, index: usize) -> Option<&[Point2]> {
            self.points.get(self.contours.get(index)?.range())
        }

        pub fn contours(&self) -> impl Iterator<Item = &[Point2]> + '_ {
            self.contours.iter().map(|span| &self.points[span.range()])
        }

        /// Net enclosed area
        ///
        /// Holes wind against their outer ring in well-formed fonts, so the
        /// signed areas cancel to "outer minus holes".
        pub fn area(&self) -> f32 {
            self.contours()
                .map(|ring| crate::containment::signed_area(ring) as f64)
                .sum::<f64>()
                .abs() as f32
        }

        /// Append a closed ring, returning `false` when it was too short to keep
        pub fn push_contour(&mut self, ring: &[Point2]) -> bool {
            if ring.len() < 3 {
                return false;
            }
            let start = self.points.len();
            self.points.extend_from_slice(ring);
            self.contours.push(ContourSpan::new(start, ring.len()));
            true
        }
    }

    /// One triangulation unit: a solid ring and the holes punched directly into it
    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct RingGroup {
        pub outer: usize,
        pub holes: Vec<usize>,
    }

    /// Horizontal metrics scaled to the requested size
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GlyphMetrics {
        pub advance: f32,
        pub left_side_bearing: f32,
    }

    /// Tight glyph bounds in output units
    ///
    /// `valid` is false for glyphs without ink, such as the space.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GlyphBBox {
        pub x0: f32,
        pub y0: f32,
        pub x1: f32,
        pub y1: f32,
        pub valid: bool,
    }

    impl GlyphBBox {
        pub const EMPTY: Self = Self {
            x0: 0.0,
            y0: 0.0,
            x1: 0.0,
            y1: 0.0,
            valid: false,
        };

        pub fn width(&self) -> f32 {
            self.x1 - self.x0
        }

        pub fn height(&self) -> f32 {
            self.y1 - self.y0
        }
    }

    /// Font-wide vertical metrics in output units
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct VMetrics {
        pub ascent: f32,
        pub descent: f32,
        pub line_gap: f32,
    }

    impl VMetrics {
        /// Baseline-to-baseline distance
        pub fn line_height(&self) -> f32 {
            self.ascent - self.descent + self.line_gap
        }
    }

    /// A triangulated glyph
    ///
    /// Every three consecutive `indices` form one triangle over `positions`.
    /// Winding is whatever the triangulator produced and may differ between
    /// ring groups. `outline_points`/`outline_contours` keep the untriangulated
    /// boundary for stroking and wireframes.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct GlyphMesh {
        pub positions: Vec<Point2>,
        pub indices: Vec<u32>,
        pub outline_points: Vec<Point2>,
        pub outline_contours: Vec<ContourSpan>,
        pub metrics: GlyphMetrics,
        pub bbox: GlyphBBox,
    }

    impl GlyphMesh {
        /// A mesh with metrics but no geometry
        pub fn empty(metrics: GlyphMetrics, bbox: GlyphBBox) -> Self {
            Self {
                metrics,
                bbox,
                ..Self::default()
            }
        }

        pub fn with_metrics(mut self, metrics: GlyphMetrics, bbox: GlyphBBox) -> Self {
            self.metrics = metrics;
            self.bbox = bbox;
            self
        }

        pub fn is_empty(&self) -> bool {
            self.indices.is_empty()
        }

        pub fn triangle_count(&self) -> usize {
            self.indices.len() / 3
        }

        pub fn triangles(&self) -> impl Iterator<Item = [Point2; 3]> + '_ {
            self.indices.chunks_exact(3).map(|tri| {
                [
                    self.positions[tri[0] as usize],
                    self.positions[tri[1] as usize],
                    self.positions[tri[2] as usize],
                ]
            })
        }

        /// Sum of the unsigned triangle areas
        pub fn triangle_area(&self) -> f32 {
            self.triangles()
                .map(|[a, b, c]| {
                    let cross = (b.x - a.x) as f64 * (c.y - a.y) as f64
                        - (c.x - a.x) as f64 * (b.y - a.y) as f64;
                    cross.abs() * 0.5
                })
                .sum::<f64>() as f32
        }
    }

    /// Coverage mask for 2D label rendering
    ///
    /// One byte per pixel, rows top-down. `bearing_x` is the offset from the
    /// pen position to the left edge, `bearing_y` from the baseline up to the
    /// top row.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct GlyphBitmap {
        pub width: u32,
        pub height: u32,
        pub bearing_x: i32,
        pub bearing_y: i32,
        pub data: Vec<u8>,
    }

    impl GlyphBitmap {
        pub fn empty() -> Self {
            Self::default()
        }

        /// The coverage bytes, or `None` for a glyph without ink
        pub fn pixels(&self) -> Option<&[u8]> {
            if self.data.is_empty() {
                None
            } else {
                Some(&self.data)
            }
        }

        pub fn size(&self) -> [u32; 2] {
            [self.width, self.height]
        }

        pub fn bearing(&self) -> [i32; 2] {
            [self.bearing_x, self.bearing_y]
        }
    }

    /// Which representation a caller wants built
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum GlyphKind {
        Bitmap,
        Mesh,
    }

    /// Geometry attached to a shared glyph
    #[derive(Debug, Clone, PartialEq)]
    pub enum GlyphData {
        Bitmap(GlyphBitmap),
        Mesh(GlyphMesh),
        Empty,
    }

    impl GlyphData {
        pub fn is_empty(&self) -> bool {
            matches!(self, GlyphData::Empty)
        }

        pub fn as_mesh(&self) -> Option<&GlyphMesh> {
            match self {
                GlyphData::Mesh(mesh) => Some(mesh),
                _ => None,
            }
        }

        pub fn as_bitmap(&self) -> Option<&GlyphBitmap> {
            match self {
                GlyphData::Bitmap(bitmap) => Some(bitmap),
                _ => None,
            }
        }
    }
}
