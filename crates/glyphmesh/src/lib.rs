//! Glyphmesh: text as triangles
//!
//! Turns a character in a TrueType/OpenType font into either a triangle mesh
//! for 3D scenes or a coverage bitmap for 2D labels, with the metrics needed
//! to lay out a line of them.
//!
//! ## The Pipeline
//!
//! 1. **[`FontSource`]** - font bytes, a pixel size and a per-size glyph cache
//! 2. **[`extract`]** - skrifa draws the outline, curves are flattened on the way in
//! 3. **Containment, grouping, triangulation** - see [`glyphmesh_core`]
//! 4. **[`metrics`]** - advances, kerning, vertical metrics and bounds
//! 5. **[`raster`]** - zeno coverage masks for the bitmap path
//! 6. **[`GlyphRegistry`]** - process-wide sharing of built glyphs
//!
//! ```
//! use glyphmesh::FontSource;
//! use glyphmesh_core::shape::IndexedShape;
//!
//! let mut font = FontSource::load_default();
//! let shape = IndexedShape::from(font.mesh('g'));
//! assert!(shape.face_count() > 0);
//! assert_eq!(shape.face_indices[3], -1);
//! ```
//!
//! Fonts that fail to load are replaced by the embedded DejaVu Sans Mono.

pub mod cache;
pub mod extract;
pub mod font;
pub mod metrics;
pub mod raster;
pub mod registry;

pub use cache::{CacheEntry, CacheStats, GlyphCache};
pub use font::{FontFace, FontKey, FontSource, DEFAULT_FONT_DATA, DEFAULT_PIXEL_SIZE};
pub use registry::{Glyph, GlyphKey, GlyphRegistry, SharedGlyph};

pub use glyphmesh_core::types::{
    GlyphBBox, GlyphBitmap, GlyphData, GlyphKind, GlyphMesh, GlyphMetrics, VMetrics,
};
pub use glyphmesh_core::{FontLoadError, GlyphError, PipelineConfig};
