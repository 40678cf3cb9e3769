//! Coverage bitmaps for the 2D label path
//!
//! The glyph is recorded twice in one pass: as an SVG path string for zeno's
//! rasterizer and as a kurbo `BezPath` whose `bounding_box()` sizes the mask.

use std::fmt::Write;

use kurbo::{BezPath, Rect, Shape};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;
use zeno::Mask;

use glyphmesh_core::types::{GlyphBitmap, GlyphId};

use crate::font::FontFace;

/// Largest mask edge zeno accepts
pub const MAX_BITMAP_DIMENSION: u32 = 65535;

/// Records skrifa draw calls as an SVG path and a kurbo path
struct PathRecorder {
    svg: String,
    path: BezPath,
    scale: f32,
}

impl PathRecorder {
    fn new(scale: f32) -> Self {
        Self {
            svg: String::new(),
            path: BezPath::new(),
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale, y * self.scale)
    }
}

// Writing into a String cannot fail
impl OutlinePen for PathRecorder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        let _ = write!(self.svg, "M {:.3},{:.3} ", x, y);
        self.path.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        let _ = write!(self.svg, "L {:.3},{:.3} ", x, y);
        self.path.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let (cx0, cy0) = self.point(cx0, cy0);
        let (x, y) = self.point(x, y);
        let _ = write!(self.svg, "Q {:.3},{:.3} {:.3},{:.3} ", cx0, cy0, x, y);
        self.path
            .quad_to((cx0 as f64, cy0 as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (cx0, cy0) = self.point(cx0, cy0);
        let (cx1, cy1) = self.point(cx1, cy1);
        let (x, y) = self.point(x, y);
        let _ = write!(
            self.svg,
            "C {:.3},{:.3} {:.3},{:.3} {:.3},{:.3} ",
            cx0, cy0, cx1, cy1, x, y
        );
        self.path.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.svg.push_str("Z ");
        self.path.close_path();
    }
}

fn record(face: &FontFace, glyph_id: GlyphId, scale: f32) -> Option<PathRecorder> {
    let font = face.font_ref()?;
    let glyph = font.outline_glyphs().get(skrifa::GlyphId::new(glyph_id))?;

    let mut recorder = PathRecorder::new(scale);
    let settings = DrawSettings::unhinted(Size::unscaled(), LocationRef::default());
    if let Err(e) = glyph.draw(settings, &mut recorder) {
        log::warn!("Failed to draw glyph {}: {}", glyph_id, e);
        return None;
    }
    if recorder.path.elements().is_empty() {
        return None;
    }
    Some(recorder)
}

/// Bounds of the drawn outline in font units, `None` for glyphs without ink
pub fn outline_bounds(face: &FontFace, glyph_id: GlyphId) -> Option<Rect> {
    let recorder = record(face, glyph_id, 1.0)?;
    let bounds = recorder.path.bounding_box();
    let finite = bounds.x0.is_finite()
        && bounds.y0.is_finite()
        && bounds.x1.is_finite()
        && bounds.y1.is_finite();
    finite.then_some(bounds)
}

/// Render `glyph_id` at `scale` into a top-down coverage mask
///
/// `bearing_x` is the left edge relative to the pen, `bearing_y` the top edge
/// relative to the baseline. Glyphs without ink give an empty bitmap.
pub fn rasterize(face: &FontFace, glyph_id: GlyphId, scale: f32) -> GlyphBitmap {
    let Some(recorder) = record(face, glyph_id, scale) else {
        return GlyphBitmap::empty();
    };

    let bbox = recorder.path.bounding_box();
    if !(bbox.x0.is_finite() && bbox.y0.is_finite() && bbox.x1.is_finite() && bbox.y1.is_finite())
    {
        return GlyphBitmap::empty();
    }

    // Snap outward to whole pixels
    let min_x = bbox.x0.floor();
    let min_y = bbox.y0.floor();
    let max_x = bbox.x1.ceil();
    let max_y = bbox.y1.ceil();

    let (span_x, span_y) = (max_x - min_x, max_y - min_y);
    if span_x <= 0.0 || span_y <= 0.0 {
        return GlyphBitmap::empty();
    }
    if span_x > f64::from(MAX_BITMAP_DIMENSION) || span_y > f64::from(MAX_BITMAP_DIMENSION) {
        log::warn!(
            "Glyph {} would need a {}x{} bitmap; skipping",
            glyph_id,
            span_x,
            span_y
        );
        return GlyphBitmap::empty();
    }
    let width = span_x as u32;
    let height = span_y as u32;

    let mut mask = vec![0u8; width as usize * height as usize];
    Mask::new(recorder.svg.as_str())
        .size(width, height)
        .offset((-min_x as i32, -min_y as i32))
        .render_into(&mut mask, None);

    // Font coordinates are y-up, bitmaps are y-down
    let row = width as usize;
    for y in 0..(height as usize / 2) {
        let bottom = (height as usize - 1 - y) * row;
        let (head, tail) = mask.split_at_mut(bottom);
        head[y * row..(y + 1) * row].swap_with_slice(&mut tail[..row]);
    }

    GlyphBitmap {
        width,
        height,
        bearing_x: min_x as i32,
        bearing_y: max_y as i32,
        data: mask,
    }
}
