//! Glyph outline extraction
//!
//! skrifa walks the glyph's path commands and calls into a [`FlatteningPen`],
//! which scales every point and flattens curves on the fly. Nothing is kept
//! in font units.

use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;

use glyphmesh_core::curves::Flattener;
use glyphmesh_core::types::{GlyphId, Outline, Point2};

use crate::font::FontFace;

/// Flattened outline of `glyph_id`, in output units
///
/// Returns `None` for glyphs that draw nothing, such as the space.
pub fn extract(
    face: &FontFace,
    glyph_id: GlyphId,
    scale: f32,
    flip_y: bool,
    flattener: &Flattener,
) -> Option<Outline> {
    let font = face.font_ref()?;
    let glyph = font.outline_glyphs().get(skrifa::GlyphId::new(glyph_id))?;

    let mut pen = FlatteningPen::new(*flattener, scale, flip_y);
    let settings = DrawSettings::unhinted(Size::unscaled(), LocationRef::default());
    if let Err(e) = glyph.draw(settings, &mut pen) {
        log::warn!("Failed to draw glyph {}: {}", glyph_id, e);
        return None;
    }

    let outline = pen.finish();
    if outline.is_empty() {
        None
    } else {
        Some(outline)
    }
}

/// An [`OutlinePen`] that builds a flattened [`Outline`]
///
/// Points are in font units on input and output units once stored. Exact
/// repeats of the previous point are skipped and a final point equal to the
/// contour's first is dropped, so rings are closed implicitly.
#[derive(Debug)]
pub struct FlatteningPen {
    flattener: Flattener,
    scale: f32,
    flip_y: bool,
    outline: Outline,
    current: Vec<Point2>,
    dropped: usize,
}

impl FlatteningPen {
    pub fn new(flattener: Flattener, scale: f32, flip_y: bool) -> Self {
        Self {
            flattener,
            scale,
            flip_y,
            outline: Outline::new(),
            current: Vec::new(),
            dropped: 0,
        }
    }

    /// Close the last contour and hand back the outline
    pub fn finish(mut self) -> Outline {
        self.close_contour();
        if self.dropped > 0 {
            log::debug!("Dropped {} degenerate contour(s)", self.dropped);
        }
        self.outline
    }

    fn transform(&self, x: f32, y: f32) -> Point2 {
        let y = if self.flip_y { -y } else { y };
        Point2::new(x * self.scale, y * self.scale)
    }

    fn push(current: &mut Vec<Point2>, point: Point2) {
        if current.last() != Some(&point) {
            current.push(point);
        }
    }

    fn close_contour(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let first = self.current[0];
        while self.current.len() > 1 && self.current.last() == Some(&first) {
            self.current.pop();
        }
        if !self.outline.push_contour(&self.current) {
            self.dropped += 1;
        }
        self.current.clear();
    }
}

impl OutlinePen for FlatteningPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.close_contour();
        let point = self.transform(x, y);
        self.current.push(point);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let point = self.transform(x, y);
        Self::push(&mut self.current, point);
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let control = self.transform(cx0, cy0);
        let to = self.transform(x, y);
        let Some(&from) = self.current.last() else {
            self.current.push(to);
            return;
        };
        let current = &mut self.current;
        self.flattener
            .quadratic(from, control, to, &mut |p| Self::push(current, p));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let c0 = self.transform(cx0, cy0);
        let c1 = self.transform(cx1, cy1);
        let to = self.transform(x, y);
        let Some(&from) = self.current.last() else {
            self.current.push(to);
            return;
        };
        let current = &mut self.current;
        self.flattener
            .cubic(from, c0, c1, to, &mut |p| Self::push(current, p));
    }

    fn close(&mut self) {
        self.close_contour();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphmesh_core::containment::signed_area;

    fn pen() -> FlatteningPen {
        FlatteningPen::new(Flattener::default(), 1.0, false)
    }

    #[test]
    fn test_square_contour() {
        let mut pen = pen();
        pen.move_to(0.0, 0.0);
        pen.line_to(10.0, 0.0);
        pen.line_to(10.0, 10.0);
        pen.line_to(0.0, 10.0);
        pen.line_to(0.0, 0.0);
        pen.close();

        let outline = pen.finish();
        assert_eq!(outline.contour_count(), 1);
        // Closing duplicate is dropped
        assert_eq!(outline.contour(0).len(), 4);
    }

    #[test]
    fn test_duplicate_points_are_skipped() {
        let mut pen = pen();
        pen.move_to(0.0, 0.0);
        pen.line_to(0.0, 0.0);
        pen.line_to(5.0, 0.0);
        pen.line_to(5.0, 0.0);
        pen.line_to(5.0, 5.0);
        pen.close();

        assert_eq!(pen.finish().points.len(), 3);
    }

    #[test]
    fn test_degenerate_contour_is_dropped() {
        let mut pen = pen();
        pen.move_to(0.0, 0.0);
        pen.line_to(1.0, 1.0);
        pen.close();
        pen.move_to(0.0, 0.0);
        pen.line_to(4.0, 0.0);
        pen.line_to(4.0, 4.0);
        pen.close();

        let outline = pen.finish();
        assert_eq!(outline.contour_count(), 1);
        assert_eq!(outline.contours[0].start, 0);
    }

    #[test]
    fn test_move_closes_previous_contour() {
        let mut pen = pen();
        for offset in [0.0, 20.0] {
            pen.move_to(offset, 0.0);
            pen.line_to(offset + 4.0, 0.0);
            pen.line_to(offset + 4.0, 4.0);
        }
        assert_eq!(pen.finish().contour_count(), 2);
    }

    #[test]
    fn test_scale_and_flip() {
        let mut pen = FlatteningPen::new(Flattener::default(), 0.5, true);
        pen.move_to(0.0, 0.0);
        pen.line_to(10.0, 0.0);
        pen.line_to(10.0, 10.0);
        pen.close();

        let outline = pen.finish();
        assert_eq!(outline.points[2], Point2::new(5.0, -5.0));
        // Flipping mirrors the winding
        assert!(signed_area(outline.contour(0)) < 0.0);
    }

    #[test]
    fn test_curves_are_flattened() {
        let mut pen = pen();
        pen.move_to(0.0, 0.0);
        pen.quad_to(50.0, 100.0, 100.0, 0.0);
        pen.close();

        let outline = pen.finish();
        assert!(outline.points.len() > 3);
        assert_eq!(outline.points[0], Point2::new(0.0, 0.0));
    }
}
