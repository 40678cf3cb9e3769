//! Advances, bearings, kerning and bounds in output units
//!
//! Every value is the font-unit number from the parser times `scale`.

use read_fonts::tables::gpos::{Gpos, PairPos, PositionSubtables, ValueRecord};
use read_fonts::tables::kern::SubtableKind;
use read_fonts::types::{GlyphId as FontGlyphId, Tag};
use read_fonts::{ReadError, TableProvider};
use skrifa::instance::{LocationRef, Size};
use skrifa::{FontRef, MetadataProvider};

use glyphmesh_core::types::{GlyphBBox, GlyphId, GlyphMetrics, VMetrics};

use crate::font::FontFace;
use crate::raster;

const KERN: Tag = Tag::new(b"kern");

/// Horizontal advance of `glyph_id`
pub fn advance(face: &FontFace, glyph_id: GlyphId, scale: f32) -> f32 {
    glyph_metrics(face, glyph_id, scale).advance
}

/// Distance from the pen position to the glyph's left edge
pub fn left_side_bearing(face: &FontFace, glyph_id: GlyphId, scale: f32) -> f32 {
    glyph_metrics(face, glyph_id, scale).left_side_bearing
}

pub fn glyph_metrics(face: &FontFace, glyph_id: GlyphId, scale: f32) -> GlyphMetrics {
    let Some(font) = face.font_ref() else {
        return GlyphMetrics::default();
    };
    let metrics = font.glyph_metrics(Size::unscaled(), LocationRef::default());
    let gid = skrifa::GlyphId::new(glyph_id);
    GlyphMetrics {
        advance: metrics.advance_width(gid).unwrap_or(0.0) * scale,
        left_side_bearing: metrics.left_side_bearing(gid).unwrap_or(0.0) * scale,
    }
}

/// Horizontal pair adjustment, 0 when the font has none
///
/// GPOS pair positioning is consulted first, the way shapers do; the legacy
/// `kern` table covers fonts that only carry that.
pub fn kerning(face: &FontFace, left: GlyphId, right: GlyphId, scale: f32) -> f32 {
    let Some(font) = face.font_ref() else {
        return 0.0;
    };
    let (left, right) = (FontGlyphId::new(left), FontGlyphId::new(right));

    let gpos = gpos_kerning(&font, left, right).unwrap_or_else(|e| {
        log::debug!("Unreadable GPOS pair data: {}", e);
        None
    });
    let units = gpos.or_else(|| {
        kern_table_kerning(&font, left, right).unwrap_or_else(|e| {
            log::debug!("Unreadable kern table: {}", e);
            None
        })
    });
    units.map_or(0.0, |units| units as f32 * scale)
}

/// Sum of the horizontal `kern` subtables that list the pair
fn kern_table_kerning(
    font: &FontRef<'_>,
    left: FontGlyphId,
    right: FontGlyphId,
) -> Result<Option<i32>, ReadError> {
    let kern = match font.kern() {
        Ok(kern) => kern,
        Err(ReadError::TableIsMissing(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut total = None;
    for subtable in kern.subtables() {
        let subtable = subtable?;
        if !subtable.is_horizontal() || subtable.is_cross_stream() {
            continue;
        }
        let value = match subtable.kind()? {
            SubtableKind::Format0(pairs) => pairs.kerning(left, right),
            SubtableKind::Format2(classes) => classes.kerning(left, right),
            SubtableKind::Format3(classes) => classes.kerning(left, right),
            // State machines need a glyph run
            SubtableKind::Format1(_) => None,
        };
        if let Some(value) = value {
            total = Some(total.unwrap_or(0) + value);
        }
    }
    Ok(total)
}

/// First-glyph X advance from the pair lookups behind the `kern` feature
///
/// Fonts without a `kern` feature have every pair lookup searched instead.
fn gpos_kerning(
    font: &FontRef<'_>,
    left: FontGlyphId,
    right: FontGlyphId,
) -> Result<Option<i32>, ReadError> {
    let gpos = match font.gpos() {
        Ok(gpos) => gpos,
        Err(ReadError::TableIsMissing(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let lookups = gpos.lookup_list()?.lookups();

    let mut indices = kern_lookup_indices(&gpos)?;
    if indices.is_empty() {
        indices = (0..lookups.len()).collect();
    }

    for index in indices {
        let PositionSubtables::Pair(subtables) = lookups.get(index)?.subtables()? else {
            continue;
        };
        for subtable in subtables.iter() {
            if let Some(value) = pair_adjustment(&subtable?, left, right)? {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

fn kern_lookup_indices(gpos: &Gpos<'_>) -> Result<Vec<usize>, ReadError> {
    let features = gpos.feature_list()?;
    let mut indices = Vec::new();
    for record in features.feature_records() {
        if record.feature_tag() != KERN {
            continue;
        }
        let feature = record.feature(features.offset_data())?;
        indices.extend(feature.lookup_list_indices().iter().map(|i| usize::from(i.get())));
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

/// The pair's adjustment in one PairPos subtable, `None` when not covered
fn pair_adjustment(
    subtable: &PairPos<'_>,
    left: FontGlyphId,
    right: FontGlyphId,
) -> Result<Option<i32>, ReadError> {
    match subtable {
        PairPos::Format1(pairs) => {
            let Some(coverage_index) = pairs.coverage()?.get(left) else {
                return Ok(None);
            };
            let set = pairs.pair_sets().get(usize::from(coverage_index))?;
            for record in set.pair_value_records().iter() {
                let record = record?;
                if record.second_glyph().to_u32() == right.to_u32() {
                    return Ok(Some(x_advance(record.value_record1())));
                }
            }
            Ok(None)
        },
        PairPos::Format2(classes) => {
            if classes.coverage()?.get(left).is_none() {
                return Ok(None);
            }
            let class1 = classes.class_def1()?.get(left);
            let class2 = classes.class_def2()?.get(right);
            let record = classes.class1_records().get(usize::from(class1))?;
            let value = record.class2_records().get(usize::from(class2))?;
            Ok(Some(x_advance(value.value_record1())))
        },
    }
}

fn x_advance(record: &ValueRecord) -> i32 {
    record.x_advance().map_or(0, i32::from)
}

/// Font-wide ascent, descent and line gap
pub fn vmetrics(face: &FontFace, scale: f32) -> VMetrics {
    VMetrics {
        ascent: f32::from(face.ascent()) * scale,
        descent: f32::from(face.descent()) * scale,
        line_gap: f32::from(face.line_gap()) * scale,
    }
}

/// Tight bounds of `glyph_id`
///
/// With `flip_y` the Y range is negated and reordered so that `y0 <= y1`
/// still holds in the y-down convention.
pub fn bbox(face: &FontFace, glyph_id: GlyphId, scale: f32, flip_y: bool) -> GlyphBBox {
    let Some(font) = face.font_ref() else {
        return GlyphBBox::EMPTY;
    };
    let reported = font
        .glyph_metrics(Size::unscaled(), LocationRef::default())
        .bounds(skrifa::GlyphId::new(glyph_id))
        .map(|b| (b.x_min, b.y_min, b.x_max, b.y_max));

    // glyf fonts report a zero box for empty glyphs; CFF fonts report nothing,
    // so measure the outline instead
    let bounds = reported.or_else(|| {
        raster::outline_bounds(face, glyph_id)
            .map(|r| (r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32))
    });

    let Some((x_min, y_min, x_max, y_max)) = bounds else {
        return GlyphBBox::EMPTY;
    };
    if x_min == 0.0 && y_min == 0.0 && x_max == 0.0 && y_max == 0.0 {
        return GlyphBBox::EMPTY;
    }

    let (y0, y1) = if flip_y {
        (-y_max * scale, -y_min * scale)
    } else {
        (y_min * scale, y_max * scale)
    };
    GlyphBBox {
        x0: x_min * scale,
        y0,
        x1: x_max * scale,
        y1,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// A version 0 `kern` table with one format 0 subtable
    fn kern_table(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(0u16.to_be_bytes()); // version
        data.extend(1u16.to_be_bytes()); // nTables

        let length = 14 + pairs.len() * 6;
        data.extend(0u16.to_be_bytes()); // subtable version
        data.extend((length as u16).to_be_bytes());
        data.extend(0x0001u16.to_be_bytes()); // format 0, horizontal
        data.extend((pairs.len() as u16).to_be_bytes());
        data.extend([0u8; 6]); // searchRange, entrySelector, rangeShift
        let mut pairs = pairs.to_vec();
        pairs.sort_by_key(|&(left, right, _)| (left, right));
        for (left, right, value) in pairs {
            data.extend(left.to_be_bytes());
            data.extend(right.to_be_bytes());
            data.extend(value.to_be_bytes());
        }
        data
    }

    fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    /// A GPOS table with one `kern` feature pointing at one pair lookup
    fn gpos_table(subtable: &[u8]) -> Vec<u8> {
        let mut data = words(&[1, 0, 10, 12, 26]); // version, script/feature/lookup lists
        data.extend(words(&[0])); // no scripts
        data.extend(words(&[1]));
        data.extend(b"kern");
        data.extend(words(&[8])); // feature record
        data.extend(words(&[0, 1, 0])); // feature: no params, lookup 0
        data.extend(words(&[1, 4])); // lookup list
        data.extend(words(&[2, 0, 1, 8])); // pair lookup, one subtable
        data.extend(subtable);
        data
    }

    /// PairPos format 1 holding a single pair with an X advance
    fn pair_subtable(left: u32, right: u32, value: i16) -> Vec<u8> {
        let (left, right) = (left as u16, right as u16);
        let mut data = words(&[1, 18, 0x0004, 0, 1, 12]);
        data.extend(words(&[1, right, value as u16])); // pair set
        data.extend(words(&[1, 1, left])); // coverage
        data
    }

    /// PairPos format 2 with one left class and one right class
    fn class_subtable(left: u32, right: u32, value: i16) -> Vec<u8> {
        let (left, right) = (left as u16, right as u16);
        let mut data = words(&[2, 24, 0x0004, 0, 30, 38, 2, 2]);
        data.extend(words(&[0, 0, 0, value as u16])); // class1 x class2 records
        data.extend(words(&[1, 1, left])); // coverage
        data.extend(words(&[1, left, 1, 1])); // class def 1
        data.extend(words(&[1, right, 1, 1])); // class def 2
        data
    }

    /// The embedded font with tables added, replaced or removed
    fn embedded_with(edits: &[(&[u8; 4], Option<Vec<u8>>)]) -> FontFace {
        let font = crate::font::DEFAULT_FONT_DATA;
        let read_u32 = |at: usize| {
            u32::from_be_bytes([font[at], font[at + 1], font[at + 2], font[at + 3]]) as usize
        };

        let count = u16::from_be_bytes([font[4], font[5]]) as usize;
        let mut tables: Vec<([u8; 4], Vec<u8>)> = (0..count)
            .map(|i| {
                let record = 12 + 16 * i;
                let tag = [font[record], font[record + 1], font[record + 2], font[record + 3]];
                let (offset, len) = (read_u32(record + 8), read_u32(record + 12));
                (tag, font[offset..offset + len].to_vec())
            })
            .collect();
        for (tag, data) in edits {
            tables.retain(|(t, _)| t != *tag);
            if let Some(data) = data {
                tables.push((**tag, data.clone()));
            }
        }
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = font[0..4].to_vec();
        out.extend((tables.len() as u16).to_be_bytes());
        out.extend([0u8; 6]);
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            out.extend(tag);
            out.extend(0u32.to_be_bytes());
            out.extend((offset as u32).to_be_bytes());
            out.extend((data.len() as u32).to_be_bytes());
            offset += (data.len() + 3) & !3;
        }
        for (_, data) in &tables {
            out.extend(data);
            out.resize((out.len() + 3) & !3, 0);
        }
        FontFace::from_data(Arc::from(out), 0).unwrap()
    }

    fn pair(face: &FontFace, left: char, right: char) -> (GlyphId, GlyphId) {
        (face.glyph_id(left).unwrap(), face.glyph_id(right).unwrap())
    }

    #[test]
    fn test_kern_table_pairs() {
        let face = FontFace::embedded();
        let (a, v) = pair(&face, 'A', 'V');
        let t = face.glyph_id('T').unwrap();
        let kern = kern_table(&[(a as u16, v as u16, -80), (t as u16, a as u16, -120)]);
        let face = embedded_with(&[(b"kern", Some(kern))]);

        assert_eq!(kerning(&face, a, v, 1.0), -80.0);
        assert_eq!(kerning(&face, t, a, 0.5), -60.0);
        assert_eq!(kerning(&face, v, a, 1.0), 0.0);
    }

    #[test]
    fn test_kern_skips_vertical_subtables() {
        let face = FontFace::embedded();
        let (a, v) = pair(&face, 'A', 'V');
        let mut kern = kern_table(&[(a as u16, v as u16, -80)]);
        // Clear the horizontal bit
        kern[9] = 0x00;
        let face = embedded_with(&[(b"kern", Some(kern))]);
        assert_eq!(kerning(&face, a, v, 1.0), 0.0);
    }

    #[test]
    fn test_gpos_only_pair_kerning() {
        let face = FontFace::embedded();
        let (a, v) = pair(&face, 'A', 'V');
        let gpos = gpos_table(&pair_subtable(a, v, -150));
        let face = embedded_with(&[(b"GPOS", Some(gpos)), (b"kern", None)]);

        assert_eq!(kerning(&face, a, v, 1.0), -150.0);
        assert_eq!(kerning(&face, a, v, 0.5), -75.0);
        assert_eq!(kerning(&face, v, a, 1.0), 0.0);
    }

    #[test]
    fn test_gpos_class_kerning() {
        let face = FontFace::embedded();
        let (a, v) = pair(&face, 'A', 'V');
        let gpos = gpos_table(&class_subtable(a, v, -90));
        let face = embedded_with(&[(b"GPOS", Some(gpos))]);

        assert_eq!(kerning(&face, a, v, 1.0), -90.0);
        // Right glyph in class 0
        assert_eq!(kerning(&face, a, a, 1.0), 0.0);
        // Left glyph not covered
        assert_eq!(kerning(&face, v, a, 1.0), 0.0);
    }

    #[test]
    fn test_gpos_wins_over_kern_table() {
        let face = FontFace::embedded();
        let (a, v) = pair(&face, 'A', 'V');
        let t = face.glyph_id('T').unwrap();
        let gpos = gpos_table(&pair_subtable(a, v, -150));
        let kern = kern_table(&[(a as u16, v as u16, -80), (t as u16, a as u16, -120)]);
        let face = embedded_with(&[(b"GPOS", Some(gpos)), (b"kern", Some(kern))]);

        assert_eq!(kerning(&face, a, v, 1.0), -150.0);
        // Pairs GPOS lacks still come from kern
        assert_eq!(kerning(&face, t, a, 1.0), -120.0);
    }

    #[test]
    fn test_metrics_for_embedded_font() {
        let face = FontFace::embedded();
        let gid = face.glyph_id('A').unwrap();
        let scale = 0.5;

        // DejaVu Sans Mono: every advance is 1233 units
        assert_eq!(advance(&face, gid, scale), 616.5);
        assert!(left_side_bearing(&face, gid, scale) > 0.0);

        let v = vmetrics(&face, 1.0);
        assert_eq!(v.ascent, 1901.0);
        assert_eq!(v.descent, -483.0);
        assert_eq!(v.line_height(), 2384.0);
    }

    #[test]
    fn test_bbox_flip() {
        let face = FontFace::embedded();
        let gid = face.glyph_id('O').unwrap();

        let up = bbox(&face, gid, 1.0, false);
        let down = bbox(&face, gid, 1.0, true);
        assert!(up.valid && down.valid);
        assert_eq!(up.y1, -down.y0);
        assert_eq!(up.y0, -down.y1);
        assert!(down.y0 < down.y1);
        assert!(up.y0 < 0.0, "'O' overshoots the baseline");
    }

    #[test]
    fn test_space_has_no_bbox() {
        let face = FontFace::embedded();
        let gid = face.glyph_id(' ').unwrap();
        assert!(!bbox(&face, gid, 1.0, false).valid);
        assert!(advance(&face, gid, 1.0) > 0.0);
    }

    #[test]
    fn test_font_without_kern_table() {
        let face = FontFace::embedded();
        let a = face.glyph_id('A').unwrap();
        let v = face.glyph_id('V').unwrap();
        assert_eq!(kerning(&face, a, v, 1.0), 0.0);
    }
}
