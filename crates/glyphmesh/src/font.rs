//! Font sources: raw bytes, a scale, and the glyphs already built at that scale
//!
//! A [`FontSource`] never fails to exist. Bad bytes, missing files and
//! unknown names all end in the embedded DejaVu Sans Mono, with a warning in
//! the log.
//!
//! ## Memory Management
//!
//! Faces keep their bytes behind an `Arc<[u8]>` and create a `FontRef` on
//! demand for parsing. The embedded font is shared by every source that falls
//! back to it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use read_fonts::TableProvider;
use skrifa::{FontRef, MetadataProvider};

use glyphmesh_core::curves::Flattener;
use glyphmesh_core::triangulate::tessellate;
use glyphmesh_core::types::{
    GlyphBBox, GlyphBitmap, GlyphId, GlyphMesh, GlyphMetrics, Outline, VMetrics,
};
use glyphmesh_core::{FontLoadError, PipelineConfig, ScaleMode};

use crate::cache::{CacheEntry, CacheStats, GlyphCache};
use crate::{extract, metrics, raster};

/// DejaVu Sans Mono, used whenever nothing better is available
pub static DEFAULT_FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Pixel size a freshly loaded source starts at
pub const DEFAULT_PIXEL_SIZE: f32 = 12.0;

/// Smallest buffer that can hold an sfnt table directory header
const MIN_FONT_LEN: usize = 12;

fn default_font_data() -> Arc<[u8]> {
    static DATA: OnceLock<Arc<[u8]>> = OnceLock::new();
    DATA.get_or_init(|| Arc::from(DEFAULT_FONT_DATA)).clone()
}

/// Which font a glyph comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FontKey {
    /// The embedded fallback font
    #[default]
    Default,
    /// A file path, or a file name looked up in the configured font directories
    Named(String),
}

impl FontKey {
    pub fn named(name: impl Into<String>) -> Self {
        FontKey::Named(name.into())
    }

    /// Paths worth trying for this key, most specific first
    pub fn candidates(&self, font_dirs: &[PathBuf]) -> Vec<PathBuf> {
        let FontKey::Named(name) = self else {
            return Vec::new();
        };

        let mut paths = vec![PathBuf::from(name)];
        for dir in font_dirs {
            let base = dir.join(name);
            paths.push(base.with_extension("ttf"));
            paths.push(base.with_extension("otf"));
            paths.push(base);
        }
        paths
    }
}

impl From<&str> for FontKey {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            FontKey::Default
        } else {
            FontKey::Named(name.to_string())
        }
    }
}

/// A parsed face: the bytes plus the font-wide numbers every query needs
#[derive(Clone)]
pub struct FontFace {
    data: Arc<[u8]>,
    face_index: u32,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
    is_default: bool,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("len", &self.data.len())
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .field("is_default", &self.is_default)
            .finish()
    }
}

impl FontFace {
    /// Validate `data` and read the font-wide metrics of face `face_index`
    pub fn from_data(data: Arc<[u8]>, face_index: u32) -> Result<Self, FontLoadError> {
        if data.is_empty() {
            return Err(FontLoadError::Empty);
        }
        if data.len() < MIN_FONT_LEN {
            return Err(FontLoadError::Truncated { len: data.len() });
        }

        let font = FontRef::from_index(&data, face_index)
            .map_err(|e| FontLoadError::InvalidData(e.to_string()))?;

        let units_per_em = font
            .head()
            .map(|head| head.units_per_em())
            .map_err(|e| FontLoadError::InvalidData(format!("head: {}", e)))?;
        if units_per_em == 0 {
            return Err(FontLoadError::InvalidData("unitsPerEm is zero".to_string()));
        }

        let (ascent, descent, line_gap) = font
            .hhea()
            .map(|hhea| {
                (
                    hhea.ascender().to_i16(),
                    hhea.descender().to_i16(),
                    hhea.line_gap().to_i16(),
                )
            })
            .unwrap_or_else(|_| {
                log::debug!("No hhea table, estimating vertical metrics from the em square");
                let upem = units_per_em.min(i16::MAX as u16) as i16;
                (upem - upem / 5, -(upem / 5), 0)
            });

        Ok(Self {
            data,
            face_index,
            units_per_em,
            ascent,
            descent,
            line_gap,
            is_default: false,
        })
    }

    /// The embedded fallback face
    pub fn embedded() -> Self {
        match Self::from_data(default_font_data(), 0) {
            Ok(mut face) => {
                face.is_default = true;
                face
            },
            // The bundled file is part of the crate and always parses
            Err(e) => unreachable!("embedded font is invalid: {}", e),
        }
    }

    /// Creates a FontRef on demand for parsing operations
    pub fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.face_index).ok()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Ascender in font units
    pub fn ascent(&self) -> i16 {
        self.ascent
    }

    /// Descender in font units, negative below the baseline
    pub fn descent(&self) -> i16 {
        self.descent
    }

    pub fn line_gap(&self) -> i16 {
        self.line_gap
    }

    /// Whether this is the embedded fallback font
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Finds which glyph draws this character
    ///
    /// Unmapped characters (which fonts route to `.notdef`) return `None`.
    pub fn glyph_id(&self, ch: char) -> Option<GlyphId> {
        let font = self.font_ref()?;
        font.charmap()
            .map(ch)
            .map(|gid| gid.to_u32())
            .filter(|&gid| gid != 0)
    }

    /// Scale from font units to output units for a pixel size
    pub fn scale_for(&self, px: f32, mode: ScaleMode) -> f32 {
        mode.scale_factor(px, self.units_per_em, self.ascent, self.descent)
    }
}

/// One font at one pixel size, with its glyph cache
///
/// ```
/// use glyphmesh::FontSource;
///
/// let mut font = FontSource::load_default();
/// font.set_size(24.0);
///
/// let mesh = font.mesh('A');
/// assert!(mesh.triangle_count() > 0);
/// assert!(mesh.bbox.valid);
/// ```
///
/// Not internally synchronized: share one source between threads only behind
/// a lock, or give each thread its own.
#[derive(Debug)]
pub struct FontSource {
    face: FontFace,
    pixel_size: f32,
    scale: f32,
    scale_mode: ScaleMode,
    flattener: Flattener,
    flip_y: bool,
    cache: GlyphCache,
}

impl FontSource {
    /// Load font bytes with the process-wide configuration
    pub fn load(data: impl Into<Arc<[u8]>>) -> Result<Self, FontLoadError> {
        Self::load_with(data, 0, PipelineConfig::global())
    }

    /// Load one face of a font collection
    pub fn load_index(data: impl Into<Arc<[u8]>>, face_index: u32) -> Result<Self, FontLoadError> {
        Self::load_with(data, face_index, PipelineConfig::global())
    }

    pub fn load_with(
        data: impl Into<Arc<[u8]>>,
        face_index: u32,
        config: &PipelineConfig,
    ) -> Result<Self, FontLoadError> {
        let face = FontFace::from_data(data.into(), face_index)?;
        log::debug!(
            "Loaded font face {} ({} bytes, {} units/em)",
            face_index,
            face.data.len(),
            face.units_per_em
        );
        Ok(Self::from_face(face, config))
    }

    /// The embedded fallback font; always succeeds
    pub fn load_default() -> Self {
        Self::load_default_with(PipelineConfig::global())
    }

    pub fn load_default_with(config: &PipelineConfig) -> Self {
        Self::from_face(FontFace::embedded(), config)
    }

    /// Load `data`, or fall back to the embedded font if it does not parse
    pub fn load_or_default(data: impl Into<Arc<[u8]>>) -> Self {
        Self::load_or_default_with(data, PipelineConfig::global())
    }

    pub fn load_or_default_with(data: impl Into<Arc<[u8]>>, config: &PipelineConfig) -> Self {
        match Self::load_with(data, 0, config) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("{}; falling back to the embedded font", e);
                Self::load_default_with(config)
            },
        }
    }

    /// Opens a font file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontLoadError> {
        Self::from_file_with(path, PipelineConfig::global())
    }

    pub fn from_file_with(
        path: impl AsRef<Path>,
        config: &PipelineConfig,
    ) -> Result<Self, FontLoadError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|_| FontLoadError::FileNotFound(path.display().to_string()))?;
        Self::load_with(data, 0, config)
    }

    /// Resolve `key` against the configured font directories
    ///
    /// Anything that cannot be found or parsed becomes the embedded font.
    pub fn from_key(key: &FontKey, config: &PipelineConfig) -> Self {
        let candidates = key.candidates(&config.font_dirs);
        if candidates.is_empty() {
            return Self::load_default_with(config);
        }

        let mut last_error = None;
        for path in candidates.iter().filter(|path| path.is_file()) {
            match Self::from_file_with(path, config) {
                Ok(source) => return source,
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => log::warn!("{}; falling back to the embedded font", e),
            None => log::warn!("Font {:?} not found; falling back to the embedded font", key),
        }
        Self::load_default_with(config)
    }

    fn from_face(face: FontFace, config: &PipelineConfig) -> Self {
        let scale = face.scale_for(DEFAULT_PIXEL_SIZE, config.scale_mode);
        Self {
            face,
            pixel_size: DEFAULT_PIXEL_SIZE,
            scale,
            scale_mode: config.scale_mode,
            flattener: Flattener::from_config(&config.flatten),
            flip_y: config.flip_y,
            cache: GlyphCache::new(config.cache),
        }
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn is_default(&self) -> bool {
        self.face.is_default
    }

    pub fn size(&self) -> f32 {
        self.pixel_size
    }

    /// Output units per font unit
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    /// Change the pixel size, dropping every cached glyph
    ///
    /// Non-positive or non-finite sizes are ignored.
    pub fn set_size(&mut self, px: f32) {
        if !(px.is_finite() && px > 0.0) {
            log::warn!("Ignoring invalid pixel size {}", px);
            return;
        }
        if px == self.pixel_size {
            return;
        }
        log::debug!("Font size {} -> {}, clearing glyph cache", self.pixel_size, px);
        self.pixel_size = px;
        self.scale = self.face.scale_for(px, self.scale_mode);
        self.cache.clear();
    }

    /// The cache entry for `character`, built with metrics only on a miss
    pub fn entry(&mut self, character: char) -> &CacheEntry {
        self.entry_mut(character)
    }

    fn entry_mut(&mut self, character: char) -> &mut CacheEntry {
        let face = &self.face;
        let (scale, flip_y) = (self.scale, self.flip_y);
        self.cache
            .get_or_create(character, |c| build_entry(face, scale, flip_y, c))
    }

    pub fn metrics(&mut self, character: char) -> GlyphMetrics {
        self.entry_mut(character).metrics
    }

    pub fn bbox(&mut self, character: char) -> GlyphBBox {
        self.entry_mut(character).bbox
    }

    /// Triangulated geometry for `character`, built on first request
    ///
    /// The reference is valid until the entry is evicted or the size changes.
    pub fn mesh(&mut self, character: char) -> &GlyphMesh {
        let face = &self.face;
        let (scale, flip_y, flattener) = (self.scale, self.flip_y, self.flattener);
        let entry = self
            .cache
            .get_or_create(character, |c| build_entry(face, scale, flip_y, c));

        let (glyph_id, metrics, bbox) = (entry.glyph_id, entry.metrics, entry.bbox);
        entry.mesh.get_or_insert_with(|| {
            let outline =
                glyph_id.and_then(|gid| extract::extract(face, gid, scale, flip_y, &flattener));
            match outline {
                Some(outline) => tessellate(&outline).with_metrics(metrics, bbox),
                None => GlyphMesh::empty(metrics, bbox),
            }
        })
    }

    /// Coverage bitmap for `character`, built on first request
    pub fn bitmap(&mut self, character: char) -> &GlyphBitmap {
        let face = &self.face;
        let (scale, flip_y) = (self.scale, self.flip_y);
        let entry = self
            .cache
            .get_or_create(character, |c| build_entry(face, scale, flip_y, c));

        let glyph_id = entry.glyph_id;
        entry.bitmap.get_or_insert_with(|| match glyph_id {
            Some(gid) => raster::rasterize(face, gid, scale),
            None => GlyphBitmap::empty(),
        })
    }

    /// A fresh flattened outline; not cached
    pub fn outline(&self, character: char) -> Option<Outline> {
        let gid = self.face.glyph_id(character)?;
        extract::extract(&self.face, gid, self.scale, self.flip_y, &self.flattener)
    }

    /// Pen advance as a 2D vector; the second component is always 0
    pub fn advance(&mut self, character: char) -> [f32; 2] {
        [self.metrics(character).advance, 0.0]
    }

    /// Kerning between two characters as a 2D vector; the second component is always 0
    pub fn kerning(&self, left: char, right: char) -> [f32; 2] {
        let (Some(l), Some(r)) = (self.face.glyph_id(left), self.face.glyph_id(right)) else {
            return [0.0, 0.0];
        };
        [metrics::kerning(&self.face, l, r, self.scale), 0.0]
    }

    pub fn vmetrics(&self) -> VMetrics {
        metrics::vmetrics(&self.face, self.scale)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }
}

/// Metrics-only entry; unmapped characters take `.notdef`'s advance
fn build_entry(face: &FontFace, scale: f32, flip_y: bool, character: char) -> CacheEntry {
    let glyph_id = face.glyph_id(character);
    let metrics = metrics::glyph_metrics(face, glyph_id.unwrap_or(0), scale);
    let bbox = match glyph_id {
        Some(gid) => metrics::bbox(face, gid, scale, flip_y),
        None => GlyphBBox::EMPTY,
    };
    CacheEntry::new(character, glyph_id, metrics, bbox)
}
