//! Process-wide glyph sharing
//!
//! Two text nodes asking for the same character in the same font, size and
//! rotation get the same [`Glyph`]. Handles are reference counted: a
//! [`SharedGlyph`] retains on clone and releases on drop, and the glyph
//! leaves the registry when the last handle goes.
//!
//! Everything happens under one lock, including building a missing glyph, so
//! callers never see a half-built entry. Font sources are kept per
//! `(font, size)` while at least one of their glyphs is alive.
//!
//! ```
//! use glyphmesh::{FontKey, GlyphKey, GlyphKind, GlyphRegistry};
//! use glyphmesh_core::PipelineConfig;
//!
//! let registry = GlyphRegistry::new(PipelineConfig::default());
//! let key = GlyphKey::new('A', FontKey::Default, 16.0, 0.0, GlyphKind::Mesh);
//!
//! let first = registry.acquire(key.clone());
//! let second = registry.acquire(key.clone());
//! assert!(first.ptr_eq(&second));
//! assert_eq!(registry.refcount(&key), 2);
//!
//! drop(first);
//! drop(second);
//! assert!(registry.is_empty());
//! ```
//!
//! A process-wide instance is available through [`GlyphRegistry::global`].
//! Statics are never dropped, so glyphs still registered at exit are
//! reclaimed by the OS rather than by the registry.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use glyphmesh_core::types::{GlyphBBox, GlyphData, GlyphId, GlyphKind, GlyphMetrics};
use glyphmesh_core::PipelineConfig;

use crate::font::{FontKey, FontSource, DEFAULT_PIXEL_SIZE};

static GLOBAL: OnceLock<GlyphRegistry> = OnceLock::new();

/// What makes two glyph requests the same
#[derive(Debug, Clone)]
pub struct GlyphKey {
    pub character: char,
    pub font: FontKey,
    /// Pixel size
    pub size: f32,
    /// Rotation in radians; only tells glyphs apart, the geometry is not rotated
    pub angle: f32,
    pub kind: GlyphKind,
}

impl GlyphKey {
    pub fn new(character: char, font: FontKey, size: f32, angle: f32, kind: GlyphKind) -> Self {
        Self {
            character,
            font,
            size,
            angle,
            kind,
        }
    }

    pub fn mesh(character: char, font: FontKey, size: f32) -> Self {
        Self::new(character, font, size, 0.0, GlyphKind::Mesh)
    }

    pub fn bitmap(character: char, font: FontKey, size: f32) -> Self {
        Self::new(character, font, size, 0.0, GlyphKind::Bitmap)
    }

    fn font_key(&self) -> (FontKey, u32) {
        (self.font.clone(), float_bits(self.size))
    }

    /// The key with the size a font source will actually apply, when that differs
    fn resized(&self) -> Option<Self> {
        if self.size.is_finite() && self.size > 0.0 {
            return None;
        }
        Some(Self {
            size: DEFAULT_PIXEL_SIZE,
            ..self.clone()
        })
    }
}

/// Bit pattern with both zeros collapsed, so `-0.0` and `0.0` match
fn float_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

impl PartialEq for GlyphKey {
    fn eq(&self, other: &Self) -> bool {
        self.character == other.character
            && self.font == other.font
            && float_bits(self.size) == float_bits(other.size)
            && float_bits(self.angle) == float_bits(other.angle)
            && self.kind == other.kind
    }
}

impl Eq for GlyphKey {}

impl Hash for GlyphKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.character.hash(state);
        self.font.hash(state);
        float_bits(self.size).hash(state);
        float_bits(self.angle).hash(state);
        self.kind.hash(state);
    }
}

/// One built glyph, shared by every handle with the same key
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub key: GlyphKey,
    pub glyph_id: Option<GlyphId>,
    pub metrics: GlyphMetrics,
    pub bbox: GlyphBBox,
    pub data: GlyphData,
}

impl Glyph {
    /// Pen advance as a 2D vector; the second component is always 0
    pub fn advance(&self) -> [f32; 2] {
        [self.metrics.advance, 0.0]
    }
}

struct Entry {
    glyph: Arc<Glyph>,
    refcount: usize,
}

struct FontSlot {
    source: FontSource,
    glyphs: usize,
}

struct RegistryState {
    config: PipelineConfig,
    entries: HashMap<GlyphKey, Entry>,
    fonts: HashMap<(FontKey, u32), FontSlot>,
}

/// Reference-counted glyph table behind a single lock
///
/// Cloning the registry clones the handle, not the table.
#[derive(Clone)]
pub struct GlyphRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl std::fmt::Debug for GlyphRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GlyphRegistry")
            .field("glyphs", &state.entries.len())
            .field("fonts", &state.fonts.len())
            .finish()
    }
}

impl Default for GlyphRegistry {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl GlyphRegistry {
    /// An isolated registry
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                config,
                entries: HashMap::new(),
                fonts: HashMap::new(),
            })),
        }
    }

    /// The process-wide registry, configured from the environment
    pub fn global() -> &'static GlyphRegistry {
        GLOBAL.get_or_init(|| GlyphRegistry::new(PipelineConfig::global().clone()))
    }

    /// Share the glyph for `key`, building it on first request
    ///
    /// A zero, negative or non-finite size is registered as
    /// [`DEFAULT_PIXEL_SIZE`], the size the glyph is built at.
    pub fn acquire(&self, key: GlyphKey) -> SharedGlyph {
        let key = match key.resized() {
            Some(resized) => {
                log::warn!(
                    "Glyph {:?} requested at invalid size {}, using {}px",
                    key.character,
                    key.size,
                    DEFAULT_PIXEL_SIZE
                );
                resized
            },
            None => key,
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.refcount += 1;
            return SharedGlyph {
                glyph: Arc::clone(&entry.glyph),
                registry: self.clone(),
            };
        }

        let glyph = Arc::new(build_glyph(state, key.clone()));
        log::debug!(
            "Registered glyph {:?} ({:?}, {}px)",
            key.character,
            key.font,
            key.size
        );
        state.entries.insert(
            key,
            Entry {
                glyph: Arc::clone(&glyph),
                refcount: 1,
            },
        );

        SharedGlyph {
            glyph,
            registry: self.clone(),
        }
    }

    /// Give up a handle; same as dropping it
    pub fn release(&self, glyph: SharedGlyph) {
        drop(glyph);
    }

    /// Registered glyphs
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Live handles for `key`, 0 when it is not registered
    pub fn refcount(&self, key: &GlyphKey) -> usize {
        let resized = key.resized();
        self.state
            .lock()
            .entries
            .get(resized.as_ref().unwrap_or(key))
            .map_or(0, |entry| entry.refcount)
    }

    /// Font sources currently kept alive by registered glyphs
    pub fn font_count(&self) -> usize {
        self.state.lock().fonts.len()
    }

    fn retain(&self, key: &GlyphKey) {
        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) => entry.refcount += 1,
            None => unreachable!("retained glyph {:?} is not registered", key),
        }
    }

    fn release_key(&self, key: &GlyphKey) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let remaining = match state.entries.get_mut(key) {
            Some(entry) => {
                assert!(entry.refcount > 0, "glyph {:?} released too often", key);
                entry.refcount -= 1;
                entry.refcount
            },
            None => unreachable!("released glyph {:?} is not registered", key),
        };
        if remaining > 0 {
            return;
        }

        state.entries.remove(key);
        log::debug!("Removed glyph {:?} ({:?}, {}px)", key.character, key.font, key.size);

        let font_key = key.font_key();
        let unused = state.fonts.get_mut(&font_key).is_some_and(|slot| {
            slot.glyphs = slot.glyphs.saturating_sub(1);
            slot.glyphs == 0
        });
        if unused {
            state.fonts.remove(&font_key);
            log::debug!("Dropped font source {:?} at {}px", key.font, key.size);
        }
    }
}

/// Build a glyph through the shared font source for its `(font, size)`
fn build_glyph(state: &mut RegistryState, key: GlyphKey) -> Glyph {
    let config = &state.config;
    let slot = state.fonts.entry(key.font_key()).or_insert_with(|| {
        let mut source = FontSource::from_key(&key.font, config);
        source.set_size(key.size);
        FontSlot { source, glyphs: 0 }
    });
    slot.glyphs += 1;

    let source = &mut slot.source;
    let entry = source.entry(key.character);
    let (glyph_id, metrics, bbox) = (entry.glyph_id, entry.metrics, entry.bbox);

    let data = if !bbox.valid {
        GlyphData::Empty
    } else {
        match key.kind {
            GlyphKind::Mesh => GlyphData::Mesh(source.mesh(key.character).clone()),
            GlyphKind::Bitmap => GlyphData::Bitmap(source.bitmap(key.character).clone()),
        }
    };

    Glyph {
        key,
        glyph_id,
        metrics,
        bbox,
        data,
    }
}

/// A counted reference to a registered glyph
///
/// Dereferences to [`Glyph`]. Clones count as separate references.
pub struct SharedGlyph {
    glyph: Arc<Glyph>,
    registry: GlyphRegistry,
}

impl SharedGlyph {
    /// Whether two handles point at the same glyph
    pub fn ptr_eq(&self, other: &SharedGlyph) -> bool {
        Arc::ptr_eq(&self.glyph, &other.glyph)
    }
}

impl Deref for SharedGlyph {
    type Target = Glyph;

    fn deref(&self) -> &Glyph {
        &self.glyph
    }
}

impl Clone for SharedGlyph {
    fn clone(&self) -> Self {
        self.registry.retain(&self.glyph.key);
        Self {
            glyph: Arc::clone(&self.glyph),
            registry: self.registry.clone(),
        }
    }
}

impl Drop for SharedGlyph {
    fn drop(&mut self) {
        self.registry.release_key(&self.glyph.key);
    }
}

impl std::fmt::Debug for SharedGlyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedGlyph").field(&*self.glyph).finish()
    }
}
