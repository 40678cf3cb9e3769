//! Per-font glyph cache
//!
//! A fixed arena of slots, one glyph per slot. A full cache reuses a slot in
//! place instead of freeing and reallocating. Bitmaps and meshes inside an
//! entry are built lazily by the owning [`FontSource`](crate::FontSource) and
//! dropped together with the entry.

use glyphmesh_core::types::{GlyphBBox, GlyphBitmap, GlyphId, GlyphMesh, GlyphMetrics};
use glyphmesh_core::{CacheConfig, EvictionPolicy};

/// Everything known about one character at the cache's size
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub character: char,
    /// `None` when the font does not map the character
    pub glyph_id: Option<GlyphId>,
    pub metrics: GlyphMetrics,
    pub bbox: GlyphBBox,
    pub(crate) bitmap: Option<GlyphBitmap>,
    pub(crate) mesh: Option<GlyphMesh>,
}

impl CacheEntry {
    /// An entry with metrics only
    pub fn new(
        character: char,
        glyph_id: Option<GlyphId>,
        metrics: GlyphMetrics,
        bbox: GlyphBBox,
    ) -> Self {
        Self {
            character,
            glyph_id,
            metrics,
            bbox,
            bitmap: None,
            mesh: None,
        }
    }

    /// The bitmap, if one was requested during this entry's lifetime
    pub fn bitmap(&self) -> Option<&GlyphBitmap> {
        self.bitmap.as_ref()
    }

    /// The mesh, if one was requested during this entry's lifetime
    pub fn mesh(&self) -> Option<&GlyphMesh> {
        self.mesh.as_ref()
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    last_used: u64,
}

/// Fixed-capacity character → glyph store
#[derive(Debug)]
pub struct GlyphCache {
    slots: Vec<Slot>,
    /// Next slot to overwrite under round-robin
    write: usize,
    policy: EvictionPolicy,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl GlyphCache {
    /// A capacity of zero is bumped to one
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            write: 0,
            policy: config.policy,
            clock: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.entry.is_none())
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Look at an entry without touching statistics or recency
    pub fn get(&self, character: char) -> Option<&CacheEntry> {
        self.position(character)
            .and_then(|index| self.slots[index].entry.as_ref())
    }

    pub fn contains(&self, character: char) -> bool {
        self.position(character).is_some()
    }

    /// Find the entry for `character`, building it with `build` on a miss
    ///
    /// A miss on a full cache evicts one slot according to the policy.
    pub fn get_or_create<F>(&mut self, character: char, build: F) -> &mut CacheEntry
    where
        F: FnOnce(char) -> CacheEntry,
    {
        let index = match self.position(character) {
            Some(index) => {
                self.hits += 1;
                index
            },
            None => {
                self.misses += 1;
                log::debug!("Glyph cache miss for {:?}", character);
                self.claim_slot()
            },
        };

        self.clock += 1;
        let slot = &mut self.slots[index];
        slot.last_used = self.clock;
        slot.entry.get_or_insert_with(|| build(character))
    }

    /// Drop every entry, keeping statistics
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
        self.write = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.len(),
            capacity: self.capacity(),
        }
    }

    fn position(&self, character: char) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.entry
                .as_ref()
                .is_some_and(|entry| entry.character == character)
        })
    }

    /// Pick the slot a new entry goes into and empty it
    fn claim_slot(&mut self) -> usize {
        let index = match self.policy {
            EvictionPolicy::RoundRobin => {
                let index = self.write;
                self.write = (self.write + 1) % self.slots.len();
                index
            },
            EvictionPolicy::LeastRecentlyUsed => self
                .slots
                .iter()
                .position(|slot| slot.entry.is_none())
                .or_else(|| {
                    self.slots
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, slot)| slot.last_used)
                        .map(|(index, _)| index)
                })
                .unwrap_or(0),
        };

        if let Some(old) = self.slots[index].entry.take() {
            self.evictions += 1;
            log::debug!("Evicting {:?} from glyph cache slot {}", old.character, index);
        }
        index
    }
}

/// Glyph cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
