//! Glyph cache behaviour through a font source

use glyphmesh::{FontSource, PipelineConfig};
use glyphmesh_core::{CacheConfig, EvictionPolicy};

fn font_with_cache(capacity: usize, policy: EvictionPolicy) -> FontSource {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = PipelineConfig {
        cache: CacheConfig { capacity, policy },
        ..PipelineConfig::default()
    };
    FontSource::load_default_with(&config)
}

#[test]
fn capacity_plus_one_evicts_the_first() {
    let capacity = 4;
    let mut font = font_with_cache(capacity, EvictionPolicy::RoundRobin);

    let characters = ['a', 'b', 'c', 'd', 'e'];
    for &c in &characters {
        font.mesh(c);
    }
    let stats = font.cache_stats();
    assert_eq!(stats.misses, 5);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.len, capacity);
    assert!(font.cache().get('a').is_none());

    // Coming back to 'a' is a rebuild, not a hit
    let rebuilt = font.mesh('a').clone();
    let stats = font.cache_stats();
    assert_eq!(stats.misses, 6);
    assert_eq!(stats.hits, 0);
    assert!(rebuilt.triangle_count() > 0);
}

#[test]
fn repeated_requests_hit() {
    let mut font = font_with_cache(128, EvictionPolicy::RoundRobin);
    font.mesh('x');
    font.bitmap('x');
    font.metrics('x');

    let stats = font.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);

    let entry = font.cache().get('x').unwrap();
    assert!(entry.mesh().is_some());
    assert!(entry.bitmap().is_some());
}

#[test]
fn representations_are_built_lazily() {
    let mut font = font_with_cache(8, EvictionPolicy::RoundRobin);
    font.metrics('k');
    let entry = font.cache().get('k').unwrap();
    assert!(entry.mesh().is_none());
    assert!(entry.bitmap().is_none());

    font.bitmap('k');
    let entry = font.cache().get('k').unwrap();
    assert!(entry.mesh().is_none());
    assert!(entry.bitmap().is_some());
}

#[test]
fn lru_keeps_hot_glyphs() {
    let mut font = font_with_cache(3, EvictionPolicy::LeastRecentlyUsed);
    for c in ['a', 'b', 'c'] {
        font.mesh(c);
    }
    font.mesh('a');
    font.mesh('d');

    assert!(font.cache().get('a').is_some());
    assert!(font.cache().get('b').is_none());
}

#[test]
fn size_change_rebuilds_geometry() {
    let mut font = font_with_cache(128, EvictionPolicy::RoundRobin);
    font.set_size(12.0);
    let small = font.mesh('M').bbox;
    let small_area = font.mesh('M').triangle_area();

    font.set_size(48.0);
    assert!(font.cache().is_empty(), "size change must drop cached glyphs");
    let large = font.mesh('M').bbox;
    let large_area = font.mesh('M').triangle_area();

    assert!((large.width() / small.width() - 4.0).abs() < 1e-3);
    assert!((large.height() / small.height() - 4.0).abs() < 1e-3);
    assert!((large_area / small_area - 16.0).abs() < 0.5);

    let bitmap = font.bitmap('M');
    assert!(bitmap.height as f32 >= large.height());
}
