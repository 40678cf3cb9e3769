//! Pipeline configuration
//!
//! Every knob has a default that works for on-screen labels. A process-wide
//! copy is read once from the environment the first time [`PipelineConfig::global`]
//! is called:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `GLYPHMESH_EPSILON` | flattening tolerance in output units |
//! | `GLYPHMESH_MAX_DEPTH` | subdivision depth ceiling (at most 16) |
//! | `GLYPHMESH_CACHE_SIZE` | glyph slots per font source |
//! | `GLYPHMESH_CACHE_POLICY` | `rr` (round-robin) or `lru` |
//! | `GLYPHMESH_FONT_PATH` | extra directories searched for named fonts |
//!
//! ```bash
//! GLYPHMESH_EPSILON=0.05 GLYPHMESH_CACHE_POLICY=lru ./my_app
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::curves::{DEFAULT_EPSILON, MAX_DEPTH};

/// Default number of glyph slots per font source
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Process-wide configuration, filled from the environment on first use
static GLOBAL: OnceLock<PipelineConfig> = OnceLock::new();

/// Curve flattening tolerance and recursion ceiling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenConfig {
    /// Maximum distance between a control point and its chord, in output units
    pub epsilon: f32,
    /// Subdivision depth ceiling, clamped to [`MAX_DEPTH`]
    pub max_depth: u32,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Which slot a full cache gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Overwrite slots in order, regardless of use
    #[default]
    RoundRobin,
    /// Overwrite the slot touched longest ago
    LeastRecentlyUsed,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rr" | "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            "lru" | "least-recently-used" => Ok(Self::LeastRecentlyUsed),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

/// Per-font glyph cache sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            policy: EvictionPolicy::default(),
        }
    }
}

/// How a requested pixel size becomes a font-unit scale factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// `px` spans the distance from descender to ascender
    #[default]
    PixelHeight,
    /// `px` is the em size
    EmSize,
}

impl ScaleMode {
    /// Scale from font units to output units
    ///
    /// Falls back to the em square when the vertical metrics are unusable.
    pub fn scale_factor(self, px: f32, units_per_em: u16, ascent: i16, descent: i16) -> f32 {
        let upem = f32::from(units_per_em.max(1));
        match self {
            ScaleMode::PixelHeight => {
                let height = f32::from(ascent) - f32::from(descent);
                if height > 0.0 {
                    px / height
                } else {
                    px / upem
                }
            },
            ScaleMode::EmSize => px / upem,
        }
    }
}

/// Everything the pipeline can be told
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineConfig {
    pub flatten: FlattenConfig,
    pub cache: CacheConfig,
    pub scale_mode: ScaleMode,
    /// Emit y-down coordinates instead of the font's y-up convention
    pub flip_y: bool,
    /// Directories searched when a font is requested by name
    pub font_dirs: Vec<PathBuf>,
}

impl PipelineConfig {
    /// The process-wide configuration
    pub fn global() -> &'static PipelineConfig {
        GLOBAL.get_or_init(PipelineConfig::from_env)
    }

    /// Defaults overridden by `GLYPHMESH_*` environment variables
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|name| std::env::var(name).ok());
        if config != Self::default() {
            log::info!("glyphmesh configuration from environment: {:?}", config);
        }
        config
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(epsilon) = parse_var::<f32>(&lookup, "GLYPHMESH_EPSILON") {
            if epsilon.is_finite() && epsilon >= 0.0 {
                config.flatten.epsilon = epsilon;
            } else {
                log::warn!("GLYPHMESH_EPSILON must be a finite non-negative number");
            }
        }
        if let Some(depth) = parse_var::<u32>(&lookup, "GLYPHMESH_MAX_DEPTH") {
            config.flatten.max_depth = depth.min(MAX_DEPTH);
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "GLYPHMESH_CACHE_SIZE") {
            config.cache.capacity = capacity.max(1);
        }
        if let Some(policy) = parse_var::<EvictionPolicy>(&lookup, "GLYPHMESH_CACHE_POLICY") {
            config.cache.policy = policy;
        }
        if let Some(paths) = lookup("GLYPHMESH_FONT_PATH") {
            config.font_dirs = std::env::split_paths(&paths).collect();
        }

        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.flatten.max_depth, 16);
        assert_eq!(config.cache.capacity, 128);
        assert_eq!(config.cache.policy, EvictionPolicy::RoundRobin);
        assert_eq!(config.scale_mode, ScaleMode::PixelHeight);
        assert!(!config.flip_y);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("GLYPHMESH_EPSILON", "0.25"),
            ("GLYPHMESH_MAX_DEPTH", "40"),
            ("GLYPHMESH_CACHE_SIZE", "8"),
            ("GLYPHMESH_CACHE_POLICY", "LRU"),
        ]));

        assert_eq!(config.flatten.epsilon, 0.25);
        assert_eq!(config.flatten.max_depth, 16, "depth is clamped to the ceiling");
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.cache.policy, EvictionPolicy::LeastRecentlyUsed);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("GLYPHMESH_EPSILON", "-1"),
            ("GLYPHMESH_CACHE_SIZE", "lots"),
            ("GLYPHMESH_CACHE_POLICY", "fifo"),
        ]));

        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_scale_modes() {
        let px_height = ScaleMode::PixelHeight.scale_factor(24.0, 2048, 1901, -483);
        assert!((px_height - 24.0 / 2384.0).abs() < 1e-9);

        let em = ScaleMode::EmSize.scale_factor(24.0, 2048, 1901, -483);
        assert!((em - 24.0 / 2048.0).abs() < 1e-9);

        // Broken vertical metrics fall back to the em square
        let fallback = ScaleMode::PixelHeight.scale_factor(24.0, 1000, 0, 0);
        assert!((fallback - 0.024).abs() < 1e-9);
    }
}
