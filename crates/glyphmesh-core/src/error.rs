//! Error types for glyphmesh

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlyphError>;

/// Main error type for glyphmesh
#[derive(Debug, Error)]
pub enum GlyphError {
    #[error("Font loading failed: {0}")]
    FontLoad(#[from] FontLoadError),

    #[error("Triangulation failed: {0}")]
    Triangulation(#[from] TriangulationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Font loading errors
///
/// Callers normally never see these: a failed load falls back to the
/// embedded default font.
#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("Font data is empty")]
    Empty,

    #[error("Font data truncated: {len} bytes")]
    Truncated { len: usize },

    #[error("Invalid font data: {0}")]
    InvalidData(String),

    #[error("Font file not found: {0}")]
    FileNotFound(String),
}

/// Triangulation errors for a single ring group
#[derive(Debug, Error)]
pub enum TriangulationError {
    #[error("Ear clipping failed: {0}")]
    Earcut(String),

    #[error("Ring coordinates are not finite")]
    NonFinite,

    #[error("Triangulator returned {len} indices")]
    MalformedIndices { len: usize },

    #[error("Ring group refers to contour {index}, which the outline does not have")]
    UnknownContour { index: usize },
}
