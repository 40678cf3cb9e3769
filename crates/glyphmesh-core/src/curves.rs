//! Taming Bézier curves, one subdivision at a time
//!
//! Font outlines are curves, triangulators want polylines. We split each
//! curve in half with de Casteljau's construction until its control points
//! hug the chord closely enough, then emit the chord.
//!
//! The test is error-bounded: a curve lies inside the convex hull of its
//! control points, so once every control point is within `epsilon` of the
//! chord segment, so is every point on the curve.

use crate::config::FlattenConfig;
use crate::types::Point2;

/// Default flatness tolerance, in output units (pixels after scaling)
pub const DEFAULT_EPSILON: f32 = 0.1;

/// Hard recursion ceiling
///
/// Sixteen halvings leave segments far below a pixel for any real glyph and
/// cap the output at 65536 points per curve for pathological input.
pub const MAX_DEPTH: u32 = 16;

/// Distance from `p` to the segment `a..b`
///
/// Measured against the segment rather than the infinite line so that a
/// control point beyond either endpoint still counts as a deviation.
pub fn chord_distance(p: Point2, a: Point2, b: Point2) -> f32 {
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let wx = p.x - a.x;
    let wy = p.y - a.y;

    let along = vx * wx + vy * wy;
    if along <= 0.0 {
        return p.distance(a);
    }
    let length_sq = vx * vx + vy * vy;
    if length_sq <= along {
        return p.distance(b);
    }
    let t = along / length_sq;
    p.distance(Point2::new(a.x + t * vx, a.y + t * vy))
}

/// Recursive curve flattener with an explicit tolerance and depth ceiling
///
/// ```
/// use glyphmesh_core::curves::Flattener;
/// use glyphmesh_core::types::Point2;
///
/// let flattener = Flattener::new(0.1, 16);
/// let mut points = Vec::new();
/// flattener.quadratic(
///     Point2::new(0.0, 0.0),
///     Point2::new(5.0, 10.0),
///     Point2::new(10.0, 0.0),
///     &mut |p| points.push(p),
/// );
/// assert_eq!(points.last(), Some(&Point2::new(10.0, 0.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flattener {
    epsilon: f32,
    max_depth: u32,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON, MAX_DEPTH)
    }
}

impl Flattener {
    /// Negative or NaN tolerances become zero; depth is clamped to [`MAX_DEPTH`]
    pub fn new(epsilon: f32, max_depth: u32) -> Self {
        let epsilon = if epsilon.is_nan() { 0.0 } else { epsilon.max(0.0) };
        Self {
            epsilon,
            max_depth: max_depth.min(MAX_DEPTH),
        }
    }

    pub fn from_config(config: &FlattenConfig) -> Self {
        Self::new(config.epsilon, config.max_depth)
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Flatten a quadratic curve, emitting every vertex after `p0`
    ///
    /// The last emitted point is always `p2`.
    pub fn quadratic<F>(&self, p0: Point2, p1: Point2, p2: Point2, output: &mut F)
    where
        F: FnMut(Point2),
    {
        self.subdivide_quadratic(p0, p1, p2, output, 0);
    }

    /// Flatten a cubic curve, emitting every vertex after `p0`
    ///
    /// The last emitted point is always `p3`.
    pub fn cubic<F>(&self, p0: Point2, p1: Point2, p2: Point2, p3: Point2, output: &mut F)
    where
        F: FnMut(Point2),
    {
        self.subdivide_cubic(p0, p1, p2, p3, output, 0);
    }

    fn subdivide_quadratic<F>(&self, p0: Point2, p1: Point2, p2: Point2, output: &mut F, depth: u32)
    where
        F: FnMut(Point2),
    {
        if depth >= self.max_depth || chord_distance(p1, p0, p2) <= self.epsilon {
            output(p2);
            return;
        }

        let m01 = p0.midpoint(p1);
        let m12 = p1.midpoint(p2);
        // Point on the curve at t = 0.5
        let m012 = m01.midpoint(m12);

        self.subdivide_quadratic(p0, m01, m012, output, depth + 1);
        self.subdivide_quadratic(m012, m12, p2, output, depth + 1);
    }

    fn subdivide_cubic<F>(
        &self,
        p0: Point2,
        p1: Point2,
        p2: Point2,
        p3: Point2,
        output: &mut F,
        depth: u32,
    ) where
        F: FnMut(Point2),
    {
        if depth >= self.max_depth {
            output(p3);
            return;
        }

        let deviation = chord_distance(p1, p0, p3).max(chord_distance(p2, p0, p3));
        if deviation <= self.epsilon {
            output(p3);
            return;
        }

        let m01 = p0.midpoint(p1);
        let m12 = p1.midpoint(p2);
        let m23 = p2.midpoint(p3);
        let m012 = m01.midpoint(m12);
        let m123 = m12.midpoint(m23);
        let m0123 = m012.midpoint(m123);

        // Each half re-tests its own control points, so only the half that
        // still bends past the tolerance keeps splitting.
        self.subdivide_cubic(p0, m01, m012, m0123, output, depth + 1);
        self.subdivide_cubic(m0123, m123, m23, p3, output, depth + 1);
    }
}
