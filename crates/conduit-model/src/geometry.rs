//! Point and segment geometry in the base length unit

use crate::error::{ConversionError, ConversionResult};
use crate::node::InterchangeNode;
use crate::units::LengthUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Cartesian point (also used as a vector), in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read `x`, `y`, `z` and an optional `units` tag from a node
    ///
    /// Missing coordinates default to zero; the result is in meters.
    pub fn from_node(node: &InterchangeNode) -> ConversionResult<Self> {
        let unit = LengthUnit::from_tag(node.str("units"))
            .map_err(|e| e.with_cause(node.external_id().cloned()))?;
        let coordinate = |name: &str| -> ConversionResult<f64> {
            Ok(unit.to_meters(node.f64(name)?.unwrap_or(0.0)))
        };
        let point = Self::new(coordinate("x")?, coordinate("y")?, coordinate("z")?);
        if !point.is_finite() {
            return Err(ConversionError::invalid_input(format!(
                "{} has non-finite coordinates",
                node.type_tag()
            ))
            .with_cause(node.external_id().cloned()));
        }
        Ok(point)
    }

    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Point at parameter `t` along `self -> other`
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Add for Point3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Parameter of the projection of `p` onto the infinite line `a -> b`
///
/// A degenerate line (`a == b`) projects everything to `0`.
#[must_use]
pub fn line_parameter(p: Point3, a: Point3, b: Point3) -> f64 {
    let dir = b - a;
    let len2 = dir.length_squared();
    if len2 == 0.0 {
        return 0.0;
    }
    (p - a).dot(dir) / len2
}

/// Distance from `p` to the infinite line through `a` and `b`
#[must_use]
pub fn distance_to_line(p: Point3, a: Point3, b: Point3) -> f64 {
    let t = line_parameter(p, a, b);
    p.distance(a.lerp(b, t))
}

/// Distance from `p` to the segment `a..b`, parameter clamped to `[0, 1]`
#[must_use]
pub fn distance_to_segment(p: Point3, a: Point3, b: Point3) -> f64 {
    let t = line_parameter(p, a, b).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

/// Shortest distance from `p` to any segment of a polyline
///
/// A single-point polyline degenerates to point distance; an empty one is
/// infinitely far.
#[must_use]
pub fn distance_to_polyline(p: Point3, polyline: &[Point3]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => p.distance(*only),
        _ => polyline
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn segment_projection_is_clamped() {
        let a = Point3::ORIGIN;
        let b = Point3::new(10.0, 0.0, 0.0);

        assert!((distance_to_segment(Point3::new(5.0, 3.0, 0.0), a, b) - 3.0).abs() < EPS);
        // beyond the end: measured to the endpoint, not the line
        assert!((distance_to_segment(Point3::new(13.0, 4.0, 0.0), a, b) - 5.0).abs() < EPS);
        assert!((distance_to_line(Point3::new(13.0, 4.0, 0.0), a, b) - 4.0).abs() < EPS);
    }

    #[test]
    fn degenerate_segment_is_a_point() {
        let a = Point3::new(1.0, 1.0, 1.0);
        assert!((distance_to_segment(Point3::new(1.0, 1.0, 3.0), a, a) - 2.0).abs() < EPS);
    }

    #[test]
    fn polyline_takes_nearest_segment() {
        let line = [
            Point3::ORIGIN,
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        ];
        assert!((distance_to_polyline(Point3::new(11.0, 5.0, 0.0), &line) - 1.0).abs() < EPS);
        assert!(distance_to_polyline(Point3::ORIGIN, &[]).is_infinite());
    }

    #[test]
    fn from_node_scales_units() {
        let node = InterchangeNode::new("Point")
            .with_property("x", 1500)
            .with_property("y", 250.0)
            .with_property("units", "mm");
        let p = Point3::from_node(&node).unwrap();
        assert!((p.x - 1.5).abs() < EPS);
        assert!((p.y - 0.25).abs() < EPS);
        assert_eq!(p.z, 0.0);
    }
}
