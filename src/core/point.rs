//! Field Point
//!
//! 2D position/vector on the field, in millimetres.
//! Angles are in degrees, counter-clockwise from +X.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use serde::{Deserialize, Serialize};

/// 2D point or vector (mm).
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X component (mm, towards the east goal)
    pub x: f64,
    /// Y component (mm, towards the north touch line)
    pub y: f64,
}

impl Point {
    /// Origin / zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector for an angle in degrees.
    #[inline]
    pub fn from_degrees(angle: f64) -> Self {
        let rad = angle.to_radians();
        Self::new(rad.cos(), rad.sin())
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Squared length (avoids sqrt - prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Length (magnitude).
    #[inline]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Normalize to unit length.
    /// Returns ZERO if length is zero.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (returns scalar z-component).
    /// Positive if other is counter-clockwise from self.
    #[inline]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Bearing from this point towards `other`, degrees in (-180, 180].
    #[inline]
    pub fn angle_to(self, other: Self) -> f64 {
        let delta = other - self;
        delta.y.atan2(delta.x).to_degrees()
    }

    /// Rotate around the origin by `angle` degrees.
    #[inline]
    pub fn rotate(self, angle: f64) -> Self {
        let (sin, cos) = angle.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotate around `pivot` by `angle` degrees.
    #[inline]
    pub fn rotate_around(self, pivot: Self, angle: f64) -> Self {
        (self - pivot).rotate(angle) + pivot
    }

    /// Linear interpolation. t = 0 returns self, t = 1 returns other.
    #[inline]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self).scale(t)
    }

    /// Point `distance` mm away from self in direction `angle` degrees.
    #[inline]
    pub fn project(self, angle: f64, distance: f64) -> Self {
        self + Self::from_degrees(angle).scale(distance)
    }

    /// Approximate equality within `epsilon` mm per axis.
    #[inline]
    pub fn approx_eq(self, other: Self, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Neg for Point {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({:.1}, {:.1})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 2.0);
        assert_eq!(a + b, Point::new(4.0, 6.0));
        assert_eq!(a - b, Point::new(2.0, 2.0));
        assert_eq!(-b, Point::new(-1.0, -2.0));
        assert_eq!(b * 2.0, Point::new(2.0, 4.0));
    }

    #[test]
    fn test_point_length_and_distance() {
        let v = Point::new(3.0, 4.0);
        assert_eq!(v.length_squared(), 25.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(Point::ZERO.distance(v), 5.0);
    }

    #[test]
    fn test_point_normalize() {
        let n = Point::new(3.0, 4.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert_eq!(Point::ZERO.normalize(), Point::ZERO);
    }

    #[test]
    fn test_point_dot_cross() {
        let a = Point::new(2.0, 3.0);
        let b = Point::new(4.0, 5.0);
        assert_eq!(a.dot(b), 23.0);
        assert_eq!(Point::new(1.0, 0.0).cross(Point::new(0.0, 1.0)), 1.0);
    }

    #[test]
    fn test_angle_to() {
        let origin = Point::ZERO;
        assert!((origin.angle_to(Point::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((origin.angle_to(Point::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((origin.angle_to(Point::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((origin.angle_to(Point::new(0.0, -1.0)) + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_and_project() {
        let r = Point::new(1000.0, 0.0).rotate(90.0);
        assert!(r.approx_eq(Point::new(0.0, 1000.0), 1e-9));

        let around = Point::new(2.0, 1.0).rotate_around(Point::new(1.0, 1.0), 180.0);
        assert!(around.approx_eq(Point::new(0.0, 1.0), 1e-9));

        let p = Point::new(100.0, 100.0).project(0.0, 50.0);
        assert!(p.approx_eq(Point::new(150.0, 100.0), 1e-9));
    }

    #[test]
    fn test_lerp() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, -10.0);
        assert_eq!(a.lerp(b, 0.5), Point::new(5.0, -5.0));
    }
}
