//! 3D Vector
//!
//! World-space vector used for positions, velocities, angles and zone corners.
//! Components follow the host engine's convention: Z is up, yaw is
//! measured counter-clockwise in degrees.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// 3D vector with `f32` components.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component (up)
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Unit vector pointing up (+Z)
    pub const UP: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Scale every component.
    #[inline]
    pub fn scale(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    /// Squared length (avoids sqrt - prefer this for comparisons).
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Length (magnitude). Prefer `length_squared` when possible.
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Horizontal (XY plane) length.
    #[inline]
    pub fn length_2d(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Midpoint between two points.
    #[inline]
    pub fn midpoint(self, other: Self) -> Self {
        (self + other).scale(0.5)
    }
}

// Operator overloads for ergonomics
impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        self.scale(rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_arithmetic() {
        let a = Vec3::new(3.0, 4.0, 5.0);
        let b = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(a + b, Vec3::new(4.0, 6.0, 8.0));
        assert_eq!(a - b, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(b * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(a / 2.0, Vec3::new(1.5, 2.0, 2.5));
        assert_eq!(-b, Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_vec3_length() {
        // 3-4-5 triangle in the horizontal plane
        let v = Vec3::new(3.0, 4.0, 12.0);
        assert_eq!(v.length_2d(), 5.0);
        assert_eq!(v.length_squared(), 169.0);
        assert_eq!(v.length(), 13.0);
    }

    #[test]
    fn test_vec3_min_max_midpoint() {
        let a = Vec3::new(-1.0, 5.0, 2.0);
        let b = Vec3::new(3.0, -5.0, 2.0);
        assert_eq!(a.min(b), Vec3::new(-1.0, -5.0, 2.0));
        assert_eq!(a.max(b), Vec3::new(3.0, 5.0, 2.0));
        assert_eq!(a.midpoint(b), Vec3::new(1.0, 0.0, 2.0));
    }
}
