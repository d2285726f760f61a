//! Linear algebra primitives: 2D vector, 2x2 matrix and 1D interval.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//----------------------------------------------------------------------------------
// Vec2
//----------------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);
    pub const X: Vec2 = Vec2::new(1.0, 0.0);
    pub const Y: Vec2 = Vec2::new(0.0, 1.0);

    #[inline(always)]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    #[inline(always)]
    pub const fn dot(self, other: Vec2) -> f32 {
        self.x*other.x + self.y*other.y
    }

    /// Scalar (z component of the) cross product of two vectors
    #[inline(always)]
    pub const fn cross(self, other: Vec2) -> f32 {
        self.x*other.y - self.y*other.x
    }

    /// Cross product of a scalar (z axis) with this vector, `w × r`
    ///
    /// This is the tangential velocity of a point at offset `self` on a body spinning at `w`.
    #[inline(always)]
    pub const fn scalar_cross(w: f32, v: Vec2) -> Vec2 {
        Vec2 { x: -w*v.y, y: w*v.x }
    }

    /// Rotated a quarter turn counter-clockwise
    #[inline(always)]
    pub const fn perp(self) -> Vec2 {
        Vec2 { x: -self.y, y: self.x }
    }

    #[inline(always)]
    pub const fn length_sqr(self) -> f32 {
        self.dot(self)
    }

    #[inline(always)]
    pub fn length(self) -> f32 {
        self.length_sqr().sqrt()
    }

    #[inline(always)]
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a zero-length (or non-finite) vector
    pub fn try_normalize(self) -> Option<Vec2> {
        let length = self.length();
        if length > 0.0 && length.is_finite() {
            Some(self/length)
        } else {
            None
        }
    }

    /// Unit vector in the same direction; a zero vector is returned unchanged
    pub fn normalize_or_zero(self) -> Vec2 {
        self.try_normalize().unwrap_or(Vec2::ZERO)
    }

    #[inline(always)]
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self)*t
    }

    #[inline(always)]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Neg for Vec2 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self { x: -self.x, y: -self.y }
    }
}

impl Add for Vec2 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self::Output {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl AddAssign for Vec2 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self::Output {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl SubAssign for Vec2 {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: f32) -> Self::Output {
        Self { x: self.x*rhs, y: self.y*rhs }
    }
}

impl Mul<Vec2> for f32 {
    type Output = Vec2;
    #[inline(always)]
    fn mul(self, rhs: Vec2) -> Self::Output {
        rhs*self
    }
}

impl MulAssign<f32> for Vec2 {
    #[inline(always)]
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: f32) -> Self::Output {
        Self { x: self.x/rhs, y: self.y/rhs }
    }
}

#[cfg(feature = "raylib")]
impl From<raylib::prelude::Vector2> for Vec2 {
    fn from(v: raylib::prelude::Vector2) -> Self {
        Vec2 { x: v.x, y: v.y }
    }
}

#[cfg(feature = "raylib")]
impl From<Vec2> for raylib::prelude::Vector2 {
    fn from(v: Vec2) -> Self {
        raylib::prelude::Vector2 { x: v.x, y: v.y }
    }
}

//----------------------------------------------------------------------------------
// Mat2
//----------------------------------------------------------------------------------
/// Row-major 2x2 matrix, used both for rotations and for effective inverse-mass tensors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat2 {
    pub m00: f32,
    pub m01: f32,
    pub m10: f32,
    pub m11: f32,
}

impl Mat2 {
    pub const ZERO: Mat2 = Mat2 { m00: 0.0, m01: 0.0, m10: 0.0, m11: 0.0 };

    #[inline(always)]
    pub const fn new(m00: f32, m01: f32, m10: f32, m11: f32) -> Self {
        Mat2 { m00, m01, m10, m11 }
    }

    /// Diagonal matrix with `value` on both diagonal entries
    #[inline(always)]
    pub const fn diagonal(value: f32) -> Self {
        Mat2 { m00: value, m01: 0.0, m10: 0.0, m11: value }
    }

    /// Rotation matrix for an angle in radians
    pub fn rotation(radians: f32) -> Mat2 {
        let (s, c) = radians.sin_cos();

        Mat2 {
            m00: c,
            m01: -s,
            m10: s,
            m11: c,
        }
    }

    #[inline(always)]
    pub const fn transpose(&self) -> Mat2 {
        Mat2 {
            m00: self.m00,
            m01: self.m10,
            m10: self.m01,
            m11: self.m11,
        }
    }

    #[inline(always)]
    pub const fn determinant(&self) -> f32 {
        self.m00*self.m11 - self.m01*self.m10
    }

    /// Inverse matrix, or `None` when singular
    pub fn inverse(&self) -> Option<Mat2> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let inv_det = 1.0/det;
        Some(Mat2 {
            m00: self.m11*inv_det,
            m01: -self.m01*inv_det,
            m10: -self.m10*inv_det,
            m11: self.m00*inv_det,
        })
    }

    /// Quadratic form `vᵀ·M·v`
    #[inline(always)]
    pub fn quadratic_form(&self, v: Vec2) -> f32 {
        v.dot(*self*v)
    }
}

impl Add for Mat2 {
    type Output = Mat2;
    #[inline(always)]
    fn add(self, rhs: Mat2) -> Mat2 {
        Mat2 {
            m00: self.m00 + rhs.m00,
            m01: self.m01 + rhs.m01,
            m10: self.m10 + rhs.m10,
            m11: self.m11 + rhs.m11,
        }
    }
}

impl Mul<Vec2> for Mat2 {
    type Output = Vec2;
    #[inline(always)]
    fn mul(self, v: Vec2) -> Vec2 {
        Vec2 {
            x: self.m00*v.x + self.m01*v.y,
            y: self.m10*v.x + self.m11*v.y,
        }
    }
}

impl Mul<f32> for Mat2 {
    type Output = Mat2;
    #[inline(always)]
    fn mul(self, s: f32) -> Mat2 {
        Mat2 {
            m00: self.m00*s,
            m01: self.m01*s,
            m10: self.m10*s,
            m11: self.m11*s,
        }
    }
}

//----------------------------------------------------------------------------------
// Interval
//----------------------------------------------------------------------------------
/// Closed range `[min, max]` on the real line; either end may be infinite
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub const UNBOUNDED: Interval = Interval { min: f32::NEG_INFINITY, max: f32::INFINITY };
    /// `[0, +∞)`, the range of a push-only impulse
    pub const NON_NEGATIVE: Interval = Interval { min: 0.0, max: f32::INFINITY };

    /// Interval between two values, in whichever order they are given
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Interval { min: a, max: b }
        } else {
            Interval { min: b, max: a }
        }
    }

    /// `[-bound, +bound]`
    pub fn symmetric(bound: f32) -> Self {
        Interval::new(-bound, bound)
    }

    /// Degenerate interval holding a single value
    pub const fn point(value: f32) -> Self {
        Interval { min: value, max: value }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.max - self.min
    }

    /// Point at fraction `t` along the interval (`t = 0` is `min`, `t = 1` is `max`)
    #[inline]
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min)*t
    }

    /// Scales both ends, e.g. turning a force bound into an impulse bound for a step
    pub fn scaled(&self, factor: f32) -> Interval {
        Interval::new(self.min*factor, self.max*factor)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::UNBOUNDED
    }
}
