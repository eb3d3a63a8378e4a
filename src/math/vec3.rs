use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use super::consts::EPSILON;

/// A 3D vector with f32 components.
///
/// Positions, velocities, impulses and directions all use this type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Zero vector (0, 0, 0)
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit vector along X axis (1, 0, 0)
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit vector along Y axis (0, 1, 0)
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit vector along Z axis (0, 0, 1)
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// One vector (1, 1, 1)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new Vec3 from components
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a Vec3 with all components set to the same value
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Dot product of two vectors
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product of two vectors
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length of the vector (avoids sqrt)
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length (magnitude) of the vector
    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Returns a unit-length copy, or the zero vector when the length is
    /// below [`EPSILON`].
    #[inline]
    pub fn normalize(self) -> Self {
        let mut v = self;
        v.normalize_len();
        v
    }

    /// Normalizes in place and returns the length the vector had.
    ///
    /// Underflow (length below [`EPSILON`]) zeroes the vector and reports a
    /// length of zero, so callers can detect it and pick a fallback direction.
    #[inline]
    pub fn normalize_len(&mut self) -> f32 {
        let len = self.length();
        if len < EPSILON {
            *self = Self::ZERO;
            return 0.0;
        }
        *self /= len;
        len
    }

    /// Attempts to normalize, returning None if the vector is too small
    #[inline]
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len < EPSILON {
            None
        } else {
            Some(self / len)
        }
    }

    /// Componentwise equality within `±EPSILON`.
    #[inline]
    pub fn equal_eps(self, other: Self) -> bool {
        (self.x - other.x).abs() <= EPSILON
            && (self.y - other.y).abs() <= EPSILON
            && (self.z - other.z).abs() <= EPSILON
    }

    /// Returns true when every component satisfies `|c| < bound`.
    #[inline]
    pub fn in_bound(self, bound: f32) -> bool {
        self.x.abs() < bound && self.y.abs() < bound && self.z.abs() < bound
    }

    /// Returns true when both vectors lie along the same line (either sense).
    pub fn is_colinear(self, other: Self) -> bool {
        let (a, b) = (self.normalize(), other.normalize());
        if a == Self::ZERO || b == Self::ZERO {
            return false;
        }
        (a.dot(b).abs() - 1.0).abs() < EPSILON
    }

    /// Component-wise minimum
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Lowers each component to `other`'s where that one is smaller.
    #[inline]
    pub fn min_axis(&mut self, other: Self) {
        *self = self.min(other);
    }

    /// Raises each component to `other`'s where that one is larger.
    #[inline]
    pub fn max_axis(&mut self, other: Self) {
        *self = self.max(other);
    }

    /// Component-wise absolute value
    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Component-wise multiplication (Hadamard product)
    #[inline]
    pub fn component_mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Index of the component with the largest absolute value
    #[inline]
    pub fn dominant_axis(self) -> usize {
        let a = self.abs();
        if a.x >= a.y && a.x >= a.z {
            0
        } else if a.y >= a.z {
            1
        } else {
            2
        }
    }

    /// Returns the squared distance between two points
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        (other - self).length_squared()
    }

    /// Returns true if any component is NaN or infinite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

macro_rules! impl_vec_binop {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $sym:tt) => {
        impl $Op for Vec3 {
            type Output = Self;

            #[inline]
            fn $op(self, rhs: Self) -> Self {
                Self::new(self.x $sym rhs.x, self.y $sym rhs.y, self.z $sym rhs.z)
            }
        }

        impl $OpAssign for Vec3 {
            #[inline]
            fn $op_assign(&mut self, rhs: Self) {
                *self = *self $sym rhs;
            }
        }
    };
}

impl_vec_binop!(Add, add, AddAssign, add_assign, +);
impl_vec_binop!(Sub, sub, SubAssign, sub_assign, -);

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;

    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl MulAssign<f32> for Vec3 {
    #[inline]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn div(self, s: f32) -> Self {
        self * (1.0 / s)
    }
}

impl DivAssign<f32> for Vec3 {
    #[inline]
    fn div_assign(&mut self, s: f32) {
        *self = *self / s;
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of bounds: {}", index),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index out of bounds: {}", index),
        }
    }
}

impl From<[f32; 3]> for Vec3 {
    #[inline]
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<(f32, f32, f32)> for Vec3 {
    #[inline]
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_cross_product() {
        assert!(Vec3::X.cross(Vec3::Y).equal_eps(Vec3::Z));
        assert!(Vec3::Y.cross(Vec3::X).equal_eps(-Vec3::Z));
    }

    #[test]
    fn test_normalize_len_reports_length() {
        let mut v = Vec3::new(3.0, 4.0, 0.0);
        let len = v.normalize_len();
        assert!(approx_eq(len, 5.0));
        assert!(v.equal_eps(Vec3::new(0.6, 0.8, 0.0)));
    }

    #[test]
    fn test_normalize_len_underflow_zeroes() {
        let mut v = Vec3::new(1e-5, 0.0, -1e-5);
        assert_eq!(v.normalize_len(), 0.0);
        assert_eq!(v, Vec3::ZERO);
        assert!(Vec3::new(1e-5, 0.0, 0.0).try_normalize().is_none());
    }

    #[test]
    fn test_equal_eps_and_in_bound() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        assert!(a.equal_eps(a + Vec3::splat(4e-4)));
        assert!(!a.equal_eps(a + Vec3::new(0.0, 1e-3, 0.0)));

        assert!(Vec3::new(0.05, -0.09, 0.0).in_bound(0.1));
        assert!(!Vec3::new(0.05, -0.1, 0.0).in_bound(0.1));
    }

    #[test]
    fn test_colinear() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_colinear(Vec3::new(-2.0, -4.0, -6.0)));
        assert!(!Vec3::X.is_colinear(Vec3::Y));
        assert!(!Vec3::ZERO.is_colinear(Vec3::X));
    }

    #[test]
    fn test_min_max_axis() {
        let mut lo = Vec3::splat(f32::INFINITY);
        let mut hi = Vec3::splat(f32::NEG_INFINITY);
        for p in [Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 5.0, 0.0)] {
            lo.min_axis(p);
            hi.max_axis(p);
        }
        assert_eq!(lo, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(hi, Vec3::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn test_operators() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::splat(3.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert!((a / 2.0).equal_eps(Vec3::new(0.5, 1.0, 1.5)));
        assert!(approx_eq(a.dot(b), 32.0));
        assert_eq!(Vec3::new(0.1, -3.0, 2.0).dominant_axis(), 1);
    }
}
