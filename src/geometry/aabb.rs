use crate::math::Vec3;

/// An axis-aligned bounding box defined by minimum and maximum corners.
///
/// [`Aabb::EMPTY`] is inverted (`min = +∞`, `max = −∞`) so that growing it with
/// points or other boxes yields their bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (smallest x, y, z values)
    pub min: Vec3,
    /// Maximum corner (largest x, y, z values)
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An empty AABB that contains no points
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates an AABB from minimum and maximum points
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &point in points {
            aabb.include_point(point);
        }
        aabb
    }

    /// Resets to the empty box.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the full size (extents) of the AABB
    #[inline]
    pub fn size(self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if this AABB is empty
    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Componentwise overlap test; touching boxes overlap.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grows this box to cover `other`.
    #[inline]
    pub fn merge(&mut self, other: Self) {
        self.min.min_axis(other.min);
        self.max.max_axis(other.max);
    }

    /// Grows this box to cover `point`.
    #[inline]
    pub fn include_point(&mut self, point: Vec3) {
        self.min.min_axis(point);
        self.max.max_axis(point);
    }

    /// Returns the union of two AABBs
    #[inline]
    pub fn union(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }

    /// Returns a copy expanded by `margin` on every side
    #[inline]
    pub fn expand(self, margin: f32) -> Self {
        Self::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// Index of the axis with the largest extent (0 = X, 1 = Y, 2 = Z)
    #[inline]
    pub fn longest_axis(self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grows_to_points() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.include_point(Vec3::new(1.0, -1.0, 2.0));
        aabb.include_point(Vec3::new(-3.0, 4.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-3.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 2.0));
        assert_eq!(aabb.longest_axis(), 1);
    }

    #[test]
    fn test_intersects_touching() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Vec3::new(1.1, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(b));
        assert!(!a.intersects(c));
    }

    #[test]
    fn test_merge_and_expand() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
        assert_eq!(u.center(), Vec3::ZERO);

        let e = a.expand(0.5);
        assert_eq!(e.size(), Vec3::splat(2.0));
    }
}
