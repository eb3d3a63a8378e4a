use crate::dynamics::BodyHandle;
use crate::geometry::Material;
use crate::math::Vec3;

/// A candidate contact produced by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Deepest point of A inside B, in world space
    pub point_a: Vec3,
    /// Deepest point of B inside A, in world space
    pub point_b: Vec3,
    /// Interpenetration depth (positive when overlapping)
    pub depth: f32,
}

impl ContactPoint {
    pub fn new(point_a: Vec3, point_b: Vec3, depth: f32) -> Self {
        Self { point_a, point_b, depth }
    }

    /// Returns the midpoint of the contact
    #[inline]
    pub fn midpoint(&self) -> Vec3 {
        (self.point_a + self.point_b) * 0.5
    }

    /// Same contact seen from the other body
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            depth: self.depth,
        }
    }
}

/// Contact between two shapes, before it is attached to bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPatch {
    /// Unit normal pointing from B towards A
    pub normal: Vec3,
    /// Up to [`MAX_CONTACT_POINTS`](crate::math::consts::MAX_CONTACT_POINTS) points
    pub points: Vec<ContactPoint>,
    /// Mixed material of the two shapes
    pub material: Material,
    /// Shape indices within bodies A and B
    pub shapes: (usize, usize),
}

impl ContactPatch {
    pub fn new(normal: Vec3, material: Material) -> Self {
        Self {
            normal,
            points: Vec::with_capacity(crate::math::consts::MAX_CONTACT_POINTS),
            material,
            shapes: (0, 0),
        }
    }

    /// Records which shapes of the two bodies produced the patch
    #[inline]
    pub fn with_shapes(mut self, shape_a: usize, shape_b: usize) -> Self {
        self.shapes = (shape_a, shape_b);
        self
    }

    #[inline]
    pub fn push(&mut self, point_a: Vec3, point_b: Vec3, depth: f32) {
        self.points.push(ContactPoint::new(point_a, point_b, depth));
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Swaps the roles of A and B
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self.shapes = (self.shapes.1, self.shapes.0);
        for p in &mut self.points {
            *p = p.flipped();
        }
        self
    }

    /// Deepest candidate depth, zero for an empty patch
    pub fn max_depth(&self) -> f32 {
        self.points.iter().map(|p| p.depth).fold(0.0, f32::max)
    }
}

/// Solver state of one point in a manifold.
///
/// Offsets are measured from the body positions at the time the manifold
/// was built; `rn_*` and `rb_*` are the offsets crossed with the normal and
/// the friction binormal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManifoldPoint {
    pub r_a: Vec3,
    pub r_b: Vec3,
    pub rn_a: Vec3,
    pub rn_b: Vec3,
    pub rb_a: Vec3,
    pub rb_b: Vec3,
    /// Friction direction in the contact plane
    pub binormal: Vec3,
    /// Raw interpenetration depth
    pub depth: f32,
    /// Velocity bias from the error reduction of the velocity pass
    pub bias_velocity: f32,
    /// Pseudo-velocity bias of the split-impulse pass
    pub bias_position: f32,
    /// Separation speed requested by restitution
    pub restitution_target: f32,
    /// Accumulated normal impulse
    pub normal_impulse: f32,
    /// Accumulated friction impulse along `binormal`
    pub friction_impulse: f32,
    /// Accumulated split impulse
    pub pseudo_impulse: f32,
    pub k_normal: f32,
    pub k_binormal: f32,
    pub k_pseudo: f32,
}

impl ManifoldPoint {
    /// Swaps the body sides, keeping impulse magnitudes valid for the
    /// negated normal and binormal.
    fn swap_sides(&mut self) {
        std::mem::swap(&mut self.r_a, &mut self.r_b);
        std::mem::swap(&mut self.rn_a, &mut self.rn_b);
        std::mem::swap(&mut self.rb_a, &mut self.rb_b);
        self.rn_a = -self.rn_a;
        self.rn_b = -self.rn_b;
        self.rb_a = -self.rb_a;
        self.rb_b = -self.rb_b;
        self.binormal = -self.binormal;
    }

    /// Drops warm-start state
    pub(crate) fn reset_impulses(&mut self) {
        self.normal_impulse = 0.0;
        self.friction_impulse = 0.0;
        self.pseudo_impulse = 0.0;
    }
}

/// Contact points shared by one pair of bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Index of the touching shape in body A
    pub shape_a: usize,
    pub shape_b: usize,
    /// Unit normal pointing from B towards A
    pub normal: Vec3,
    /// Mixed restitution
    pub restitution: f32,
    /// Mixed friction coefficient
    pub friction: f32,
    /// False when B is static and drops out of every row
    pub dynamic_b: bool,
    /// Set once shock propagation has placed the manifold in a layer
    pub(crate) solved: bool,
    pub points: Vec<ManifoldPoint>,
}

impl ContactManifold {
    /// Creates a new empty contact manifold
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, normal: Vec3, material: Material, dynamic_b: bool) -> Self {
        Self {
            body_a,
            body_b,
            shape_a: 0,
            shape_b: 0,
            normal,
            restitution: material.e(),
            friction: material.mu(),
            dynamic_b,
            solved: false,
            points: Vec::with_capacity(crate::math::consts::MAX_CONTACT_POINTS),
        }
    }

    /// Returns the number of contact points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifoldPoint> {
        self.points.iter()
    }

    /// Raw depth of point `i`
    pub fn point_depth(&self, i: usize) -> Option<f32> {
        self.points.get(i).map(|p| p.depth)
    }

    /// Deepest point of the manifold
    pub fn max_depth(&self) -> f32 {
        self.points.iter().map(|p| p.depth).fold(0.0, f32::max)
    }

    /// World position of point `i` on body A, given A's current position
    pub fn point_a(&self, i: usize, position_a: Vec3) -> Option<Vec3> {
        self.points.get(i).map(|p| p.r_a + position_a)
    }

    /// World position of point `i` on body B, given B's current position
    pub fn point_b(&self, i: usize, position_b: Vec3) -> Option<Vec3> {
        self.points.get(i).map(|p| p.r_b + position_b)
    }

    /// Returns true if the manifold joins `handle` to another body
    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.body_a == handle || self.body_b == handle
    }

    /// Exchanges bodies A and B and negates every normal-derived quantity.
    pub fn swap_bodies(&mut self) {
        std::mem::swap(&mut self.body_a, &mut self.body_b);
        std::mem::swap(&mut self.shape_a, &mut self.shape_b);
        self.normal = -self.normal;
        for p in &mut self.points {
            p.swap_sides();
        }
    }
}
