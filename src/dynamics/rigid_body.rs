use std::rc::Rc;

use crate::collision::broad_phase::BoundsTree;
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, Shape};
use crate::math::{consts::EPSILON, RotationBasis, Vec3};

use super::collision_group::{modify_group, new_shared_group, CollisionGroup, SharedCollisionGroup};

/// Default mass of a new body
pub const DEFAULT_MASS: f32 = 1.0;
/// Default (isotropic) inertia of a new body
pub const DEFAULT_INERTIA: f32 = 1.0;

/// A handle to a body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    /// Invalid/null body handle
    pub const INVALID: Self = Self(u32::MAX);

    /// Creates a new body handle
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the index of this handle
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true if this handle is valid
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A rigid body: pose, velocities, mass properties and the shapes it owns.
///
/// A body is static when its inverse mass is zero. Besides the real velocity
/// it carries a pseudo velocity used only to push overlapping bodies apart;
/// both are integrated into the position and the pseudo part is then cleared.
#[derive(Debug)]
pub struct Body {
    handle: BodyHandle,
    enabled: bool,

    position: Vec3,
    rotation: RotationBasis,

    velocity: Vec3,
    angular_velocity: Vec3,
    pseudo_velocity: Vec3,
    pseudo_angular_velocity: Vec3,

    inv_mass: f32,
    /// Diagonal of the body-space inverse inertia
    inv_inertia: Vec3,
    /// Recompute the inertia whenever the shape set changes
    inertia_from_shapes: bool,

    shapes: Vec<Shape>,
    bounds_tree: BoundsTree,

    default_group: SharedCollisionGroup,
    current_group: SharedCollisionGroup,
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies pose, velocities, mass and shapes. The copy starts in a fresh
/// collision group and is not registered in any world.
impl Clone for Body {
    fn clone(&self) -> Self {
        let group = new_shared_group();
        Self {
            handle: BodyHandle::INVALID,
            enabled: self.enabled,
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
            pseudo_velocity: self.pseudo_velocity,
            pseudo_angular_velocity: self.pseudo_angular_velocity,
            inv_mass: self.inv_mass,
            inv_inertia: self.inv_inertia,
            inertia_from_shapes: self.inertia_from_shapes,
            shapes: self.shapes.clone(),
            bounds_tree: self.bounds_tree.clone(),
            current_group: Rc::clone(&group),
            default_group: group,
        }
    }
}

impl Body {
    /// Creates a dynamic body at the origin with unit mass and inertia
    pub fn new() -> Self {
        let group = new_shared_group();
        Self {
            handle: BodyHandle::INVALID,
            enabled: true,
            position: Vec3::ZERO,
            rotation: RotationBasis::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            pseudo_velocity: Vec3::ZERO,
            pseudo_angular_velocity: Vec3::ZERO,
            inv_mass: 1.0 / DEFAULT_MASS,
            inv_inertia: Vec3::splat(1.0 / DEFAULT_INERTIA),
            inertia_from_shapes: false,
            shapes: Vec::new(),
            bounds_tree: BoundsTree::default(),
            current_group: Rc::clone(&group),
            default_group: group,
        }
    }

    /// Handle assigned by the world, [`BodyHandle::INVALID`] when unregistered
    #[inline]
    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.handle.index()
    }

    pub(crate) fn set_handle(&mut self, handle: BodyHandle) {
        self.handle = handle;
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the body and refreshes its shapes.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.refresh_shapes();
    }

    #[inline]
    pub fn rotation(&self) -> &RotationBasis {
        &self.rotation
    }

    /// Replaces the orientation and refreshes the shapes.
    pub fn set_rotation(&mut self, rotation: RotationBasis) {
        self.rotation = rotation;
        self.refresh_shapes();
    }

    /// Orientation from Euler angles in degrees
    pub fn set_rotation_euler(&mut self, degrees: Vec3) {
        self.set_rotation(RotationBasis::from_euler_degrees(degrees));
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    #[inline]
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.angular_velocity = angular_velocity;
    }

    /// Position-correction velocity accumulated during the current step
    #[inline]
    pub fn pseudo_velocity(&self) -> Vec3 {
        self.pseudo_velocity
    }

    #[inline]
    pub fn pseudo_angular_velocity(&self) -> Vec3 {
        self.pseudo_angular_velocity
    }

    /// Returns the mass, infinity for static bodies
    pub fn mass(&self) -> f32 {
        if self.inv_mass > 0.0 {
            1.0 / self.inv_mass
        } else {
            f32::INFINITY
        }
    }

    /// Sets the mass; anything not above the engine epsilon makes the body static.
    pub fn set_mass(&mut self, mass: f32) {
        self.inv_mass = if mass > EPSILON { 1.0 / mass } else { 0.0 };
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Diagonal of the body-space inertia, infinite on locked axes
    pub fn inertia(&self) -> Vec3 {
        let invert = |i: f32| if i > 0.0 { 1.0 / i } else { f32::INFINITY };
        Vec3::new(invert(self.inv_inertia.x), invert(self.inv_inertia.y), invert(self.inv_inertia.z))
    }

    /// Isotropic inertia; values not above the engine epsilon lock rotation.
    pub fn set_inertia(&mut self, inertia: f32) {
        self.set_inertia_diagonal(Vec3::splat(inertia));
    }

    /// Per-axis body-space inertia.
    pub fn set_inertia_diagonal(&mut self, inertia: Vec3) {
        let invert = |i: f32| if i > EPSILON { 1.0 / i } else { 0.0 };
        self.inv_inertia = Vec3::new(invert(inertia.x), invert(inertia.y), invert(inertia.z));
    }

    /// Diagonal of the body-space inverse inertia
    #[inline]
    pub fn inv_inertia(&self) -> Vec3 {
        self.inv_inertia
    }

    /// Applies the world-space inverse inertia tensor to `v`.
    #[inline]
    pub fn inv_inertia_world(&self, v: Vec3) -> Vec3 {
        self.rotation
            .to_world(self.inv_inertia.component_mul(self.rotation.to_local(v)))
    }

    /// Approximates the inertia by the solid box spanning every shape.
    ///
    /// The result is scaled by the current inverse mass, so set the mass first.
    /// A body without shapes keeps its inertia.
    pub fn calculate_local_inertia(&mut self) {
        let mut bounds = Aabb::EMPTY;
        for shape in &self.shapes {
            bounds.merge(shape.local_bounds());
        }
        if bounds.is_empty() {
            return;
        }

        let d = bounds.size();
        let (x2, y2, z2) = (d.x * d.x, d.y * d.y, d.z * d.z);
        let axis = |sum: f32| if sum > EPSILON { 12.0 / sum } else { 0.0 };
        self.inv_inertia = Vec3::new(axis(y2 + z2), axis(x2 + z2), axis(x2 + y2)) * self.inv_mass;
    }

    /// True when the inverse mass is zero
    #[inline]
    pub fn is_static(&self) -> bool {
        self.inv_mass <= 0.0
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabled bodies neither move nor collide.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Adds `n * inv_mass * impulse` to the velocity.
    #[inline]
    pub fn apply_linear_impulse(&mut self, n: Vec3, impulse: f32) {
        self.velocity += n * (self.inv_mass * impulse);
    }

    /// Adds the angular response to `impulse` along the lever `rn = r × n`.
    #[inline]
    pub fn apply_angular_impulse(&mut self, rn: Vec3, impulse: f32) {
        self.angular_velocity += self.inv_inertia_world(rn) * impulse;
    }

    /// Applies `impulse` along `n` at the world `point`.
    pub fn apply_impulse_at(&mut self, impulse: f32, n: Vec3, point: Vec3) {
        self.apply_linear_impulse(n, impulse);
        self.apply_angular_impulse((point - self.position).cross(n), impulse);
    }

    /// Pseudo impulses skip the inverse mass on the linear part.
    #[inline]
    pub fn apply_linear_pseudo_impulse(&mut self, n: Vec3, impulse: f32) {
        self.pseudo_velocity += n * impulse;
    }

    #[inline]
    pub fn apply_angular_pseudo_impulse(&mut self, rn: Vec3, impulse: f32) {
        self.pseudo_angular_velocity += self.inv_inertia_world(rn) * impulse;
    }

    /// Velocity of the material point at world offset `r` from the center
    #[inline]
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(r)
    }

    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    #[inline]
    pub fn shape(&self, index: usize) -> Option<&Shape> {
        self.shapes.get(index)
    }

    /// Takes ownership of `shape` and rebuilds the bounds tree. Returns the
    /// shape index.
    pub fn add_shape(&mut self, mut shape: Shape) -> usize {
        shape.update(self.position, &self.rotation);
        self.shapes.push(shape);
        self.shapes_changed();
        self.shapes.len() - 1
    }

    /// Detaches shape `index`; later shapes shift down by one.
    pub fn remove_shape(&mut self, index: usize) -> Result<Shape> {
        if index >= self.shapes.len() {
            return Err(PhysicsError::ShapeNotFound {
                body: self.index(),
                shape: index,
            });
        }
        let shape = self.shapes.remove(index);
        self.shapes_changed();
        Ok(shape)
    }

    #[inline]
    pub fn bounds_tree(&self) -> &BoundsTree {
        &self.bounds_tree
    }

    /// Recomputes world-space shape data from the pose and refits the tree.
    pub fn refresh_shapes(&mut self) {
        for shape in &mut self.shapes {
            shape.update(self.position, &self.rotation);
        }
        let shapes = &self.shapes;
        self.bounds_tree.update(|i| shapes[i].bounds());
    }

    fn shapes_changed(&mut self) {
        let bounds: Vec<Aabb> = self.shapes.iter().map(Shape::bounds).collect();
        self.bounds_tree = BoundsTree::build(&bounds);
        if self.inertia_from_shapes {
            self.calculate_local_inertia();
        }
    }

    /// The group this body owns
    #[inline]
    pub fn default_collision_group(&self) -> CollisionGroup {
        self.default_group.get()
    }

    /// The group this body currently belongs to, possibly another body's
    #[inline]
    pub fn current_collision_group(&self) -> &SharedCollisionGroup {
        &self.current_group
    }

    /// True when both bodies currently point at the same group
    #[inline]
    pub fn shares_collision_group(&self, other: &Body) -> bool {
        Rc::ptr_eq(&self.current_group, &other.current_group)
    }

    /// False once the body's current group has gone to sleep
    #[inline]
    pub fn non_sleeping(&self) -> bool {
        self.current_group.get().non_sleep
    }

    /// Dynamic body whose group is asleep
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.is_dynamic() && !self.non_sleeping()
    }

    /// Wakes the body's own group and restarts its still counter.
    pub fn wake_up(&mut self) {
        modify_group(&self.default_group, |g| {
            g.non_sleep = true;
            g.time_without_movement = 0;
        });
        self.current_group = Rc::clone(&self.default_group);
    }

    /// Joins the groups of two bodies: the lower index adopts the higher
    /// index body's current group.
    pub fn merge_collision_group(&mut self, other: &mut Body) {
        if self.index() > other.index() {
            other.current_group = Rc::clone(&self.current_group);
        } else {
            self.current_group = Rc::clone(&other.current_group);
        }
    }

    /// Like [`Body::merge_collision_group`], and also marks this body's own
    /// group as awake.
    pub fn merge_collision_group_and_awake(&mut self, other: &mut Body) {
        self.merge_collision_group(other);
        modify_group(&self.default_group, |g| g.non_sleep = true);
    }

    /// First sleep pass: counts still steps and syncs the counter with the
    /// current group, both taking the smaller value.
    pub(crate) fn track_stillness(&mut self, sleep_velocity: f32, sleep_angular_velocity: f32) {
        if !self.default_group.get().non_sleep {
            return;
        }
        if self.velocity.in_bound(sleep_velocity) && self.angular_velocity.in_bound(sleep_angular_velocity) {
            // The two handles may alias, so bump first and read back.
            modify_group(&self.default_group, |g| g.time_without_movement += 1);
            let time = self
                .default_group
                .get()
                .time_without_movement
                .min(self.current_group.get().time_without_movement);
            modify_group(&self.default_group, |g| g.time_without_movement = time);
            modify_group(&self.current_group, |g| g.time_without_movement = time);
        } else {
            modify_group(&self.default_group, |g| g.time_without_movement = 0);
            modify_group(&self.current_group, |g| g.time_without_movement = 0);
        }
    }

    /// Second sleep pass: adopts the group counter and returns whether the
    /// body should still be integrated this step.
    ///
    /// A body still for `sleep_time` steps falls back to its own group and
    /// stops being awake.
    pub(crate) fn settle_sleep_state(&mut self, sleep_time: u32) -> bool {
        let time = self.current_group.get().time_without_movement;
        modify_group(&self.default_group, |g| g.time_without_movement = time);
        if time < sleep_time {
            modify_group(&self.default_group, |g| g.non_sleep = true);
            true
        } else {
            self.current_group = Rc::clone(&self.default_group);
            modify_group(&self.default_group, |g| g.non_sleep = false);
            false
        }
    }

    /// Points the current group back at the body's own group.
    pub(crate) fn reset_collision_group(&mut self) {
        self.current_group = Rc::clone(&self.default_group);
    }

    /// Split borrow of the integrated state
    pub(crate) fn motion_mut(&mut self) -> MotionStateMut<'_> {
        MotionStateMut {
            position: &mut self.position,
            rotation: &mut self.rotation,
            velocity: &mut self.velocity,
            angular_velocity: &mut self.angular_velocity,
            pseudo_velocity: &mut self.pseudo_velocity,
            pseudo_angular_velocity: &mut self.pseudo_angular_velocity,
        }
    }
}

/// Borrows two distinct bodies of a slice mutably.
pub(crate) fn get_two_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    assert!(a != b, "a body cannot be paired with itself");
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Mutable view over the parts of a body the integrator advances
pub(crate) struct MotionStateMut<'a> {
    pub position: &'a mut Vec3,
    pub rotation: &'a mut RotationBasis,
    pub velocity: &'a mut Vec3,
    pub angular_velocity: &'a mut Vec3,
    pub pseudo_velocity: &'a mut Vec3,
    pub pseudo_angular_velocity: &'a mut Vec3,
}

/// Description for creating a body
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: RotationBasis,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Zero makes the body static
    pub mass: f32,
    /// `None` keeps the isotropic default
    pub inertia: Option<Vec3>,
    /// Derive the inertia from the attached shapes once they are known
    pub inertia_from_shapes: bool,
    pub enabled: bool,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: RotationBasis::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: DEFAULT_MASS,
            inertia: None,
            inertia_from_shapes: false,
            enabled: true,
        }
    }
}

impl BodyDesc {
    /// Creates a new dynamic body description
    pub fn dynamic() -> Self {
        Self::default()
    }

    /// Creates a new static body description
    pub fn fixed() -> Self {
        Self {
            mass: 0.0,
            inertia: Some(Vec3::ZERO),
            ..Self::default()
        }
    }

    /// Sets the position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation
    pub fn with_rotation(mut self, rotation: RotationBasis) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the rotation from Euler angles in degrees
    pub fn with_rotation_euler(mut self, degrees: Vec3) -> Self {
        self.rotation = RotationBasis::from_euler_degrees(degrees);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Sets the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Sets an isotropic inertia
    pub fn with_inertia(mut self, inertia: f32) -> Self {
        self.inertia = Some(Vec3::splat(inertia));
        self
    }

    /// Computes the inertia from the shapes every time one is attached
    pub fn with_inertia_from_shapes(mut self) -> Self {
        self.inertia_from_shapes = true;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds an unregistered body from this description
    pub fn build(&self) -> Body {
        let mut body = Body::new();
        body.position = self.position;
        body.rotation = self.rotation;
        body.velocity = self.velocity;
        body.angular_velocity = self.angular_velocity;
        body.enabled = self.enabled;
        body.inertia_from_shapes = self.inertia_from_shapes;
        body.set_mass(self.mass);
        match self.inertia {
            Some(inertia) => body.set_inertia_diagonal(inertia),
            None if body.is_static() => body.set_inertia(0.0),
            None => {}
        }
        body
    }
}
