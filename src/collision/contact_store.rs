use tracing::trace;

use crate::dynamics::{get_two_mut, Body, BodyHandle};
use crate::math::consts::{CONTACT_MATCH_EPSILON, EPSILON};
use crate::math::Vec3;

use super::contact::{ContactManifold, ContactPatch, ManifoldPoint};

/// Manifolds of the current step plus those of the previous one, kept for
/// warm starting.
///
/// Manifolds are indexed per body so that a new pair only searches the
/// previous manifolds of its first body.
#[derive(Debug, Default)]
pub struct ContactStore {
    manifolds: Vec<ContactManifold>,
    previous: Vec<ContactManifold>,
    body_contacts: Vec<Vec<usize>>,
    prev_body_contacts: Vec<Vec<usize>>,
    erp_velocity: f32,
    erp_position: f32,
    slop: f32,
    used_previous: usize,
    unused_previous: usize,
}

impl ContactStore {
    /// Creates a store with the error reduction factors of both solver passes
    pub fn new(erp_velocity: f32, erp_position: f32, slop: f32) -> Self {
        Self {
            erp_velocity,
            erp_position,
            slop,
            ..Self::default()
        }
    }

    pub(crate) fn set_parameters(&mut self, erp_velocity: f32, erp_position: f32, slop: f32) {
        self.erp_velocity = erp_velocity;
        self.erp_position = erp_position;
        self.slop = slop;
    }

    /// Moves the current manifolds to the previous slot.
    pub fn begin_step(&mut self, num_bodies: usize) {
        std::mem::swap(&mut self.manifolds, &mut self.previous);
        self.manifolds.clear();

        std::mem::swap(&mut self.body_contacts, &mut self.prev_body_contacts);
        for list in &mut self.body_contacts {
            list.clear();
        }
        self.body_contacts.resize_with(num_bodies, Vec::new);

        self.used_previous = 0;
        self.unused_previous = 0;
    }

    /// Forgets every manifold, including the warm-start history.
    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.previous.clear();
        self.body_contacts.clear();
        self.prev_body_contacts.clear();
        self.used_previous = 0;
        self.unused_previous = 0;
    }

    /// Turns a shape contact between bodies `a` and `b` into a manifold.
    ///
    /// A static first body is swapped to the second slot so that body A of
    /// every manifold is dynamic. Impulses found in a matching manifold of
    /// the previous step are copied and applied to the bodies at once.
    ///
    /// Returns the index of the new manifold, `None` for an empty patch.
    pub fn add_patch(&mut self, bodies: &mut [Body], a: usize, b: usize, patch: ContactPatch, inv_dt: f32) -> Option<usize> {
        if patch.is_empty() {
            return None;
        }
        let (a, b, patch) = if bodies[a].is_static() && bodies[b].is_dynamic() {
            (b, a, patch.flipped())
        } else {
            (a, b, patch)
        };

        let (body_a, body_b) = get_two_mut(bodies, a, b);
        let dynamic_b = body_b.is_dynamic();
        if dynamic_b {
            body_a.merge_collision_group_and_awake(body_b);
        }

        let normal = patch.normal;
        let mut manifold = ContactManifold::new(body_a.handle(), body_b.handle(), normal, patch.material, dynamic_b);
        (manifold.shape_a, manifold.shape_b) = patch.shapes;
        for (i, contact) in patch.points.iter().enumerate() {
            let r_a = contact.point_a - body_a.position();
            let r_b = contact.point_b - body_b.position();

            let mut relative = body_a.velocity_at(r_a);
            if dynamic_b {
                relative -= body_b.velocity_at(r_b);
            }
            let binormal = contact_binormal(relative, normal, i);

            let error = (contact.depth - self.slop) * inv_dt;
            manifold.points.push(ManifoldPoint {
                r_a,
                r_b,
                rn_a: r_a.cross(normal),
                rn_b: r_b.cross(normal),
                rb_a: r_a.cross(binormal),
                rb_b: r_b.cross(binormal),
                binormal,
                depth: contact.depth,
                bias_velocity: error * self.erp_velocity,
                bias_position: error * self.erp_position,
                ..ManifoldPoint::default()
            });
        }

        self.warm_start(&mut manifold, a, b, body_a, body_b);

        let index = self.manifolds.len();
        self.manifolds.push(manifold);
        if let Some(list) = self.body_contacts.get_mut(a) {
            list.push(index);
        }
        if let Some(list) = self.body_contacts.get_mut(b) {
            list.push(index);
        }
        Some(index)
    }

    /// Copies impulses from the previous manifold of the same shape pair
    /// and applies them.
    fn warm_start(&mut self, manifold: &mut ContactManifold, a: usize, b: usize, body_a: &mut Body, body_b: &mut Body) {
        let Some(candidates) = self.prev_body_contacts.get(a) else {
            return;
        };
        let shapes = (manifold.shape_a, manifold.shape_b);
        let found = candidates.iter().find_map(|&m| {
            let prev = &self.previous[m];
            if (prev.body_a.index(), prev.body_b.index()) == (a, b) && (prev.shape_a, prev.shape_b) == shapes {
                Some((prev, false))
            } else if (prev.body_a.index(), prev.body_b.index()) == (b, a) && (prev.shape_b, prev.shape_a) == shapes {
                Some((prev, true))
            } else {
                None
            }
        });
        let Some((prev, inverted)) = found else {
            return;
        };

        let normal = manifold.normal;
        let mut matched = 0;
        for point in &mut manifold.points {
            let hit = prev.points.iter().find(|old| {
                let old_r = if inverted { old.r_b } else { old.r_a };
                (point.r_a - old_r).in_bound(CONTACT_MATCH_EPSILON)
            });
            let Some(old) = hit else {
                point.reset_impulses();
                continue;
            };
            matched += 1;

            point.normal_impulse = old.normal_impulse;
            point.friction_impulse = if inverted { -old.friction_impulse } else { old.friction_impulse };
            point.pseudo_impulse = old.pseudo_impulse;

            let linear = normal * point.normal_impulse + point.binormal * point.friction_impulse;
            body_a.apply_linear_impulse(linear, 1.0);
            body_a.apply_angular_impulse(point.rn_a * point.normal_impulse + point.rb_a * point.friction_impulse, 1.0);
            body_a.apply_linear_pseudo_impulse(normal, point.pseudo_impulse);
            body_a.apply_angular_pseudo_impulse(point.rn_a, point.pseudo_impulse);
            if manifold.dynamic_b {
                body_b.apply_linear_impulse(-linear, 1.0);
                body_b.apply_angular_impulse(-(point.rn_b * point.normal_impulse + point.rb_b * point.friction_impulse), 1.0);
                body_b.apply_linear_pseudo_impulse(-normal, point.pseudo_impulse);
                body_b.apply_angular_pseudo_impulse(-point.rn_b, point.pseudo_impulse);
            }
        }

        let unused = prev.len().saturating_sub(matched);
        trace!(a, b, matched, unused, "warm start");
        self.used_previous += matched;
        self.unused_previous += unused;
    }

    /// Joins the collision groups of every pair of dynamic bodies in contact.
    pub fn merge_groups(&self, bodies: &mut [Body]) {
        for manifold in self.manifolds.iter().filter(|m| m.dynamic_b) {
            let (a, b) = (manifold.body_a.index(), manifold.body_b.index());
            if a < bodies.len() && b < bodies.len() && a != b {
                let (body_a, body_b) = get_two_mut(bodies, a, b);
                body_a.merge_collision_group(body_b);
            }
        }
    }

    #[inline]
    pub fn manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    #[inline]
    pub fn manifolds_mut(&mut self) -> &mut [ContactManifold] {
        &mut self.manifolds
    }

    /// Manifolds of the step before the current one
    #[inline]
    pub fn previous_manifolds(&self) -> &[ContactManifold] {
        &self.previous
    }

    #[inline]
    pub fn manifold_count(&self) -> usize {
        self.manifolds.len()
    }

    /// Raw depth of point `point` of manifold `manifold`
    pub fn point_depth(&self, manifold: usize, point: usize) -> Option<f32> {
        self.manifolds.get(manifold)?.point_depth(point)
    }

    /// Indices of the current manifolds touching `body`
    pub fn body_manifolds(&self, body: BodyHandle) -> &[usize] {
        self.body_contacts.get(body.index()).map_or(&[], Vec::as_slice)
    }

    /// Previous-step points reused and dropped by warm starting this step
    pub fn contact_stats(&self) -> (usize, usize) {
        (self.used_previous, self.unused_previous)
    }
}

/// Friction direction: the tangential relative velocity, or a fixed axis
/// crossed with the normal when the contact is not sliding.
fn contact_binormal(relative_velocity: Vec3, normal: Vec3, point: usize) -> Vec3 {
    let mut tangent = relative_velocity - normal * relative_velocity.dot(normal);
    if tangent.normalize_len() >= EPSILON {
        return tangent;
    }

    let seed = if point % 2 == 1 { Vec3::X } else { Vec3::Z };
    let fallback = seed.cross(normal);
    if fallback.in_bound(EPSILON) {
        Vec3::Y
    } else {
        fallback.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDesc;
    use crate::geometry::Material;

    fn bodies() -> Vec<Body> {
        let mut ground = BodyDesc::fixed().with_position(Vec3::new(0.0, 0.0, -1.0)).build();
        ground.set_handle(BodyHandle::new(0));
        let mut cube = BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, 0.45)).build();
        cube.set_handle(BodyHandle::new(1));
        vec![ground, cube]
    }

    /// Ground-first patch, normal from the cube (B) to the ground (A).
    fn ground_patch() -> ContactPatch {
        let mut patch = ContactPatch::new(-Vec3::Z, Material::default());
        for (x, y) in [(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.5, -0.5)] {
            patch.push(Vec3::new(x, y, 0.0), Vec3::new(x, y, -0.05), 0.05);
        }
        patch
    }

    #[test]
    fn test_static_body_moves_to_second_slot() {
        let mut bodies = bodies();
        let mut store = ContactStore::new(0.15, 0.3, 0.01);
        store.begin_step(bodies.len());

        let index = store.add_patch(&mut bodies, 0, 1, ground_patch(), 60.0).expect("manifold");
        let manifold = &store.manifolds()[index];
        assert_eq!(manifold.body_a, BodyHandle::new(1));
        assert_eq!(manifold.body_b, BodyHandle::new(0));
        assert!(!manifold.dynamic_b);
        assert!(manifold.normal.equal_eps(Vec3::Z));

        let p = manifold.points[0];
        assert!(p.r_a.equal_eps(Vec3::new(0.5, 0.5, -0.5)));
        assert!(p.rn_a.equal_eps(p.r_a.cross(Vec3::Z)));
        assert!(p.binormal.dot(Vec3::Z).abs() < 1e-5);
        assert!((p.bias_velocity - 0.04 * 60.0 * 0.15).abs() < 1e-4);
        assert!((p.bias_position - 0.04 * 60.0 * 0.3).abs() < 1e-4);
        assert_eq!(store.body_manifolds(BodyHandle::new(0)), &[index]);
    }

    #[test]
    fn test_empty_patch_is_skipped() {
        let mut bodies = bodies();
        let mut store = ContactStore::new(0.15, 0.3, 0.01);
        store.begin_step(2);
        let empty = ContactPatch::new(Vec3::Z, Material::default());
        assert!(store.add_patch(&mut bodies, 1, 0, empty, 60.0).is_none());
        assert_eq!(store.manifold_count(), 0);
    }

    #[test]
    fn test_warm_start_reuses_matching_points() {
        let mut bodies = bodies();
        let mut store = ContactStore::new(0.15, 0.3, 0.01);
        store.begin_step(2);
        let index = store.add_patch(&mut bodies, 1, 0, ground_patch().flipped(), 60.0).unwrap();
        for p in &mut store.manifolds_mut()[index].points {
            p.normal_impulse = 0.25;
            p.friction_impulse = 0.1;
        }

        let before = bodies[1].velocity();
        store.begin_step(2);
        let index = store.add_patch(&mut bodies, 1, 0, ground_patch().flipped(), 60.0).unwrap();

        let manifold = &store.manifolds()[index];
        assert!(manifold.points.iter().all(|p| p.normal_impulse == 0.25));
        assert_eq!(store.contact_stats(), (4, 0));
        assert!(bodies[1].velocity().z > before.z + 0.9);
        assert_eq!(store.previous_manifolds().len(), 1);
    }

    #[test]
    fn test_warm_start_matches_swapped_pair() {
        let mut bodies = bodies();
        bodies[0] = BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, -1.0)).build();
        bodies[0].set_handle(BodyHandle::new(0));
        let mut store = ContactStore::new(0.15, 0.3, 0.01);

        store.begin_step(2);
        store.add_patch(&mut bodies, 1, 0, ground_patch().flipped(), 60.0).unwrap();
        store.manifolds_mut()[0].points[0].normal_impulse = 0.5;
        store.manifolds_mut()[0].points[0].friction_impulse = 0.2;
        let kept = store.manifolds()[0].points[0];

        store.begin_step(2);
        store.add_patch(&mut bodies, 0, 1, ground_patch(), 60.0).unwrap();
        let manifold = &store.manifolds()[0];
        assert_eq!(manifold.body_a, BodyHandle::new(0));
        // Matching uses the old B offset, seen from the lower body.
        let p = manifold.points.iter().find(|p| p.r_a.equal_eps(kept.r_b)).expect("matched point");
        assert_eq!(p.normal_impulse, 0.5);
        assert_eq!(p.friction_impulse, -0.2);
        assert!(bodies[0].shares_collision_group(&bodies[1]));
    }

    #[test]
    fn test_unmatched_points_start_cold() {
        let mut bodies = bodies();
        let mut store = ContactStore::new(0.15, 0.3, 0.01);
        store.begin_step(2);
        store.add_patch(&mut bodies, 1, 0, ground_patch().flipped(), 60.0).unwrap();
        store.manifolds_mut()[0].points[0].normal_impulse = 1.0;

        let mut moved = ContactPatch::new(Vec3::Z, Material::default());
        moved.push(Vec3::new(0.2, 0.1, -0.05), Vec3::new(0.2, 0.1, 0.0), 0.05);
        store.begin_step(2);
        store.add_patch(&mut bodies, 1, 0, moved, 60.0).unwrap();
        assert_eq!(store.manifolds()[0].points[0].normal_impulse, 0.0);
        assert_eq!(store.contact_stats(), (0, 4));
    }

    #[test]
    fn test_warm_start_keeps_shape_pairs_apart() {
        let mut bodies = bodies();
        let mut store = ContactStore::new(0.15, 0.3, 0.01);
        let left = |patch: ContactPatch| patch.with_shapes(0, 0);
        let right = |patch: ContactPatch| patch.with_shapes(1, 0);

        store.begin_step(2);
        let first = store.add_patch(&mut bodies, 1, 0, left(ground_patch().flipped()), 60.0).unwrap();
        let second = store.add_patch(&mut bodies, 1, 0, right(ground_patch().flipped()), 60.0).unwrap();
        for p in &mut store.manifolds_mut()[first].points {
            p.normal_impulse = 0.1;
        }
        for p in &mut store.manifolds_mut()[second].points {
            p.normal_impulse = 0.3;
        }

        // Same points for both pairs; the second arrives first, ground first.
        store.begin_step(2);
        let second = store.add_patch(&mut bodies, 0, 1, ground_patch().with_shapes(0, 1), 60.0).unwrap();
        let first = store.add_patch(&mut bodies, 1, 0, left(ground_patch().flipped()), 60.0).unwrap();

        let manifolds = store.manifolds();
        assert_eq!((manifolds[second].shape_a, manifolds[second].shape_b), (1, 0));
        assert!(manifolds[first].points.iter().all(|p| p.normal_impulse == 0.1));
        assert!(manifolds[second].points.iter().all(|p| p.normal_impulse == 0.3));
        assert_eq!(store.contact_stats(), (8, 0));
    }

    #[test]
    fn test_binormal_fallbacks() {
        let sliding = contact_binormal(Vec3::new(2.0, 0.0, 1.0), Vec3::Z, 0);
        assert!(sliding.equal_eps(Vec3::X));
        assert!(contact_binormal(Vec3::ZERO, Vec3::Y, 0).equal_eps(Vec3::Z.cross(Vec3::Y)));
        assert!(contact_binormal(Vec3::ZERO, Vec3::Y, 1).equal_eps(Vec3::X.cross(Vec3::Y)));
        assert_eq!(contact_binormal(Vec3::ZERO, Vec3::Z, 0), Vec3::Y);
    }
}
