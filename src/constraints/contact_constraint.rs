//! Impulse rows of one contact point.
//!
//! Each point carries three rows: the non-penetration row along the normal,
//! a Coulomb friction row along the binormal and a split-impulse row that
//! only feeds the pseudo velocities. Body B is `None` when it is static.

use crate::collision::ManifoldPoint;
use crate::dynamics::Body;
use crate::math::Vec3;

/// Inverse effective masses of a point.
///
/// The pseudo row has no mass term: pseudo impulses are applied without the
/// inverse mass, so each body contributes a unit linear share.
pub fn prepare_point(point: &mut ManifoldPoint, body_a: &Body, body_b: Option<&Body>) {
    let angular = |body: &Body, lever: Vec3| lever.dot(body.inv_inertia_world(lever));

    point.k_normal = body_a.inv_mass() + angular(body_a, point.rn_a);
    point.k_binormal = body_a.inv_mass() + angular(body_a, point.rb_a);
    point.k_pseudo = 1.0 + angular(body_a, point.rn_a);

    if let Some(body_b) = body_b {
        point.k_normal += body_b.inv_mass() + angular(body_b, point.rn_b);
        point.k_binormal += body_b.inv_mass() + angular(body_b, point.rb_b);
        point.k_pseudo += 1.0 + angular(body_b, point.rn_b);
    }
}

/// Separation speed to aim for after an impact.
///
/// Only approaches faster than `threshold` bounce.
pub fn restitution_target(normal_velocity: f32, restitution: f32, threshold: f32) -> f32 {
    if normal_velocity < -threshold {
        -restitution * normal_velocity
    } else {
        0.0
    }
}

/// Relative velocity of A against B along `normal` at the point
pub fn normal_velocity(point: &ManifoldPoint, normal: Vec3, body_a: &Body, body_b: Option<&Body>) -> f32 {
    let mut vn = body_a.velocity().dot(normal) + body_a.angular_velocity().dot(point.rn_a);
    if let Some(body_b) = body_b {
        vn -= body_b.velocity().dot(normal) + body_b.angular_velocity().dot(point.rn_b);
    }
    vn
}

fn binormal_velocity(point: &ManifoldPoint, body_a: &Body, body_b: Option<&Body>) -> f32 {
    let mut vt = body_a.velocity().dot(point.binormal) + body_a.angular_velocity().dot(point.rb_a);
    if let Some(body_b) = body_b {
        vt -= body_b.velocity().dot(point.binormal) + body_b.angular_velocity().dot(point.rb_b);
    }
    vt
}

fn pseudo_velocity(point: &ManifoldPoint, normal: Vec3, body_a: &Body, body_b: Option<&Body>) -> f32 {
    let mut vp = body_a.pseudo_velocity().dot(normal) + body_a.pseudo_angular_velocity().dot(point.rn_a);
    if let Some(body_b) = body_b {
        vp -= body_b.pseudo_velocity().dot(normal) + body_b.pseudo_angular_velocity().dot(point.rn_b);
    }
    vp
}

fn apply_normal(point: &ManifoldPoint, normal: Vec3, impulse: f32, body_a: &mut Body, body_b: Option<&mut Body>) {
    body_a.apply_linear_impulse(normal, impulse);
    body_a.apply_angular_impulse(point.rn_a, impulse);
    if let Some(body_b) = body_b {
        body_b.apply_linear_impulse(normal, -impulse);
        body_b.apply_angular_impulse(point.rn_b, -impulse);
    }
}

fn apply_friction(point: &ManifoldPoint, impulse: f32, body_a: &mut Body, body_b: Option<&mut Body>) {
    body_a.apply_linear_impulse(point.binormal, impulse);
    body_a.apply_angular_impulse(point.rb_a, impulse);
    if let Some(body_b) = body_b {
        body_b.apply_linear_impulse(point.binormal, -impulse);
        body_b.apply_angular_impulse(point.rb_b, -impulse);
    }
}

fn apply_pseudo(point: &ManifoldPoint, normal: Vec3, impulse: f32, body_a: &mut Body, body_b: Option<&mut Body>) {
    body_a.apply_linear_pseudo_impulse(normal, impulse);
    body_a.apply_angular_pseudo_impulse(point.rn_a, impulse);
    if let Some(body_b) = body_b {
        body_b.apply_linear_pseudo_impulse(normal, -impulse);
        body_b.apply_angular_pseudo_impulse(point.rn_b, -impulse);
    }
}

/// Non-penetration row. The accumulated impulse never pulls the bodies
/// together.
pub fn solve_normal(point: &mut ManifoldPoint, normal: Vec3, body_a: &mut Body, mut body_b: Option<&mut Body>) {
    if point.k_normal <= 0.0 {
        return;
    }
    let vn = normal_velocity(point, normal, body_a, body_b.as_deref());
    let delta = (point.bias_velocity + point.restitution_target - vn) / point.k_normal;

    let old = point.normal_impulse;
    point.normal_impulse = (old + delta).max(0.0);
    let applied = point.normal_impulse - old;

    apply_normal(point, normal, applied, body_a, body_b.as_deref_mut());
}

/// Friction row, boxed by `friction` times the current normal impulse.
pub fn solve_friction(point: &mut ManifoldPoint, friction: f32, body_a: &mut Body, mut body_b: Option<&mut Body>) {
    if point.k_binormal <= 0.0 {
        return;
    }
    let vt = binormal_velocity(point, body_a, body_b.as_deref());
    let delta = -vt / point.k_binormal;

    let max_friction = friction * point.normal_impulse;
    let old = point.friction_impulse;
    point.friction_impulse = (old + delta).clamp(-max_friction, max_friction);
    let applied = point.friction_impulse - old;

    apply_friction(point, applied, body_a, body_b.as_deref_mut());
}

/// Split-impulse row: pushes the pseudo velocities apart until the biased
/// depth is resolved.
pub fn solve_pseudo(point: &mut ManifoldPoint, normal: Vec3, body_a: &mut Body, mut body_b: Option<&mut Body>) {
    if point.k_pseudo <= 0.0 {
        return;
    }
    let vp = pseudo_velocity(point, normal, body_a, body_b.as_deref());
    let delta = (point.bias_position - vp) / point.k_pseudo;

    let old = point.pseudo_impulse;
    point.pseudo_impulse = (old + delta).max(0.0);
    let applied = point.pseudo_impulse - old;

    apply_pseudo(point, normal, applied, body_a, body_b.as_deref_mut());
}

/// One-shot normal row of the shock propagation pass. B is treated as
/// static and only separating corrections are applied.
pub fn shock_normal(point: &ManifoldPoint, normal: Vec3, body_a: &mut Body) {
    if point.k_normal <= 0.0 {
        return;
    }
    let vn = normal_velocity(point, normal, body_a, None);
    let impulse = (point.bias_velocity + point.restitution_target - vn) / point.k_normal;
    if impulse > 0.0 {
        apply_normal(point, normal, impulse, body_a, None);
    }
}

/// One-shot friction row of the shock propagation pass, bounded by the
/// normal impulse accumulated in the regular solve.
pub fn shock_friction(point: &ManifoldPoint, friction: f32, body_a: &mut Body) {
    if point.k_binormal <= 0.0 {
        return;
    }
    let vt = binormal_velocity(point, body_a, None);
    let max_friction = friction * point.normal_impulse;
    let impulse = (-vt / point.k_binormal).clamp(-max_friction, max_friction);
    apply_friction(point, impulse, body_a, None);
}

/// One-shot split-impulse row of the shock propagation pass.
pub fn shock_pseudo(point: &ManifoldPoint, normal: Vec3, body_a: &mut Body) {
    if point.k_pseudo <= 0.0 {
        return;
    }
    let vp = pseudo_velocity(point, normal, body_a, None);
    let impulse = (point.bias_position - vp) / point.k_pseudo;
    if impulse > 0.0 {
        apply_pseudo(point, normal, impulse, body_a, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDesc;

    fn point_below(r_a: Vec3, normal: Vec3) -> ManifoldPoint {
        let binormal = Vec3::X;
        ManifoldPoint {
            r_a,
            rn_a: r_a.cross(normal),
            rb_a: r_a.cross(binormal),
            binormal,
            ..ManifoldPoint::default()
        }
    }

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_prepare_static_and_dynamic() {
        let a = BodyDesc::dynamic().with_mass(2.0).build();
        let b = BodyDesc::dynamic().with_mass(2.0).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);

        prepare_point(&mut point, &a, None);
        assert!(approx_eq(point.k_normal, 0.5));
        assert!(approx_eq(point.k_pseudo, 1.0));

        prepare_point(&mut point, &a, Some(&b));
        assert!(approx_eq(point.k_normal, 1.0));
        assert!(approx_eq(point.k_binormal, 1.0));
        assert!(approx_eq(point.k_pseudo, 2.0));
    }

    #[test]
    fn test_prepare_includes_lever_arm() {
        let a = BodyDesc::dynamic().build();
        let mut point = point_below(Vec3::new(1.0, 0.0, 0.0), Vec3::Z);
        prepare_point(&mut point, &a, None);
        // |r × n|² = 1 with unit inverse inertia
        assert!(approx_eq(point.k_normal, 2.0));
    }

    #[test]
    fn test_restitution_target_threshold() {
        assert_eq!(restitution_target(-0.5, 0.8, 1.0), 0.0);
        assert!(approx_eq(restitution_target(-5.0, 0.8, 1.0), 4.0));
        assert_eq!(restitution_target(3.0, 1.0, 1.0), 0.0);
        assert!(approx_eq(restitution_target(-0.5, 1.0, 0.0), 0.5));
        assert_eq!(restitution_target(0.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_normal_row_stops_approach() {
        let mut a = BodyDesc::dynamic().with_velocity(Vec3::new(0.0, 0.0, -2.0)).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        prepare_point(&mut point, &a, None);

        solve_normal(&mut point, Vec3::Z, &mut a, None);
        assert!(approx_eq(a.velocity().z, 0.0));
        assert!(approx_eq(point.normal_impulse, 2.0));
    }

    #[test]
    fn test_normal_row_never_pulls() {
        let mut a = BodyDesc::dynamic().with_velocity(Vec3::new(0.0, 0.0, 1.0)).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        prepare_point(&mut point, &a, None);

        solve_normal(&mut point, Vec3::Z, &mut a, None);
        assert_eq!(point.normal_impulse, 0.0);
        assert_eq!(a.velocity(), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_normal_row_is_symmetric_between_dynamic_bodies() {
        let mut a = BodyDesc::dynamic().with_velocity(Vec3::new(0.0, 0.0, -1.0)).build();
        let mut b = BodyDesc::dynamic().with_velocity(Vec3::new(0.0, 0.0, 1.0)).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        prepare_point(&mut point, &a, Some(&b));

        solve_normal(&mut point, Vec3::Z, &mut a, Some(&mut b));
        assert!(approx_eq(a.velocity().z, 0.0));
        assert!(approx_eq(b.velocity().z, 0.0));
        assert!(approx_eq((a.velocity() + b.velocity()).z, 0.0));
    }

    #[test]
    fn test_friction_row_is_boxed() {
        let mut a = BodyDesc::dynamic().with_velocity(Vec3::new(3.0, 0.0, 0.0)).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        point.normal_impulse = 1.0;
        prepare_point(&mut point, &a, None);

        solve_friction(&mut point, 0.5, &mut a, None);
        assert!(approx_eq(point.friction_impulse, -0.5));
        assert!(approx_eq(a.velocity().x, 2.5));

        point.normal_impulse = 10.0;
        solve_friction(&mut point, 0.5, &mut a, None);
        assert!(approx_eq(a.velocity().x, 0.0));
    }

    #[test]
    fn test_pseudo_row_only_touches_pseudo_velocity() {
        let mut a = BodyDesc::dynamic().build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        point.bias_position = 0.6;
        prepare_point(&mut point, &a, None);

        solve_pseudo(&mut point, Vec3::Z, &mut a, None);
        assert!(approx_eq(a.pseudo_velocity().z, 0.6));
        assert_eq!(a.velocity(), Vec3::ZERO);

        // Already satisfied, nothing more to push.
        solve_pseudo(&mut point, Vec3::Z, &mut a, None);
        assert!(approx_eq(a.pseudo_velocity().z, 0.6));
    }

    #[test]
    fn test_shock_rows_apply_only_separating_impulses() {
        let mut a = BodyDesc::dynamic().with_velocity(Vec3::new(1.0, 0.0, -1.0)).build();
        let mut point = point_below(Vec3::ZERO, Vec3::Z);
        point.normal_impulse = 0.25;
        prepare_point(&mut point, &a, None);

        shock_normal(&point, Vec3::Z, &mut a);
        assert!(approx_eq(a.velocity().z, 0.0));
        shock_normal(&point, Vec3::Z, &mut a);
        assert!(approx_eq(a.velocity().z, 0.0));

        shock_friction(&point, 1.0, &mut a);
        assert!(approx_eq(a.velocity().x, 0.75));

        shock_pseudo(&point, Vec3::Z, &mut a);
        assert_eq!(a.pseudo_velocity(), Vec3::ZERO);
    }
}
