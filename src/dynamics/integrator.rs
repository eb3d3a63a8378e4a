use crate::math::Vec3;

use super::rigid_body::Body;

/// Advances one body by `dt` with semi-implicit Euler.
///
/// The position moves by the real plus the pseudo velocity accumulated by the
/// solver, then the pseudo part is cleared. Gravity and damping only touch the
/// real velocity, after it has been used for the position. A rotation that
/// cannot be applied (spin below the engine epsilon) zeroes the angular
/// velocity.
pub fn integrate_body(body: &mut Body, dt: f32, gravity: Vec3, damping: f32) {
    if !body.is_dynamic() {
        return;
    }

    let state = body.motion_mut();
    *state.position += (*state.velocity + *state.pseudo_velocity) * dt;

    *state.pseudo_angular_velocity += *state.angular_velocity;
    if !state.rotation.rotate(*state.pseudo_angular_velocity, dt) {
        *state.angular_velocity = Vec3::ZERO;
    }
    *state.pseudo_velocity = Vec3::ZERO;
    *state.pseudo_angular_velocity = Vec3::ZERO;

    *state.velocity = (*state.velocity + gravity * dt) * damping;
    *state.angular_velocity *= damping;

    body.refresh_shapes();
}
