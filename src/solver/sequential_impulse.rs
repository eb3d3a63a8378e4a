use tracing::trace;

use crate::collision::ContactManifold;
use crate::constraints::{normal_velocity, prepare_point, restitution_target, solve_friction, solve_normal, solve_pseudo};
use crate::dynamics::{get_two_mut, Body};

use super::shock_propagation;

/// Configuration for the contact solver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Number of velocity iterations
    pub velocity_iterations: usize,
    /// Number of split-impulse iterations
    pub position_iterations: usize,
    /// Share of the depth fed back as velocity bias
    pub erp_velocity: f32,
    /// Share of the depth fed back as pseudo velocity
    pub erp_position: f32,
    /// Penetration left alone
    pub slop: f32,
    pub enable_shock_propagation: bool,
    /// Approach speed a contact must exceed to bounce; zero bounces every
    /// approaching contact
    pub restitution_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 3,
            erp_velocity: 0.15,
            erp_position: 0.30,
            slop: 0.01,            // resting stacks keep this much overlap
            enable_shock_propagation: true,
            restitution_threshold: 0.0,
        }
    }
}

/// Sequential impulse solver with split-impulse position correction.
///
/// Manifolds arrive warm-started from the contact store; the solver only
/// reads mass properties and writes velocities and pseudo velocities.
#[derive(Debug, Clone, Default)]
pub struct SequentialImpulseSolver {
    config: SolverConfig,
}

impl SequentialImpulseSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Runs the velocity iterations, then the split-impulse iterations.
    pub fn solve(&self, manifolds: &mut [ContactManifold], bodies: &mut [Body]) {
        if manifolds.is_empty() {
            return;
        }
        self.pre_solve(manifolds, bodies);

        for _ in 1..self.config.velocity_iterations {
            for manifold in manifolds.iter_mut() {
                solve_velocity(manifold, bodies);
            }
        }
        for _ in 0..self.config.position_iterations {
            for manifold in manifolds.iter_mut() {
                solve_position(manifold, bodies);
            }
        }
        trace!(manifolds = manifolds.len(), "contacts solved");
    }

    /// Layered pass over the contact graph, run after [`solve`](Self::solve).
    pub fn solve_shock_propagation(&self, manifolds: &mut [ContactManifold], bodies: &mut [Body]) {
        if self.config.enable_shock_propagation {
            shock_propagation::solve(manifolds, bodies);
        }
    }

    /// Computes the effective masses and restitution targets, then runs the
    /// first velocity iteration.
    fn pre_solve(&self, manifolds: &mut [ContactManifold], bodies: &mut [Body]) {
        for manifold in manifolds.iter_mut() {
            let Some((body_a, body_b)) = manifold_bodies(bodies, manifold) else {
                continue;
            };
            let normal = manifold.normal;
            for point in &mut manifold.points {
                prepare_point(point, body_a, body_b.as_deref());
                let vn = normal_velocity(point, normal, body_a, body_b.as_deref());
                point.restitution_target = restitution_target(vn, manifold.restitution, self.config.restitution_threshold);
            }
            if self.config.velocity_iterations > 0 {
                solve_velocity(manifold, bodies);
            }
        }
    }
}

/// Borrows the bodies of a manifold, B only when it is dynamic.
pub(crate) fn manifold_bodies<'a>(
    bodies: &'a mut [Body],
    manifold: &ContactManifold,
) -> Option<(&'a mut Body, Option<&'a mut Body>)> {
    let (a, b) = (manifold.body_a.index(), manifold.body_b.index());
    if a >= bodies.len() || (manifold.dynamic_b && (b >= bodies.len() || a == b)) {
        return None;
    }
    if manifold.dynamic_b {
        let (body_a, body_b) = get_two_mut(bodies, a, b);
        Some((body_a, Some(body_b)))
    } else {
        Some((&mut bodies[a], None))
    }
}

fn solve_velocity(manifold: &mut ContactManifold, bodies: &mut [Body]) {
    let Some((body_a, mut body_b)) = manifold_bodies(bodies, manifold) else {
        return;
    };
    let (normal, friction) = (manifold.normal, manifold.friction);
    for point in &mut manifold.points {
        solve_normal(point, normal, body_a, body_b.as_deref_mut());
        solve_friction(point, friction, body_a, body_b.as_deref_mut());
    }
}

fn solve_position(manifold: &mut ContactManifold, bodies: &mut [Body]) {
    let Some((body_a, mut body_b)) = manifold_bodies(bodies, manifold) else {
        return;
    };
    let normal = manifold.normal;
    for point in &mut manifold.points {
        solve_pseudo(point, normal, body_a, body_b.as_deref_mut());
    }
}
