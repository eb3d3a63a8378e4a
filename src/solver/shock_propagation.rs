//! Layered re-solve of resting stacks.
//!
//! Manifolds against static bodies form the first layer. Every further layer
//! holds the manifolds that touch a body grounded by an earlier layer, stored
//! with the grounded body as B. Solving layer by layer while treating B as
//! static keeps impulses from travelling down the stack.

use tracing::trace;

use crate::collision::ContactManifold;
use crate::constraints::{
    prepare_point, shock_friction, shock_normal, shock_pseudo, solve_friction, solve_normal, solve_pseudo,
};
use crate::dynamics::Body;

/// Builds the layers, reorienting manifolds so that the upper body is A.
///
/// Returns manifold indices per layer. Manifolds between two bodies grounded
/// in earlier layers belong to no layer.
pub fn build_layers(manifolds: &mut [ContactManifold], num_bodies: usize) -> Vec<Vec<usize>> {
    for manifold in manifolds.iter_mut() {
        manifold.solved = false;
    }

    let mut grounded = vec![false; num_bodies];

    let mut first = Vec::new();
    for (i, manifold) in manifolds.iter_mut().enumerate() {
        if !manifold.dynamic_b {
            manifold.solved = true;
            first.push(i);
        }
    }
    for &i in &first {
        if let Some(g) = grounded.get_mut(manifolds[i].body_a.index()) {
            *g = true;
        }
    }

    let mut layers = vec![first];
    loop {
        let mut layer = Vec::new();
        for (i, manifold) in manifolds.iter_mut().enumerate() {
            if manifold.solved {
                continue;
            }
            let a = is_grounded(&grounded, manifold.body_a.index());
            let b = is_grounded(&grounded, manifold.body_b.index());
            match (a, b) {
                (true, true) => manifold.solved = true,
                (true, false) => {
                    manifold.swap_bodies();
                    manifold.solved = true;
                    layer.push(i);
                }
                (false, true) => {
                    manifold.solved = true;
                    layer.push(i);
                }
                (false, false) => {}
            }
        }
        if layer.is_empty() {
            break;
        }
        for &i in &layer {
            if let Some(g) = grounded.get_mut(manifolds[i].body_a.index()) {
                *g = true;
            }
        }
        layers.push(layer);
    }
    layers
}

fn is_grounded(grounded: &[bool], index: usize) -> bool {
    grounded.get(index).copied().unwrap_or(false)
}

/// Runs the shock propagation pass over `manifolds`.
pub(crate) fn solve(manifolds: &mut [ContactManifold], bodies: &mut [Body]) {
    let layers = build_layers(manifolds, bodies.len());
    trace!(layers = layers.len(), "shock propagation");

    for (depth, layer) in layers.iter().enumerate() {
        for &i in layer {
            let manifold = &mut manifolds[i];
            let Some(body_a) = bodies.get_mut(manifold.body_a.index()) else {
                continue;
            };
            let (normal, friction) = (manifold.normal, manifold.friction);

            if depth == 0 {
                for point in &mut manifold.points {
                    solve_normal(point, normal, body_a, None);
                    solve_friction(point, friction, body_a, None);
                    solve_pseudo(point, normal, body_a, None);
                }
            } else {
                for point in &mut manifold.points {
                    prepare_point(point, body_a, None);
                    shock_normal(point, normal, body_a);
                    shock_friction(point, friction, body_a);
                    shock_pseudo(point, normal, body_a);
                }
            }
        }
    }
}
