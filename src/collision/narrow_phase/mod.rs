//! Narrow phase: exact contacts between two placed shapes.
//!
//! Sphere pairs are solved in closed form. Everything involving a hull or two
//! capsules goes through GJK on the shape cores, with EPA taking over once the
//! cores overlap.

mod epa;
mod gjk;
mod hull;
mod primitives;

use tracing::trace;

use crate::collision::contact::ContactPatch;
use crate::geometry::Shape;
use crate::math::{consts::EPSILON, Vec3};

pub use epa::{epa, EpaResult};
pub use gjk::{gjk, support, GjkResult, Simplex};
pub use hull::{hull_capsule, hull_hull, hull_sphere, reduce_candidates};
pub use primitives::{capsule_capsule, capsule_sphere, sphere_sphere};

/// Contact normal (B to A) and depth of two rounded shapes.
///
/// The shape radii are added on top of the core query: separated cores still
/// touch when their distance is below the radius sum.
pub fn penetration(shape_a: &Shape, shape_b: &Shape) -> Option<(Vec3, f32)> {
    let radius = shape_a.radius() + shape_b.radius();

    match gjk(shape_a, shape_b) {
        GjkResult::Separated { closest } => {
            let dist_sq = closest.length_squared();
            if dist_sq > radius * radius {
                return None;
            }
            let dist = dist_sq.sqrt();
            if dist <= EPSILON {
                trace!(dist, "cores touching without overlap, no normal");
                return None;
            }
            Some((closest / dist, radius - dist))
        }
        GjkResult::Intersecting(simplex) => {
            let Some(result) = epa(&simplex, shape_a, shape_b) else {
                trace!("epa found no penetration normal");
                return None;
            };
            Some((-result.normal, radius + result.depth))
        }
    }
}

/// Contact patch of two placed shapes, or `None` when they do not touch.
///
/// The returned normal points from `shape_b` towards `shape_a`.
pub fn collide(shape_a: &Shape, shape_b: &Shape) -> Option<ContactPatch> {
    let material = shape_a.material().mixed(&shape_b.material());

    let patch = match (shape_a, shape_b) {
        (Shape::Sphere(a), Shape::Sphere(b)) => sphere_sphere(a, b, material),
        (Shape::Capsule(a), Shape::Sphere(b)) => capsule_sphere(a, b, material),
        (Shape::Sphere(a), Shape::Capsule(b)) => capsule_sphere(b, a, material).map(ContactPatch::flipped),
        (Shape::Capsule(_), Shape::Capsule(_)) => capsule_capsule(shape_a, shape_b),
        (Shape::Hull(_), Shape::Sphere(_)) => hull_sphere(shape_a, shape_b),
        (Shape::Sphere(_), Shape::Hull(_)) => hull_sphere(shape_b, shape_a).map(ContactPatch::flipped),
        (Shape::Hull(_), Shape::Capsule(_)) => hull_capsule(shape_a, shape_b),
        (Shape::Capsule(_), Shape::Hull(_)) => hull_capsule(shape_b, shape_a).map(ContactPatch::flipped),
        (Shape::Hull(_), Shape::Hull(_)) => hull_hull(shape_a, shape_b),
    }?;

    (!patch.is_empty()).then_some(patch)
}
