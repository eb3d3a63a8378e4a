//! Closed-form contacts between spheres and capsules, plus the segment
//! contact rules shared with hull edges.

use tracing::trace;

use crate::collision::contact::{ContactPatch, ContactPoint};
use crate::geometry::{Capsule, Material, Shape, Sphere};
use crate::math::{consts::EPSILON, predicates::plane_ray, Vec3};

use super::penetration;

/// A segment swept by a radius
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub p0: Vec3,
    pub p1: Vec3,
    /// Unit direction from `p0` to `p1`
    pub dir: Vec3,
    pub length: f32,
    pub radius: f32,
}

impl Segment {
    pub fn of_capsule(capsule: &Capsule) -> Self {
        let [p0, p1] = capsule.vertices();
        Self {
            p0,
            p1,
            dir: capsule.dir(),
            length: capsule.length(),
            radius: capsule.radius(),
        }
    }

    /// Bare edge between two points
    pub fn edge(p0: Vec3, p1: Vec3) -> Self {
        let mut dir = p1 - p0;
        let length = dir.normalize_len();
        Self {
            p0,
            p1,
            dir,
            length,
            radius: 0.0,
        }
    }

    #[inline]
    fn at(&self, t: f32) -> Vec3 {
        self.p0 + self.dir * t
    }
}

/// Sphere A against sphere B.
pub fn sphere_sphere(a: &Sphere, b: &Sphere, material: Material) -> Option<ContactPatch> {
    let radius_sum = a.radius() + b.radius();
    let offset = a.center() - b.center();
    let dist_sq = offset.length_squared();
    if dist_sq > radius_sum * radius_sum {
        return None;
    }
    if dist_sq < EPSILON {
        trace!("coincident sphere centers");
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = offset / dist;
    let mut patch = ContactPatch::new(normal, material);
    patch.push(
        a.center() - normal * a.radius(),
        b.center() + normal * b.radius(),
        radius_sum - dist,
    );
    Some(patch)
}

/// Capsule A against sphere B.
pub fn capsule_sphere(capsule: &Capsule, sphere: &Sphere, material: Material) -> Option<ContactPatch> {
    let radius_sum = capsule.radius() + sphere.radius();
    let center = sphere.center();
    let [p0, p1] = capsule.vertices();

    let t = (center - p0).dot(capsule.dir());
    let closest = if t < 0.0 {
        p0
    } else if t > capsule.length() {
        p1
    } else {
        p0 + capsule.dir() * t
    };

    let mut normal = closest - center;
    if normal.length_squared() > radius_sum * radius_sum {
        return None;
    }
    let dist = normal.normalize_len();
    if dist < EPSILON {
        trace!("sphere center on capsule segment");
        return None;
    }

    let mut patch = ContactPatch::new(normal, material);
    patch.push(
        closest - normal * capsule.radius(),
        center + normal * sphere.radius(),
        radius_sum - dist,
    );
    Some(patch)
}

/// Capsule A against capsule B.
pub fn capsule_capsule(shape_a: &Shape, shape_b: &Shape) -> Option<ContactPatch> {
    let (Shape::Capsule(a), Shape::Capsule(b)) = (shape_a, shape_b) else {
        return None;
    };
    let (normal, depth) = penetration(shape_a, shape_b)?;

    let mut patch = ContactPatch::new(normal, shape_a.material().mixed(&shape_b.material()));
    segment_contacts(&Segment::of_capsule(a), &Segment::of_capsule(b), normal, depth, &mut patch.points);
    Some(patch)
}

/// Contact points between two swept segments once the normal (B to A) and
/// depth are known.
///
/// A segment perpendicular to the normal lies flat against the other one and
/// may touch it along an interval, which yields two points at the interval
/// ends. Two flat, crossing segments touch in a single point. Otherwise the
/// tips nearest each other form one contact.
pub(crate) fn segment_contacts(a: &Segment, b: &Segment, normal: Vec3, depth: f32, out: &mut Vec<ContactPoint>) {
    let along_a = a.dir.dot(normal);
    let along_b = b.dir.dot(normal);
    let flat_a = along_a.abs() < EPSILON;
    let flat_b = along_b.abs() < EPSILON;

    if flat_a && flat_b {
        if let Some((hit, _)) = plane_ray(b.dir.cross(normal), b.p0, a.p0, a.dir) {
            let point_a = hit - normal * a.radius;
            out.push(ContactPoint::new(point_a, point_a + normal * depth, depth));
            return;
        }
    }

    if flat_a {
        interval_contacts(a, b, normal, out);
    } else if flat_b {
        let start = out.len();
        interval_contacts(b, a, -normal, out);
        for p in &mut out[start..] {
            *p = p.flipped();
        }
    } else {
        let tip_a = if along_a > 0.0 { a.p0 } else { a.p1 };
        let tip_b = if along_b < 0.0 { b.p0 } else { b.p1 };
        out.push(ContactPoint::new(tip_a - normal * a.radius, tip_b + normal * b.radius, depth));
    }
}

/// Contacts of segment `b` projected onto the flat segment `a`.
fn interval_contacts(a: &Segment, b: &Segment, normal: Vec3, out: &mut Vec<ContactPoint>) {
    let radius_sum = a.radius + b.radius;
    let mut pr1 = (b.p0 - a.p0).dot(a.dir);
    let mut pr2 = (b.p1 - a.p0).dot(a.dir);
    let swapped = pr1 > pr2;
    if swapped {
        std::mem::swap(&mut pr1, &mut pr2);
    }
    let span = pr2 - pr1;

    if span < EPSILON {
        // B is (nearly) parallel to the normal: one contact at its nearer tip.
        let point_a = a.at(pr1) - normal * a.radius;
        let d0 = (a.p0 - b.p0).dot(normal);
        let d1 = (a.p0 - b.p1).dot(normal);
        let (tip, dist) = if d1.abs() < d0.abs() { (b.p1, d1) } else { (b.p0, d0) };
        out.push(ContactPoint::new(point_a, tip + normal * b.radius, radius_sum - dist));
        return;
    }

    let on_b = |s: f32| {
        let t = s * b.length;
        if swapped {
            b.p1 - b.dir * t
        } else {
            b.p0 + b.dir * t
        }
    };

    let (first_a, first_b) = if pr1 > -EPSILON {
        (a.at(pr1), if swapped { b.p1 } else { b.p0 })
    } else {
        (a.p0, on_b(-pr1 / span))
    };
    let (second_a, second_b) = if pr2 < a.length + EPSILON {
        (a.at(pr2), if swapped { b.p0 } else { b.p1 })
    } else {
        (a.p1, on_b((a.length - pr1) / span))
    };

    for (core_a, core_b) in [(first_a, first_b), (second_a, second_b)] {
        let gap = core_a - core_b;
        if gap.length_squared() <= radius_sum * radius_sum {
            out.push(ContactPoint::new(
                core_a - normal * a.radius,
                core_b + normal * b.radius,
                radius_sum - gap.dot(normal),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::RotationBasis;

    fn placed(mut shape: Shape, position: Vec3) -> Shape {
        shape.update(position, &RotationBasis::IDENTITY);
        shape
    }

    fn sphere(position: Vec3, radius: f32) -> Sphere {
        match placed(Shape::sphere(Vec3::ZERO, radius), position) {
            Shape::Sphere(s) => s,
            _ => unreachable!(),
        }
    }

    fn x_capsule(from: f32, to: f32, radius: f32, position: Vec3) -> Shape {
        placed(Shape::capsule(Vec3::new(from, 0.0, 0.0), Vec3::new(to, 0.0, 0.0), radius), position)
    }

    fn as_capsule(shape: &Shape) -> &Capsule {
        match shape {
            Shape::Capsule(c) => c,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(1.9, 0.0, 0.0), 1.0);

        let patch = sphere_sphere(&a, &b, Material::default()).expect("contact");
        assert!(patch.normal.equal_eps(-Vec3::X));
        assert_eq!(patch.len(), 1);
        let p = patch.points[0];
        assert!((p.depth - 0.1).abs() < 1e-5);
        assert!(p.point_a.equal_eps(Vec3::X));
        assert!(p.point_b.equal_eps(Vec3::new(0.9, 0.0, 0.0)));
    }

    #[test]
    fn test_sphere_sphere_rejects_far_and_coincident() {
        let a = sphere(Vec3::ZERO, 1.0);
        assert!(sphere_sphere(&a, &sphere(Vec3::new(2.1, 0.0, 0.0), 1.0), Material::default()).is_none());
        assert!(sphere_sphere(&a, &sphere(Vec3::ZERO, 1.0), Material::default()).is_none());
    }

    #[test]
    fn test_capsule_sphere_side_and_tip() {
        let capsule = x_capsule(-1.0, 1.0, 0.5, Vec3::ZERO);

        let side = sphere(Vec3::new(0.5, 0.8, 0.0), 0.5);
        let patch = capsule_sphere(as_capsule(&capsule), &side, Material::default()).expect("side contact");
        assert!(patch.normal.equal_eps(-Vec3::Y));
        let p = patch.points[0];
        assert!((p.depth - 0.2).abs() < 1e-5);
        assert!(p.point_a.equal_eps(Vec3::new(0.5, 0.5, 0.0)));
        assert!(p.point_b.equal_eps(Vec3::new(0.5, 0.3, 0.0)));

        let tip = sphere(Vec3::new(1.6, 0.0, 0.0), 0.5);
        let patch = capsule_sphere(as_capsule(&capsule), &tip, Material::default()).expect("tip contact");
        assert!(patch.normal.equal_eps(-Vec3::X));
        assert!((patch.points[0].depth - 0.4).abs() < 1e-5);

        let far = sphere(Vec3::new(0.0, 1.1, 0.0), 0.5);
        assert!(capsule_sphere(as_capsule(&capsule), &far, Material::default()).is_none());
    }

    #[test]
    fn test_parallel_capsules_touch_along_interval() {
        let a = x_capsule(-1.0, 1.0, 0.5, Vec3::new(0.0, 0.8, 0.0));
        let b = x_capsule(0.0, 3.0, 0.5, Vec3::ZERO);

        let patch = capsule_capsule(&a, &b).expect("contact");
        assert!(patch.normal.equal_eps(Vec3::Y), "normal {:?}", patch.normal);
        assert_eq!(patch.len(), 2);

        let mut xs: Vec<f32> = patch.points.iter().map(|p| p.point_a.x).collect();
        xs.sort_by(f32::total_cmp);
        assert!((xs[0] - 0.0).abs() < 1e-3 && (xs[1] - 1.0).abs() < 1e-3, "{xs:?}");
        for p in &patch.points {
            assert!((p.depth - 0.2).abs() < 1e-3);
            assert!((p.point_a.y - 0.3).abs() < 1e-3);
            assert!((p.point_b.y - 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn test_crossing_capsules_touch_once() {
        let a = x_capsule(-1.0, 1.0, 0.5, Vec3::new(0.0, 0.3, 0.0));
        let b = placed(Shape::capsule(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0), 0.5), Vec3::ZERO);

        let patch = capsule_capsule(&a, &b).expect("contact");
        assert_eq!(patch.len(), 1);
        assert!(patch.normal.equal_eps(Vec3::Y));
        let p = patch.points[0];
        assert!((p.depth - 0.7).abs() < 1e-3);
        assert!(p.point_a.equal_eps(Vec3::new(0.0, -0.2, 0.0)));
    }

    #[test]
    fn test_upright_capsule_on_lying_capsule() {
        let a = placed(Shape::capsule(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.5), Vec3::new(0.0, 0.8, 0.0));
        let b = x_capsule(-1.0, 1.0, 0.5, Vec3::ZERO);

        let patch = capsule_capsule(&a, &b).expect("contact");
        assert_eq!(patch.len(), 1);
        let p = patch.points[0];
        assert!((p.depth - 0.2).abs() < 1e-3);
        assert!(p.point_a.equal_eps(Vec3::new(0.0, 0.3, 0.0)));
        assert!(p.point_b.equal_eps(Vec3::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn test_tilted_segments_use_nearest_tips() {
        let a = Segment::edge(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 2.0, 0.0));
        let b = Segment::edge(Vec3::new(0.0, 0.0, 0.0), Vec3::new(-1.0, -1.0, 0.0));
        let mut out = Vec::new();
        segment_contacts(&a, &b, Vec3::Y, 0.0, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].point_a, a.p0);
        assert_eq!(out[0].point_b, b.p0);
    }
}
