//! Contacts against convex hulls.
//!
//! Every pair runs through GJK/EPA first for the normal. The contact points
//! are then rebuilt from the hull's reference face: the polygon whose
//! outward normal is best aligned with the direction towards the other shape.

use crate::collision::contact::{ContactPatch, ContactPoint};
use crate::geometry::{Capsule, Hull, Polygon, Shape};
use crate::math::consts::{EPSILON, MAX_CANDIDATE_POINTS, MAX_CONTACT_POINTS};
use crate::math::predicates::{create_normal_12, lines_on_plane, project_to_plane, vertex_in_polygon};
use crate::math::Vec3;

use super::penetration;
use super::primitives::{segment_contacts, Segment};

/// Hull A against sphere B.
pub fn hull_sphere(shape_a: &Shape, shape_b: &Shape) -> Option<ContactPatch> {
    let Shape::Sphere(sphere) = shape_b else {
        return None;
    };
    let (normal, depth) = penetration(shape_a, shape_b)?;

    let mut patch = ContactPatch::new(normal, shape_a.material().mixed(&shape_b.material()));
    let point_b = sphere.center() + normal * sphere.radius();
    patch.push(point_b - normal * depth, point_b, depth);
    Some(patch)
}

/// Hull A against capsule B.
pub fn hull_capsule(shape_a: &Shape, shape_b: &Shape) -> Option<ContactPatch> {
    let (Shape::Hull(hull), Shape::Capsule(capsule)) = (shape_a, shape_b) else {
        return None;
    };
    let (normal, depth) = penetration(shape_a, shape_b)?;
    let mut patch = ContactPatch::new(normal, shape_a.material().mixed(&shape_b.material()));

    let towards_b = -normal;
    let face = reference_face(hull, towards_b)?;
    let face_normal = hull.world_normal(face);
    let polygon = &hull.polygons()[face];

    if (1.0 - face_normal.dot(towards_b)).abs() < EPSILON {
        patch.normal = -face_normal;
        face_capsule_contacts(hull, polygon, face_normal, capsule, &mut patch.points);
    } else {
        let (v0, v1) = leading_edge(hull.vertices(), polygon, towards_b)?;
        segment_contacts(
            &Segment::edge(v0, v1),
            &Segment::of_capsule(capsule),
            normal,
            depth,
            &mut patch.points,
        );
    }
    Some(patch)
}

/// Hull A against hull B.
pub fn hull_hull(shape_a: &Shape, shape_b: &Shape) -> Option<ContactPatch> {
    let (Shape::Hull(hull_a), Shape::Hull(hull_b)) = (shape_a, shape_b) else {
        return None;
    };
    let (normal, _) = penetration(shape_a, shape_b)?;

    let face_a = reference_face(hull_a, -normal)?;
    let face_b = reference_face(hull_b, normal)?;
    let clip = ClipFaces {
        vertices_a: hull_a.vertices(),
        polygon_a: &hull_a.polygons()[face_a],
        normal_a: hull_a.world_normal(face_a),
        vertices_b: hull_b.vertices(),
        polygon_b: &hull_b.polygons()[face_b],
        normal_b: hull_b.world_normal(face_b),
        normal,
    };

    let mut patch = ContactPatch::new(normal, shape_a.material().mixed(&shape_b.material()));
    patch.points = reduce_candidates(clip.candidates(), normal);
    Some(patch)
}

/// Index of the polygon whose world normal is most aligned with `direction`.
pub(crate) fn reference_face(hull: &Hull, direction: Vec3) -> Option<usize> {
    (0..hull.polygons().len()).max_by(|&i, &j| {
        hull.world_normal(i)
            .dot(direction)
            .total_cmp(&hull.world_normal(j).dot(direction))
    })
}

/// The two polygon vertices reaching furthest along `direction`.
fn leading_edge(vertices: &[Vec3], polygon: &Polygon, direction: Vec3) -> Option<(Vec3, Vec3)> {
    let mut first: Option<(f32, Vec3)> = None;
    let mut second: Option<(f32, Vec3)> = None;
    for &i in polygon.indices() {
        let v = vertices[i];
        let d = v.dot(direction);
        match first {
            Some((best, _)) if d <= best => {
                if second.map_or(true, |(s, _)| d > s) {
                    second = Some((d, v));
                }
            }
            _ => {
                second = first;
                first = Some((d, v));
            }
        }
    }
    Some((first?.1, second?.1))
}

/// Capsule lying flat on a hull face: endpoints above the face, then the
/// crossings of the projected segment with the face boundary, two points at
/// most.
fn face_capsule_contacts(hull: &Hull, polygon: &Polygon, face_normal: Vec3, capsule: &Capsule, out: &mut Vec<ContactPoint>) {
    let vertices = hull.vertices();
    let indices = polygon.indices();
    let radius = capsule.radius();
    let base = vertices[indices[0]];
    let ends = capsule.vertices();

    let mut count = 0;
    for end in ends {
        let height = (end - base).dot(face_normal);
        if height <= radius && vertex_in_polygon(end, vertices, indices, face_normal) {
            out.push(ContactPoint::new(
                end - face_normal * height,
                end - face_normal * radius,
                radius - height,
            ));
            count += 1;
        }
    }
    if count >= 2 {
        return;
    }

    let p1 = project_to_plane(face_normal, base, ends[0]);
    let p2 = project_to_plane(face_normal, base, ends[1]);
    for j in 0..indices.len() {
        let e0 = vertices[indices[j]];
        let e1 = vertices[indices[(j + 1) % indices.len()]];
        let Some((point, t, _)) = lines_on_plane(p1, p2, e0, e1, face_normal) else {
            continue;
        };
        let core = ends[0] + (ends[1] - ends[0]) * t;
        let height = (core - point).dot(face_normal);
        if height <= radius {
            out.push(ContactPoint::new(point, core - face_normal * radius, radius - height));
            count += 1;
            if count >= 2 {
                break;
            }
        }
    }
}

/// Reference faces of two overlapping hulls.
struct ClipFaces<'a> {
    vertices_a: &'a [Vec3],
    polygon_a: &'a Polygon,
    normal_a: Vec3,
    vertices_b: &'a [Vec3],
    polygon_b: &'a Polygon,
    normal_b: Vec3,
    /// Contact normal from B to A
    normal: Vec3,
}

impl ClipFaces<'_> {
    /// Candidate points from clipping face A against face B in the plane
    /// orthogonal to the contact normal.
    ///
    /// Three sources: crossings of the edges of A (projected onto B's
    /// plane) with the edges of B, vertices of A inside B, vertices of B
    /// inside A. Points above the opposing face are discarded.
    fn candidates(&self) -> Vec<ContactPoint> {
        let mut out = Vec::new();
        let n = self.normal;
        let idx_a = self.polygon_a.indices();
        let idx_b = self.polygon_b.indices();
        let plane_a = extreme_vertex(self.vertices_a, idx_a, -n);
        let plane_b = extreme_vertex(self.vertices_b, idx_b, n);

        let mut prev = self.vertices_a[idx_a[idx_a.len() - 1]];
        let mut prev_projected = project_to_plane(n, plane_b, prev);
        for &i in idx_a {
            let current = self.vertices_a[i];
            let projected = project_to_plane(n, plane_b, current);
            for j in 0..idx_b.len() {
                let b0 = self.vertices_b[idx_b[j]];
                let b1 = self.vertices_b[idx_b[(j + 1) % idx_b.len()]];
                if let Some((on_b, t, _)) = lines_on_plane(prev_projected, projected, b0, b1, n) {
                    let on_a = prev + (current - prev) * t;
                    let height = (on_a - plane_b).dot(self.normal_b);
                    if height <= 0.0 {
                        push_candidate(&mut out, on_a, on_b, (height * self.normal_b.dot(n)).abs());
                    }
                }
            }
            prev = current;
            prev_projected = projected;
        }

        for &i in idx_a {
            let v = self.vertices_a[i];
            let height = (v - plane_b).dot(self.normal_b);
            if height <= 0.0 && inside_or_on(v, self.vertices_b, idx_b, self.normal_b) {
                let on_b = v - self.normal_b * height;
                push_candidate(&mut out, v, on_b, (height * self.normal_b.dot(n)).abs());
            }
        }

        for &i in idx_b {
            let v = self.vertices_b[i];
            let height = (v - plane_a).dot(self.normal_a);
            if height <= 0.0 && inside_or_on(v, self.vertices_a, idx_a, self.normal_a) {
                let on_a = v - self.normal_a * height;
                push_candidate(&mut out, on_a, v, (height * self.normal_a.dot(n)).abs());
            }
        }
        out
    }
}

fn extreme_vertex(vertices: &[Vec3], indices: &[usize], direction: Vec3) -> Vec3 {
    indices
        .iter()
        .map(|&i| vertices[i])
        .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
        .unwrap_or(Vec3::ZERO)
}

/// Point-in-polygon test that also accepts points on the boundary, so that
/// faces of equal size stacked exactly keep their corners.
fn inside_or_on(p: Vec3, vertices: &[Vec3], indices: &[usize], normal: Vec3) -> bool {
    let count = indices.len();
    (0..count).all(|j| {
        let vj = vertices[indices[j]];
        let vn = vertices[indices[(j + 1) % count]];
        (p - vj).dot((vn - vj).cross(normal)) <= EPSILON
    })
}

/// Appends a candidate unless one already sits at the same spot.
fn push_candidate(out: &mut Vec<ContactPoint>, point_a: Vec3, point_b: Vec3, depth: f32) {
    if out.len() >= MAX_CANDIDATE_POINTS {
        return;
    }
    let candidate = ContactPoint::new(point_a, point_b, depth);
    let mid = candidate.midpoint();
    if out.iter().any(|c| c.midpoint().distance_squared(mid) < EPSILON) {
        return;
    }
    out.push(candidate);
}

/// Keeps at most four candidates: the extremes along two directions spanning
/// the contact plane.
pub fn reduce_candidates(candidates: Vec<ContactPoint>, normal: Vec3) -> Vec<ContactPoint> {
    if candidates.len() <= MAX_CONTACT_POINTS {
        return candidates;
    }

    let (u, v) = create_normal_12(normal);
    let mut picks = [0usize; 4];
    let mut extremes = [f32::NEG_INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::INFINITY];
    for (i, c) in candidates.iter().enumerate() {
        let mid = c.midpoint();
        let (du, dv) = (mid.dot(u), mid.dot(v));
        if du > extremes[0] {
            extremes[0] = du;
            picks[0] = i;
        }
        if du < extremes[1] {
            extremes[1] = du;
            picks[1] = i;
        }
        if dv > extremes[2] {
            extremes[2] = dv;
            picks[2] = i;
        }
        if dv < extremes[3] {
            extremes[3] = dv;
            picks[3] = i;
        }
    }

    let mut reduced = Vec::with_capacity(MAX_CONTACT_POINTS);
    for (k, &i) in picks.iter().enumerate() {
        if !picks[..k].contains(&i) {
            reduced.push(candidates[i]);
        }
    }
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::RotationBasis;

    fn placed(mut shape: Shape, position: Vec3, rotation: RotationBasis) -> Shape {
        shape.update(position, &rotation);
        shape
    }

    fn ground() -> Shape {
        placed(Shape::cuboid(Vec3::ONE), Vec3::new(0.0, 0.0, -1.0), RotationBasis::IDENTITY)
    }

    #[test]
    fn test_cube_resting_on_ground_has_four_corners() {
        let cube = placed(Shape::cuboid(Vec3::splat(0.5)), Vec3::new(0.1, -0.2, 0.45), RotationBasis::IDENTITY);

        let patch = hull_hull(&cube, &ground()).expect("contact");
        assert!(patch.normal.equal_eps(Vec3::Z), "normal {:?}", patch.normal);
        assert_eq!(patch.len(), 4);
        for p in &patch.points {
            assert!((p.depth - 0.05).abs() < 1e-3, "depth {}", p.depth);
            assert!((p.point_a.z + 0.05).abs() < 1e-3);
            assert!(p.point_b.z.abs() < 1e-3);
        }
    }

    #[test]
    fn test_equal_cubes_stacked_keep_corners() {
        let lower = placed(Shape::cuboid(Vec3::splat(0.5)), Vec3::new(0.0, 0.0, 0.5), RotationBasis::IDENTITY);
        let upper = placed(Shape::cuboid(Vec3::splat(0.5)), Vec3::new(0.0, 0.0, 1.48), RotationBasis::IDENTITY);

        let patch = hull_hull(&upper, &lower).expect("contact");
        assert!(patch.normal.equal_eps(Vec3::Z));
        assert_eq!(patch.len(), 4);
        assert!(patch.points.iter().all(|p| (p.depth - 0.02).abs() < 1e-3));
    }

    #[test]
    fn test_separated_hulls_do_not_touch() {
        let cube = placed(Shape::cuboid(Vec3::splat(0.5)), Vec3::new(0.0, 0.0, 0.6), RotationBasis::IDENTITY);
        assert!(hull_hull(&cube, &ground()).is_none());
    }

    #[test]
    fn test_sphere_on_hull() {
        let ball = placed(Shape::sphere(Vec3::ZERO, 1.0), Vec3::new(0.3, 0.2, 0.9), RotationBasis::IDENTITY);

        let patch = hull_sphere(&ground(), &ball).expect("contact");
        assert!(patch.normal.equal_eps(-Vec3::Z));
        let p = patch.points[0];
        assert!((p.depth - 0.1).abs() < 1e-3);
        assert!(p.point_b.equal_eps(Vec3::new(0.3, 0.2, -0.1)));
        assert!(p.point_a.equal_eps(Vec3::new(0.3, 0.2, 0.0)));
    }

    #[test]
    fn test_capsule_lying_on_face() {
        let capsule = placed(
            Shape::capsule(Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0), 0.5),
            Vec3::new(0.0, 0.0, 0.45),
            RotationBasis::IDENTITY,
        );

        let patch = hull_capsule(&ground(), &capsule).expect("contact");
        assert!(patch.normal.equal_eps(-Vec3::Z));
        assert_eq!(patch.len(), 2);
        for p in &patch.points {
            assert!((p.depth - 0.05).abs() < 1e-3);
            assert!(p.point_a.z.abs() < 1e-3);
            assert!((p.point_b.z + 0.05).abs() < 1e-3);
        }
    }

    #[test]
    fn test_capsule_overhanging_face_is_clipped_at_edge() {
        let capsule = placed(
            Shape::capsule(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), 0.5),
            Vec3::new(0.0, 0.0, 0.45),
            RotationBasis::IDENTITY,
        );

        let patch = hull_capsule(&ground(), &capsule).expect("contact");
        assert_eq!(patch.len(), 2);
        let mut xs: Vec<f32> = patch.points.iter().map(|p| p.point_a.x).collect();
        xs.sort_by(f32::total_cmp);
        assert!(xs[0].abs() < 1e-3 && (xs[1] - 1.0).abs() < 1e-3, "{xs:?}");
    }

    #[test]
    fn test_reduce_keeps_extremes() {
        let normal = Vec3::Z;
        let (u, v) = create_normal_12(normal);
        let mut candidates = Vec::new();
        for i in 0..8 {
            let angle = i as f32 * std::f32::consts::FRAC_PI_4;
            let p = u * angle.cos() + v * angle.sin();
            candidates.push(ContactPoint::new(p, p, 0.1));
        }
        let center = ContactPoint::new(Vec3::ZERO, Vec3::ZERO, 0.3);
        candidates.push(center);

        let reduced = reduce_candidates(candidates, normal);
        assert_eq!(reduced.len(), 4);
        assert!(!reduced.contains(&center));
    }

    #[test]
    fn test_reduce_passes_small_sets_through() {
        let points = vec![ContactPoint::new(Vec3::X, Vec3::X, 0.1); 3];
        assert_eq!(reduce_candidates(points.clone(), Vec3::Z), points);
    }
}
