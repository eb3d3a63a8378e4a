//! Small geometric predicates shared by the narrow phase.

use super::consts::EPSILON;
use super::vec3::Vec3;

/// Orthogonal projection of `p` onto the plane through `p0` with unit normal `n`.
#[inline]
pub fn project_to_plane(n: Vec3, p0: Vec3, p: Vec3) -> Vec3 {
    p - n * (p - p0).dot(n)
}

/// Orthogonal projection of `p` onto the line through `p0` with unit direction `dir`.
#[inline]
pub fn project_to_line(dir: Vec3, p0: Vec3, p: Vec3) -> Vec3 {
    p0 + dir * (p - p0).dot(dir)
}

/// Rotates `v` about the unit axis `axis` by `angle` radians (Rodrigues).
#[inline]
pub fn rotate_around_vector(v: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let along = axis * axis.dot(v);
    let radial = v - along;
    let tangent = axis.cross(radial);
    let (s, c) = angle.sin_cos();
    radial * c + tangent * s + along
}

/// Intersects the ray `ray_point + t * ray_dir` with a plane.
///
/// Returns the hit point and `t`, or `None` when the ray is parallel to the plane.
pub fn plane_ray(plane_normal: Vec3, plane_point: Vec3, ray_point: Vec3, ray_dir: Vec3) -> Option<(Vec3, f32)> {
    let denom = ray_dir.dot(plane_normal);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = -(ray_point - plane_point).dot(plane_normal) / denom;
    Some((ray_point + ray_dir * t, t))
}

/// Intersects segment `a1→a2` with segment `b1→b2`, both lying (approximately)
/// in a plane with normal `n`.
///
/// On success returns the crossing point on segment A and the parameters
/// `t_a`, `t_b` in `[0, 1]` along each segment.
pub fn lines_on_plane(a1: Vec3, a2: Vec3, b1: Vec3, b2: Vec3, n: Vec3) -> Option<(Vec3, f32, f32)> {
    let dir_a = a2 - a1;
    let dir_b = b2 - b1;
    let len_b_sq = dir_b.length_squared();
    if dir_a.length_squared() <= EPSILON || len_b_sq <= EPSILON {
        return None;
    }

    // Plane that contains segment B and the shared normal.
    let cut = dir_b.cross(n).try_normalize()?;
    let denom = dir_a.dot(cut);
    if denom.abs() < EPSILON * dir_a.length() {
        return None;
    }
    let t_a = -(a1 - b1).dot(cut) / denom;
    if !(0.0..=1.0).contains(&t_a) {
        return None;
    }
    let point = a1 + dir_a * t_a;

    let t_b = (point - b1).dot(dir_b) / len_b_sq;
    if !(0.0..=1.0).contains(&t_b) {
        return None;
    }
    Some((point, t_a, t_b))
}

/// Deterministic pair of unit vectors spanning the plane orthogonal to `n`.
pub fn create_normal_12(n: Vec3) -> (Vec3, Vec3) {
    let seed = if Vec3::new(1.0, 0.0, 2.0).is_colinear(n) {
        Vec3::new(2.0, 0.0, -1.0)
    } else {
        Vec3::new(1.0, 0.0, 2.0)
    };
    let u = n.cross(seed).normalize();
    let v = n.cross(u).normalize();
    (u, v)
}

/// Strict point-in-convex-polygon test for a point lying on the polygon plane.
///
/// `indices` walks the polygon counter-clockwise around `normal`; points on an
/// edge (within [`EPSILON`]) count as outside.
pub fn vertex_in_polygon(p: Vec3, vertices: &[Vec3], indices: &[usize], normal: Vec3) -> bool {
    let count = indices.len();
    (0..count).all(|j| {
        let vj = vertices[indices[j]];
        let vn = vertices[indices[(j + 1) % count]];
        (p - vj).dot((vn - vj).cross(normal)) < -EPSILON
    })
}
