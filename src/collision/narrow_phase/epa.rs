use tracing::trace;

use crate::geometry::Shape;
use crate::math::{consts::EPSILON, predicates::create_normal_12, Vec3};

use super::gjk::{support, Simplex};

/// Maximum iterations for EPA algorithm
const EPA_MAX_ITERATIONS: usize = 64;

/// Maximum number of faces in the polytope
const EPA_MAX_FACES: usize = 128;

/// Result of EPA algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpaResult {
    /// Outward normal of the `A − B` face nearest the origin. Moving A by
    /// `−normal · depth` separates the cores, so the contact normal from B to
    /// A is `−normal`.
    pub normal: Vec3,
    /// Penetration depth of the cores
    pub depth: f32,
}

/// A face of the polytope
#[derive(Debug, Clone, Copy)]
struct Face {
    /// Indices of the three vertices
    indices: [usize; 3],
    /// Face normal (pointing outward)
    normal: Vec3,
    /// Distance from origin to the face
    distance: f32,
}

/// Expands the GJK simplex into the penetration normal and depth of the
/// shape cores.
///
/// Simplices with fewer than four points are first blown up into a
/// tetrahedron. When the Minkowski difference is flat (two crossing
/// segments) the plane normal is returned with zero depth, oriented so that
/// A is pushed away from B.
pub fn epa(simplex: &Simplex, shape_a: &Shape, shape_b: &Shape) -> Option<EpaResult> {
    let mut vertices: Vec<Vec3> = Vec::with_capacity(EPA_MAX_FACES);
    for &p in simplex.points() {
        if !vertices.iter().any(|v| v.distance_squared(p) < EPSILON * EPSILON) {
            vertices.push(p);
        }
    }

    if let Some(flat) = blow_up(&mut vertices, shape_a, shape_b)? {
        return Some(flat);
    }

    let mut faces: Vec<Face> = Vec::with_capacity(EPA_MAX_FACES);
    for indices in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
        if let Some(face) = create_face(&vertices, indices) {
            faces.push(face);
        }
    }
    fix_winding(&vertices, &mut faces);

    for _ in 0..EPA_MAX_ITERATIONS {
        let closest = *closest_face(&faces)?;

        let new_point = support(shape_a, shape_b, closest.normal);
        let distance = new_point.dot(closest.normal);
        if distance - closest.distance < EPSILON {
            return Some(EpaResult {
                normal: closest.normal,
                depth: closest.distance.max(0.0),
            });
        }

        let new_index = vertices.len();
        vertices.push(new_point);

        // Find and remove faces visible from the new point
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        let mut visible: Vec<usize> = Vec::new();
        for (i, face) in faces.iter().enumerate() {
            if face.normal.dot(new_point - vertices[face.indices[0]]) > 0.0 {
                visible.push(i);
                for j in 0..3 {
                    add_or_remove_edge(&mut horizon, (face.indices[j], face.indices[(j + 1) % 3]));
                }
            }
        }

        // Descending, so swap_remove never moves a face still to be removed
        for idx in visible.into_iter().rev() {
            faces.swap_remove(idx);
        }

        for (a, b) in horizon {
            if let Some(face) = create_face(&vertices, [a, b, new_index]) {
                faces.push(face);
            }
        }

        if faces.len() > EPA_MAX_FACES {
            trace!(faces = faces.len(), "epa face cap reached");
            break;
        }
    }

    let closest = closest_face(&faces)?;
    Some(EpaResult {
        normal: closest.normal,
        depth: closest.distance.max(0.0),
    })
}

fn closest_face(faces: &[Face]) -> Option<&Face> {
    faces.iter().min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Grows `vertices` to a non-degenerate tetrahedron around the origin.
///
/// Returns `Some(Some(result))` when the difference turns out flat on the
/// side of the origin, `Some(None)` once the tetrahedron is ready, and
/// `None` when no direction can be found.
fn blow_up(vertices: &mut Vec<Vec3>, shape_a: &Shape, shape_b: &Shape) -> Option<Option<EpaResult>> {
    if vertices.len() == 1 {
        let p0 = vertices[0];
        let found = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z]
            .into_iter()
            .map(|d| support(shape_a, shape_b, d))
            .find(|w| w.distance_squared(p0) > EPSILON * EPSILON);
        match found {
            Some(w) => vertices.push(w),
            None => {
                trace!("epa: minkowski difference is a point");
                return None;
            }
        }
    }

    if vertices.len() == 2 {
        let mut axis = vertices[1] - vertices[0];
        axis.normalize_len();
        let (u, v) = create_normal_12(axis);
        let base = vertices[0];
        let found = [u, -u, v, -v]
            .into_iter()
            .map(|d| support(shape_a, shape_b, d))
            .find(|w| (*w - base).cross(axis).length_squared() > EPSILON * EPSILON);
        match found {
            Some(w) => vertices.push(w),
            None => {
                trace!("epa: minkowski difference is a segment");
                return None;
            }
        }
    }

    if vertices.len() == 4 {
        let [p0, p1, p2, p3] = [vertices[0], vertices[1], vertices[2], vertices[3]];
        let volume = (p1 - p0).cross(p2 - p0).dot(p3 - p0);
        if volume.abs() > EPSILON * EPSILON {
            return Some(None);
        }
        vertices.truncate(3);
    }

    let (p0, p1, p2) = (vertices[0], vertices[1], vertices[2]);
    let normal = (p1 - p0).cross(p2 - p0).try_normalize()?;
    let offset = normal.dot(p0);

    let above = support(shape_a, shape_b, normal);
    let below = support(shape_a, shape_b, -normal);
    let height_above = normal.dot(above) - offset;
    let height_below = offset - normal.dot(below);

    match (height_above < EPSILON, height_below < EPSILON) {
        (true, true) => {
            let towards_a = shape_a.bounds().center() - shape_b.bounds().center();
            let normal = if normal.dot(towards_a) > 0.0 { -normal } else { normal };
            Some(Some(EpaResult { normal, depth: 0.0 }))
        }
        (true, false) => Some(Some(EpaResult {
            normal,
            depth: offset.max(0.0),
        })),
        (false, true) => Some(Some(EpaResult {
            normal: -normal,
            depth: (-offset).max(0.0),
        })),
        (false, false) => {
            vertices.push(if height_above >= height_below { above } else { below });
            Some(None)
        }
    }
}

/// Creates a face from three vertex indices
fn create_face(vertices: &[Vec3], indices: [usize; 3]) -> Option<Face> {
    let a = vertices[indices[0]];
    let b = vertices[indices[1]];
    let c = vertices[indices[2]];

    let normal = (b - a).cross(c - a).try_normalize()?;
    Some(Face {
        indices,
        normal,
        distance: normal.dot(a),
    })
}

/// Flips faces whose normal points towards the centroid.
fn fix_winding(vertices: &[Vec3], faces: &mut [Face]) {
    let centroid = vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v) / vertices.len() as f32;

    for face in faces.iter_mut() {
        if face.normal.dot(vertices[face.indices[0]] - centroid) < 0.0 {
            face.normal = -face.normal;
            face.distance = -face.distance;
            face.indices.swap(0, 1);
        }
    }
}

/// Adds an edge to the list, or removes it if it already exists (shared edge)
fn add_or_remove_edge(edges: &mut Vec<(usize, usize)>, edge: (usize, usize)) {
    let reverse = (edge.1, edge.0);

    if let Some(pos) = edges.iter().position(|e| *e == reverse) {
        edges.remove(pos);
    } else {
        edges.push(edge);
    }
}
