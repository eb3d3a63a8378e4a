use crate::geometry::Shape;
use crate::math::{consts::EPSILON, Vec3};

/// Maximum iterations for GJK algorithm
const GJK_MAX_ITERATIONS: usize = 64;

/// Squared length below which a simplex point counts as the origin
const GJK_CONTACT_TOLERANCE: f32 = EPSILON * EPSILON;

/// Result of a GJK query over the shape cores (radii are not applied)
#[derive(Debug, Clone)]
pub enum GjkResult {
    /// The cores overlap; the simplex encloses or touches the origin and can
    /// seed EPA
    Intersecting(Simplex),
    /// The cores are apart. `closest` is the point of `A − B` nearest the
    /// origin, so it points from B towards A and its length is the distance.
    Separated { closest: Vec3 },
}

impl GjkResult {
    /// Returns true if shapes are intersecting
    pub fn is_intersecting(&self) -> bool {
        matches!(self, GjkResult::Intersecting(_))
    }
}

/// A simplex of up to four points of the Minkowski difference `A − B`
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    points: [Vec3; 4],
    size: usize,
}

impl Simplex {
    /// Creates an empty simplex
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point to the simplex
    pub fn push(&mut self, point: Vec3) {
        debug_assert!(self.size < 4);
        self.points[self.size] = point;
        self.size += 1;
    }

    /// Removes point at index and shifts remaining points
    pub fn remove(&mut self, index: usize) {
        debug_assert!(index < self.size);
        for i in index..self.size - 1 {
            self.points[i] = self.points[i + 1];
        }
        self.size -= 1;
    }

    /// Gets point at index
    pub fn get(&self, index: usize) -> Vec3 {
        debug_assert!(index < self.size);
        self.points[index]
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.size]
    }

    fn contains(&self, point: Vec3) -> bool {
        self.points().iter().any(|p| p.distance_squared(point) < GJK_CONTACT_TOLERANCE)
    }

    /// Keeps the points whose weight is positive.
    fn retain_weighted(&mut self, weights: &[f32]) {
        for i in (0..self.size).rev() {
            if weights[i] <= 0.0 {
                self.remove(i);
            }
        }
    }
}

/// Support point of the Minkowski difference `A − B` along `direction`
#[inline]
pub fn support(shape_a: &Shape, shape_b: &Shape, direction: Vec3) -> Vec3 {
    shape_a.support(direction) - shape_b.support(-direction)
}

/// Distance GJK between the world-space cores of two shapes.
///
/// Each iteration moves `v`, the point of the current simplex nearest the
/// origin, and stops once the support along `−v` cannot get closer than the
/// engine epsilon.
pub fn gjk(shape_a: &Shape, shape_b: &Shape) -> GjkResult {
    let mut direction = shape_a.bounds().center() - shape_b.bounds().center();
    if direction.in_bound(EPSILON) {
        direction = Vec3::X;
    }

    let mut simplex = Simplex::new();
    let mut v = support(shape_a, shape_b, direction);
    simplex.push(v);

    for _ in 0..GJK_MAX_ITERATIONS {
        let v_len_sq = v.length_squared();
        if v_len_sq < GJK_CONTACT_TOLERANCE {
            return GjkResult::Intersecting(simplex);
        }

        let w = support(shape_a, shape_b, -v);
        if v_len_sq - w.dot(v) < EPSILON || simplex.contains(w) {
            return GjkResult::Separated { closest: v };
        }

        simplex.push(w);
        match closest_on_simplex(&mut simplex) {
            None => return GjkResult::Intersecting(simplex),
            Some(closest) => {
                if closest.length_squared() >= v_len_sq {
                    // No progress: numerical floor reached.
                    return GjkResult::Separated { closest: v };
                }
                v = closest;
            }
        }
    }

    GjkResult::Separated { closest: v }
}

/// Reduces the simplex to the feature nearest the origin and returns that
/// nearest point, or `None` when a tetrahedron encloses the origin.
fn closest_on_simplex(simplex: &mut Simplex) -> Option<Vec3> {
    match simplex.len() {
        1 => Some(simplex.get(0)),
        2 => Some(segment_case(simplex)),
        3 => Some(triangle_case(simplex)),
        _ => tetrahedron_case(simplex),
    }
}

fn segment_case(simplex: &mut Simplex) -> Vec3 {
    let (point, weights) = closest_point_on_segment(simplex.get(0), simplex.get(1));
    simplex.retain_weighted(&weights);
    point
}

fn triangle_case(simplex: &mut Simplex) -> Vec3 {
    let (point, weights) = closest_point_on_triangle(simplex.get(0), simplex.get(1), simplex.get(2));
    simplex.retain_weighted(&weights);
    point
}

fn tetrahedron_case(simplex: &mut Simplex) -> Option<Vec3> {
    const FACES: [([usize; 3], usize); 4] = [([0, 1, 2], 3), ([0, 3, 1], 2), ([0, 2, 3], 1), ([1, 3, 2], 0)];

    let p = [simplex.get(0), simplex.get(1), simplex.get(2), simplex.get(3)];
    let volume = (p[1] - p[0]).cross(p[2] - p[0]).dot(p[3] - p[0]);
    let degenerate = volume.abs() < GJK_CONTACT_TOLERANCE;

    let mut best: Option<(f32, Vec3, [f32; 4])> = None;
    for (face, opposite) in FACES {
        let [i, j, k] = face;
        if !degenerate {
            let normal = (p[j] - p[i]).cross(p[k] - p[i]);
            let origin_side = -p[i].dot(normal);
            let opposite_side = (p[opposite] - p[i]).dot(normal);
            if origin_side * opposite_side >= 0.0 {
                continue;
            }
        }

        let (point, bary) = closest_point_on_triangle(p[i], p[j], p[k]);
        let dist = point.length_squared();
        if best.map_or(true, |(d, _, _)| dist < d) {
            let mut weights = [0.0; 4];
            weights[i] = bary[0];
            weights[j] = bary[1];
            weights[k] = bary[2];
            best = Some((dist, point, weights));
        }
    }

    let (_, point, weights) = best?;
    simplex.retain_weighted(&weights);
    Some(point)
}

/// Closest point on segment `ab` to the origin and the weights of `a`, `b`
fn closest_point_on_segment(a: Vec3, b: Vec3) -> (Vec3, [f32; 2]) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < GJK_CONTACT_TOLERANCE {
        return (b, [0.0, 1.0]);
    }
    let t = -a.dot(ab) / len_sq;
    if t <= 0.0 {
        (a, [1.0, 0.0])
    } else if t >= 1.0 {
        (b, [0.0, 1.0])
    } else {
        (a + ab * t, [1.0 - t, t])
    }
}

/// Finds the closest point on a triangle to the origin
/// Returns (closest_point, barycentric_coordinates)
fn closest_point_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> (Vec3, [f32; 3]) {
    let ab = b - a;
    let ac = c - a;

    if ab.cross(ac).length_squared() < GJK_CONTACT_TOLERANCE * GJK_CONTACT_TOLERANCE {
        return closest_on_degenerate_triangle(a, b, c);
    }

    let ao = -a;
    let d1 = ab.dot(ao);
    let d2 = ac.dot(ao);

    // Vertex region A
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, [1.0, 0.0, 0.0]);
    }

    let bo = -b;
    let d3 = ab.dot(bo);
    let d4 = ac.dot(bo);

    // Vertex region B
    if d3 >= 0.0 && d4 <= d3 {
        return (b, [0.0, 1.0, 0.0]);
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let co = -c;
    let d5 = ab.dot(co);
    let d6 = ac.dot(co);

    // Vertex region C
    if d6 >= 0.0 && d5 <= d6 {
        return (c, [0.0, 0.0, 1.0]);
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    // Inside triangle
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

/// Collinear triangle: best of its three edges.
fn closest_on_degenerate_triangle(a: Vec3, b: Vec3, c: Vec3) -> (Vec3, [f32; 3]) {
    let candidates = [
        (closest_point_on_segment(a, b), [0, 1]),
        (closest_point_on_segment(b, c), [1, 2]),
        (closest_point_on_segment(a, c), [0, 2]),
    ];
    let mut best = (Vec3::ZERO, [0.0; 3]);
    let mut best_dist = f32::INFINITY;
    for ((point, w), [i, j]) in candidates {
        let dist = point.length_squared();
        if dist < best_dist {
            best_dist = dist;
            best.0 = point;
            best.1 = [0.0; 3];
            best.1[i] = w[0];
            best.1[j] = w[1];
        }
    }
    best
}
