use crate::error::{PhysicsError, Result};
use crate::math::{consts::EPSILON, RotationBasis, Vec3};

use super::aabb::Aabb;
use super::material::Material;

/// The type of collision shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Sphere,
    Capsule,
    Hull,
}

/// A convex collision shape owned by a body.
///
/// Every variant keeps its vertices in body-local space and a world-space copy
/// refreshed by [`Shape::update`], plus the world bounds of the swept radius.
#[derive(Debug, Clone)]
pub enum Shape {
    /// A sphere around one local center
    Sphere(Sphere),
    /// A segment swept by a radius
    Capsule(Capsule),
    /// A convex polyhedron with explicit faces
    Hull(Hull),
}

impl Shape {
    /// Creates a sphere shape
    #[inline]
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere(Sphere::new(center, radius))
    }

    /// Creates a capsule between two local endpoints
    #[inline]
    pub fn capsule(a: Vec3, b: Vec3, radius: f32) -> Self {
        Self::Capsule(Capsule::new(a, b, radius))
    }

    /// Creates a box hull with the given half extents
    #[inline]
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Hull(Hull::cuboid(half_extents))
    }

    /// Returns the shape type
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Sphere(_) => ShapeType::Sphere,
            Shape::Capsule(_) => ShapeType::Capsule,
            Shape::Hull(_) => ShapeType::Hull,
        }
    }

    /// Radius swept around the vertices (zero for hulls)
    #[inline]
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Sphere(s) => s.radius,
            Shape::Capsule(c) => c.radius,
            Shape::Hull(_) => 0.0,
        }
    }

    #[inline]
    pub fn material(&self) -> Material {
        match self {
            Shape::Sphere(s) => s.material,
            Shape::Capsule(c) => c.material,
            Shape::Hull(h) => h.material,
        }
    }

    pub fn set_material(&mut self, material: Material) {
        match self {
            Shape::Sphere(s) => s.material = material,
            Shape::Capsule(c) => c.material = material,
            Shape::Hull(h) => h.material = material,
        }
    }

    /// World-space bounds as of the last [`Shape::update`]
    #[inline]
    pub fn bounds(&self) -> Aabb {
        match self {
            Shape::Sphere(s) => s.bounds,
            Shape::Capsule(c) => c.bounds,
            Shape::Hull(h) => h.bounds,
        }
    }

    /// Body-local bounds including the radius
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.local_vertices()).expand(self.radius())
    }

    /// Body-local vertices
    #[inline]
    pub fn local_vertices(&self) -> &[Vec3] {
        match self {
            Shape::Sphere(s) => std::slice::from_ref(&s.local_center),
            Shape::Capsule(c) => &c.local,
            Shape::Hull(h) => &h.local_vertices,
        }
    }

    /// World-space vertices as of the last [`Shape::update`]
    #[inline]
    pub fn world_vertices(&self) -> &[Vec3] {
        match self {
            Shape::Sphere(s) => std::slice::from_ref(&s.center),
            Shape::Capsule(c) => &c.world,
            Shape::Hull(h) => &h.vertices,
        }
    }

    /// World vertex furthest along `direction`. Radii are not applied.
    #[inline]
    pub fn support(&self, direction: Vec3) -> Vec3 {
        furthest(self.world_vertices(), direction)
    }

    /// Local vertex furthest along the local `direction`.
    #[inline]
    pub fn support_local(&self, direction: Vec3) -> Vec3 {
        furthest(self.local_vertices(), direction)
    }

    /// Refreshes world vertices and bounds from the owning body's pose.
    pub fn update(&mut self, position: Vec3, rotation: &RotationBasis) {
        match self {
            Shape::Sphere(s) => s.update(position, rotation),
            Shape::Capsule(c) => c.update(position, rotation),
            Shape::Hull(h) => h.update(position, rotation),
        }
    }
}

impl From<Sphere> for Shape {
    fn from(s: Sphere) -> Self {
        Shape::Sphere(s)
    }
}

impl From<Capsule> for Shape {
    fn from(c: Capsule) -> Self {
        Shape::Capsule(c)
    }
}

impl From<Hull> for Shape {
    fn from(h: Hull) -> Self {
        Shape::Hull(h)
    }
}

fn furthest(points: &[Vec3], direction: Vec3) -> Vec3 {
    let mut best = Vec3::ZERO;
    let mut best_dot = f32::NEG_INFINITY;
    for &p in points {
        let d = p.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = p;
        }
    }
    best
}

/// A sphere collision shape
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    local_center: Vec3,
    center: Vec3,
    radius: f32,
    material: Material,
    bounds: Aabb,
}

impl Default for Sphere {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 1.0)
    }
}

impl Sphere {
    pub fn new(local_center: Vec3, radius: f32) -> Self {
        Self {
            local_center,
            center: local_center,
            radius,
            material: Material::default(),
            bounds: Aabb::new(local_center, local_center).expand(radius),
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.bounds = Aabb::new(self.center, self.center).expand(radius);
    }

    #[inline]
    pub fn local_center(&self) -> Vec3 {
        self.local_center
    }

    pub fn set_local_center(&mut self, local_center: Vec3) {
        self.local_center = local_center;
    }

    /// World-space center
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    fn update(&mut self, position: Vec3, rotation: &RotationBasis) {
        self.center = position + rotation.to_world(self.local_center);
        self.bounds = Aabb::new(self.center, self.center).expand(self.radius);
    }
}

/// A capsule: the set of points within `radius` of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    local: [Vec3; 2],
    world: [Vec3; 2],
    radius: f32,
    local_dir: Vec3,
    dir: Vec3,
    length: f32,
    material: Material,
    bounds: Aabb,
}

impl Default for Capsule {
    fn default() -> Self {
        Self::with_length(2.0, 1.0)
    }
}

impl Capsule {
    pub fn new(a: Vec3, b: Vec3, radius: f32) -> Self {
        let mut capsule = Self {
            local: [a, b],
            world: [a, b],
            radius,
            local_dir: Vec3::ZERO,
            dir: Vec3::ZERO,
            length: 0.0,
            material: Material::default(),
            bounds: Aabb::EMPTY,
        };
        capsule.refresh_dir();
        capsule.update(Vec3::ZERO, &RotationBasis::IDENTITY);
        capsule
    }

    /// Capsule centered on the local origin, its segment along local Z.
    pub fn with_length(length: f32, radius: f32) -> Self {
        let half = Vec3::new(0.0, 0.0, length * 0.5);
        Self::new(-half, half, radius)
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    pub fn set_local_vertices(&mut self, a: Vec3, b: Vec3) {
        self.local = [a, b];
        self.refresh_dir();
    }

    #[inline]
    pub fn local_vertices(&self) -> [Vec3; 2] {
        self.local
    }

    /// World-space segment endpoints
    #[inline]
    pub fn vertices(&self) -> [Vec3; 2] {
        self.world
    }

    #[inline]
    pub fn local_dir(&self) -> Vec3 {
        self.local_dir
    }

    /// World-space unit direction from the first endpoint to the second
    #[inline]
    pub fn dir(&self) -> Vec3 {
        self.dir
    }

    /// Segment length (without the caps)
    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    fn refresh_dir(&mut self) {
        let mut dir = self.local[1] - self.local[0];
        self.length = dir.normalize_len();
        self.local_dir = dir;
    }

    fn update(&mut self, position: Vec3, rotation: &RotationBasis) {
        self.world = self.local.map(|v| position + rotation.to_world(v));
        self.dir = rotation.to_world(self.local_dir);
        self.bounds = Aabb::from_points(&self.world).expand(self.radius);
    }
}

/// A planar convex face of a hull.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    indices: Vec<usize>,
    normal: Vec3,
}

impl Polygon {
    /// `indices` must run counter-clockwise around the outward `normal`
    /// (body-local).
    pub fn new(indices: Vec<usize>, normal: Vec3) -> Self {
        Self {
            indices,
            normal: normal.normalize(),
        }
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Outward unit normal in body-local space
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

/// A convex polyhedron.
#[derive(Debug, Clone, PartialEq)]
pub struct Hull {
    local_vertices: Vec<Vec3>,
    vertices: Vec<Vec3>,
    polygons: Vec<Polygon>,
    /// World-space polygon normals, indexed like `polygons`
    normals: Vec<Vec3>,
    material: Material,
    bounds: Aabb,
}

impl Hull {
    /// Builds a hull from vertices and faces with explicit normals.
    ///
    /// Fails when a face has fewer than three vertices or indexes past the
    /// vertex list. Convexity and winding are the caller's responsibility.
    pub fn new(vertices: Vec<Vec3>, polygons: Vec<Polygon>) -> Result<Self> {
        for (i, polygon) in polygons.iter().enumerate() {
            if polygon.indices.len() < 3 {
                return Err(PhysicsError::InvalidPolygon {
                    polygon: i,
                    vertex: polygon.indices.len(),
                    count: vertices.len(),
                });
            }
            if let Some(&bad) = polygon.indices.iter().find(|&&v| v >= vertices.len()) {
                return Err(PhysicsError::InvalidPolygon {
                    polygon: i,
                    vertex: bad,
                    count: vertices.len(),
                });
            }
        }

        let bounds = Aabb::from_points(&vertices);
        Ok(Self {
            vertices: vertices.clone(),
            local_vertices: vertices,
            normals: polygons.iter().map(|p| p.normal).collect(),
            polygons,
            material: Material::default(),
            bounds,
        })
    }

    /// Builds a hull from counter-clockwise faces, deriving each face normal
    /// from its winding.
    pub fn from_faces(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> Result<Self> {
        let polygons = faces
            .into_iter()
            .map(|indices| Polygon {
                indices,
                normal: Vec3::ZERO,
            })
            .collect();
        let mut hull = Self::new(vertices, polygons)?;
        hull.refresh_normals();
        Ok(hull)
    }

    /// Axis-aligned box with corners at `±half_extents`.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let vertices: Vec<Vec3> = (0..8)
            .map(|i| {
                let sign = |bit: usize| if i & bit != 0 { 1.0 } else { -1.0 };
                Vec3::new(sign(1), sign(2), sign(4)).component_mul(half_extents)
            })
            .collect();
        let faces = [
            ([0, 4, 6, 2], -Vec3::X),
            ([1, 3, 7, 5], Vec3::X),
            ([0, 1, 5, 4], -Vec3::Y),
            ([2, 6, 7, 3], Vec3::Y),
            ([0, 2, 3, 1], -Vec3::Z),
            ([4, 5, 7, 6], Vec3::Z),
        ];
        let polygons: Vec<Polygon> = faces
            .into_iter()
            .map(|(indices, normal)| Polygon::new(indices.to_vec(), normal))
            .collect();

        let bounds = Aabb::from_points(&vertices);
        Self {
            vertices: vertices.clone(),
            local_vertices: vertices,
            normals: polygons.iter().map(|p| p.normal).collect(),
            polygons,
            material: Material::default(),
            bounds,
        }
    }

    #[inline]
    pub fn local_vertices(&self) -> &[Vec3] {
        &self.local_vertices
    }

    /// World-space vertices
    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// World-space outward normal of polygon `i`
    #[inline]
    pub fn world_normal(&self, i: usize) -> Vec3 {
        self.normals[i]
    }

    /// Replaces one local vertex. Face normals are left untouched.
    pub fn set_local_vertex(&mut self, i: usize, vertex: Vec3) {
        if let Some(v) = self.local_vertices.get_mut(i) {
            *v = vertex;
        }
    }

    /// Shifts every local vertex by `offset`.
    pub fn translate_local(&mut self, offset: Vec3) {
        for v in &mut self.local_vertices {
            *v += offset;
        }
    }

    /// Scales local vertices componentwise and recomputes face normals.
    pub fn scale_local(&mut self, scale: Vec3) {
        for v in &mut self.local_vertices {
            *v = v.component_mul(scale);
        }
        self.refresh_normals();
    }

    /// Newell normals from the current local vertices.
    fn refresh_normals(&mut self) {
        for polygon in &mut self.polygons {
            let mut n = Vec3::ZERO;
            let count = polygon.indices.len();
            for j in 0..count {
                let a = self.local_vertices[polygon.indices[j]];
                let b = self.local_vertices[polygon.indices[(j + 1) % count]];
                n += Vec3::new(
                    (a.y - b.y) * (a.z + b.z),
                    (a.z - b.z) * (a.x + b.x),
                    (a.x - b.x) * (a.y + b.y),
                );
            }
            if n.length() > EPSILON * EPSILON {
                polygon.normal = n / n.length();
            }
        }
        self.normals = self.polygons.iter().map(|p| p.normal).collect();
    }

    fn update(&mut self, position: Vec3, rotation: &RotationBasis) {
        self.vertices.clear();
        self.vertices
            .extend(self.local_vertices.iter().map(|&v| position + rotation.to_world(v)));
        for (world, polygon) in self.normals.iter_mut().zip(&self.polygons) {
            *world = rotation.to_world(polygon.normal);
        }
        self.bounds = Aabb::from_points(&self.vertices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_bounds_follow_pose() {
        let mut shape = Shape::sphere(Vec3::new(1.0, 0.0, 0.0), 0.5);
        let rot = RotationBasis::from_euler_degrees(Vec3::new(0.0, 0.0, 90.0));
        shape.update(Vec3::new(0.0, 0.0, 3.0), &rot);

        let center = shape.world_vertices()[0];
        assert!(center.equal_eps(Vec3::new(0.0, 1.0, 3.0)));
        assert!(shape.bounds().min.equal_eps(Vec3::new(-0.5, 0.5, 2.5)));
        assert!(shape.bounds().max.equal_eps(Vec3::new(0.5, 1.5, 3.5)));
    }

    #[test]
    fn test_capsule_direction_and_length() {
        let mut capsule = Capsule::with_length(2.0, 0.5);
        assert!((capsule.length() - 2.0).abs() < 1e-6);
        assert!(capsule.local_dir().equal_eps(Vec3::Z));

        let rot = RotationBasis::from_euler_degrees(Vec3::new(0.0, 90.0, 0.0));
        capsule.update(Vec3::ZERO, &rot);
        assert!(capsule.dir().equal_eps(Vec3::X));
        assert!(capsule.vertices()[1].equal_eps(Vec3::X));
        assert!(capsule.bounds.min.equal_eps(Vec3::new(-1.5, -0.5, -0.5)));
    }

    #[test]
    fn test_support_picks_furthest_vertex() {
        let mut shape = Shape::cuboid(Vec3::new(1.0, 2.0, 3.0));
        shape.update(Vec3::ZERO, &RotationBasis::IDENTITY);
        let s = shape.support(Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(s, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(shape.support_local(-Vec3::ONE), Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let hull = Hull::cuboid(Vec3::ONE);
        assert_eq!(hull.polygons().len(), 6);
        for polygon in hull.polygons() {
            let centroid = polygon
                .indices()
                .iter()
                .fold(Vec3::ZERO, |acc, &i| acc + hull.local_vertices()[i])
                / polygon.indices().len() as f32;
            assert!(centroid.dot(polygon.normal()) > 0.9);
        }
    }

    #[test]
    fn test_cuboid_winding_matches_normals() {
        let mut hull = Hull::cuboid(Vec3::new(0.5, 1.0, 2.0));
        let declared: Vec<Vec3> = hull.polygons().iter().map(|p| p.normal()).collect();
        hull.refresh_normals();
        for (p, n) in hull.polygons().iter().zip(declared) {
            assert!(p.normal().equal_eps(n), "{:?} vs {:?}", p.normal(), n);
        }
    }

    #[test]
    fn test_hull_rejects_bad_index() {
        let err = Hull::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![Polygon::new(vec![0, 1, 5], Vec3::Z)]);
        assert_eq!(
            err,
            Err(PhysicsError::InvalidPolygon { polygon: 0, vertex: 5, count: 3 })
        );

        let err = Hull::new(vec![Vec3::ZERO, Vec3::X], vec![Polygon::new(vec![0, 1], Vec3::Z)]);
        assert!(err.is_err());
    }

    #[test]
    fn test_hull_from_faces() {
        let vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let hull = Hull::from_faces(vertices, vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]]).unwrap();
        assert!(hull.polygons()[0].normal().equal_eps(-Vec3::Z));
        assert!(hull.polygons()[1].normal().equal_eps(-Vec3::Y));
    }

    #[test]
    fn test_scale_and_translate_local() {
        let mut hull = Hull::cuboid(Vec3::ONE);
        hull.scale_local(Vec3::new(2.0, 1.0, 1.0));
        hull.translate_local(Vec3::new(0.0, 0.0, 1.0));
        let shape = Shape::from(hull);
        let bounds = shape.local_bounds();
        assert_eq!(bounds.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(2.0, 1.0, 2.0));
    }
}
