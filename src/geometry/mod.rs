mod aabb;
mod material;
mod shape;

pub use aabb::Aabb;
pub use material::Material;
pub use shape::{Capsule, Hull, Polygon, Shape, ShapeType, Sphere};
