//! # pe-physics
//!
//! A real-time 3D rigid body physics core.
//!
//! ## Features
//!
//! - **Shapes**: spheres, capsules and convex hulls with per-shape materials
//! - **Broad Phase**: per-body bounds trees descended pairwise
//! - **Narrow Phase**: analytic sphere/capsule contacts, GJK + EPA and face
//!   clipping for hulls, reduced to at most four points per manifold
//! - **Solver**: sequential impulses with friction, split-impulse position
//!   correction and warm starting from the previous step
//! - **Stacking**: layered shock propagation over the contact graph
//! - **Sleeping**: bodies in contact share a collision group that falls
//!   asleep as a unit
//!
//! ## Quick Start
//!
//! ```rust
//! use pe_physics::prelude::*;
//!
//! let mut world = World::default();
//! world.set_gravity(Vec3::new(0.0, 0.0, -9.81));
//!
//! // Static floor with its top face at z = 0
//! let floor = world.create_body(BodyDesc::fixed().with_position(Vec3::new(0.0, 0.0, -1.0)));
//! world.attach_shape(floor, Shape::cuboid(Vec3::new(10.0, 10.0, 1.0)))?;
//!
//! // Dynamic ball
//! let ball = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, 5.0)));
//! world.attach_shape(ball, Shape::sphere(Vec3::ZERO, 0.5))?;
//!
//! for _ in 0..240 {
//!     world.update(1.0 / 60.0)?;
//! }
//! let z = world.body(ball).map(|b| b.position().z).unwrap_or_default();
//! assert!(z < 5.0);
//! # Ok::<(), pe_physics::PhysicsError>(())
//! ```

pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod solver;
mod world;

pub use error::{PhysicsError, Result};
pub use world::{World, WorldConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collision::{ContactManifold, ContactPatch, ContactPoint, ManifoldPoint};
    pub use crate::dynamics::{Body, BodyDesc, BodyHandle, CollisionGroup};
    pub use crate::error::{PhysicsError, Result};
    pub use crate::geometry::{Aabb, Capsule, Hull, Material, Polygon, Shape, ShapeType, Sphere};
    pub use crate::math::{RotationBasis, Vec3};
    pub use crate::solver::{SequentialImpulseSolver, SolverConfig};
    pub use crate::world::{World, WorldConfig};
}
