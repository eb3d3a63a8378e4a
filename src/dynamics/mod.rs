mod collision_group;
mod integrator;
mod rigid_body;

pub use collision_group::{new_shared_group, CollisionGroup, SharedCollisionGroup};
pub use integrator::integrate_body;
pub(crate) use rigid_body::get_two_mut;
pub use rigid_body::{Body, BodyDesc, BodyHandle, DEFAULT_INERTIA, DEFAULT_MASS};
