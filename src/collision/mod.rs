pub mod broad_phase;
pub mod contact;
mod contact_store;
pub mod narrow_phase;

pub use broad_phase::BoundsTree;
pub use contact::{ContactManifold, ContactPatch, ContactPoint, ManifoldPoint};
pub use contact_store::ContactStore;
pub use narrow_phase::{collide, penetration};
