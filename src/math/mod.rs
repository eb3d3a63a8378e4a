pub mod predicates;
mod rotation;
mod vec3;

pub use rotation::RotationBasis;
pub use vec3::Vec3;

/// Engine-wide numeric constants
pub mod consts {
    /// Tolerance for geometric comparisons and normalization underflow
    pub const EPSILON: f32 = 5e-4;

    /// Warm-start match distance between contact offsets of consecutive steps
    pub const CONTACT_MATCH_EPSILON: f32 = 0.1;

    /// Maximum number of contact points kept per manifold
    pub const MAX_CONTACT_POINTS: usize = 4;

    /// Upper bound on candidate contact points gathered for one shape pair
    pub const MAX_CANDIDATE_POINTS: usize = 100;
}

/// Utility functions
pub mod utils {
    /// Converts degrees to radians
    #[inline]
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Converts radians to degrees
    #[inline]
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians.to_degrees()
    }
}
