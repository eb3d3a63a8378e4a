use thiserror::Error;

/// Errors reported by the public world and shape API.
///
/// Degenerate geometry is never an error: the narrow phase simply reports no
/// contact for that pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// `World::update` was given a step not larger than the engine epsilon.
    #[error("time step {dt} must be greater than {min}")]
    InvalidTimeStep { dt: f32, min: f32 },

    /// No body is registered at this index.
    #[error("no body at index {index}")]
    BodyNotFound { index: usize },

    /// The body has no shape at this index.
    #[error("body {body} has no shape at index {shape}")]
    ShapeNotFound { body: usize, shape: usize },

    /// A hull polygon is malformed.
    #[error("hull polygon {polygon} is invalid: vertex index {vertex} with {count} vertices")]
    InvalidPolygon { polygon: usize, vertex: usize, count: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PhysicsError::BodyNotFound { index: 7 };
        assert_eq!(err.to_string(), "no body at index 7");

        let err = PhysicsError::InvalidConfig("damping must be in (0, 1]".into());
        assert!(err.to_string().contains("damping"));
    }
}
