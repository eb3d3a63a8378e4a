use super::consts::EPSILON;
use super::predicates::rotate_around_vector;
use super::utils::{deg_to_rad, rad_to_deg};
use super::vec3::Vec3;

/// Orientation of a body stored as its three local axes expressed in world space.
///
/// The axes are kept orthonormal: every incremental rotation re-orthonormalizes
/// Y against X and rebuilds Z as `X × Y`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotationBasis {
    axes: [Vec3; 3],
}

impl Default for RotationBasis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RotationBasis {
    /// The world axes
    pub const IDENTITY: Self = Self {
        axes: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    /// Builds a basis from three axes. The caller guarantees orthonormality.
    #[inline]
    pub const fn from_axes(x: Vec3, y: Vec3, z: Vec3) -> Self {
        Self { axes: [x, y, z] }
    }

    /// Builds a basis from Euler angles in degrees, composed as Y, then X, then Z.
    pub fn from_euler_degrees(angles: Vec3) -> Self {
        let (sx, cx) = deg_to_rad(angles.x).sin_cos();
        let (sy, cy) = deg_to_rad(angles.y).sin_cos();
        let (sz, cz) = deg_to_rad(angles.z).sin_cos();

        Self::from_axes(
            Vec3::new(cz * cy + sz * sx * sy, sz * cx, sz * sx * cy - cz * sy),
            Vec3::new(-sz * cy + cz * sx * sy, cz * cx, cz * sx * cy + sz * sy),
            Vec3::new(cx * sy, -sx, cx * cy),
        )
    }

    /// Recovers Euler angles in degrees, each wrapped to `[0, 360)`.
    pub fn euler_degrees(&self) -> Vec3 {
        let [x, y, z] = self.axes;
        let pitch = (-z.y).clamp(-1.0, 1.0).asin();
        let yaw = z.x.atan2(z.z);
        let roll = x.y.atan2(y.y);
        Vec3::new(wrap_degrees(rad_to_deg(pitch)), wrap_degrees(rad_to_deg(yaw)), wrap_degrees(rad_to_deg(roll)))
    }

    #[inline]
    pub fn x(&self) -> Vec3 {
        self.axes[0]
    }

    #[inline]
    pub fn y(&self) -> Vec3 {
        self.axes[1]
    }

    #[inline]
    pub fn z(&self) -> Vec3 {
        self.axes[2]
    }

    /// Axis `i` (0 = X, 1 = Y, 2 = Z)
    #[inline]
    pub fn axis(&self, i: usize) -> Vec3 {
        self.axes[i]
    }

    /// Expresses a world vector in body-local coordinates.
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.axes[0]), v.dot(self.axes[1]), v.dot(self.axes[2]))
    }

    /// Maps a body-local vector into world coordinates.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.axes[0] * v.x + self.axes[1] * v.y + self.axes[2] * v.z
    }

    /// Rotates the basis by angular velocity `omega` over `dt`.
    ///
    /// Returns `false` and leaves the basis untouched when `|omega|` is below
    /// [`EPSILON`]; the integrator uses that to zero residual spin.
    pub fn rotate(&mut self, omega: Vec3, dt: f32) -> bool {
        let mut axis = omega;
        let speed = axis.normalize_len();
        if speed <= EPSILON {
            return false;
        }
        let angle = speed * dt;

        let mut x = rotate_around_vector(self.axes[0], axis, angle);
        let mut y = rotate_around_vector(self.axes[1], axis, angle);
        if x.normalize_len() == 0.0 {
            return false;
        }
        y -= x * x.dot(y);
        if y.normalize_len() == 0.0 {
            return false;
        }
        self.axes = [x, y, x.cross(y)];
        true
    }

    /// True when all axes are unit length and mutually orthogonal within `tolerance`.
    pub fn is_orthonormal(&self, tolerance: f32) -> bool {
        let [x, y, z] = self.axes;
        let unit = |v: Vec3| (v.length() - 1.0).abs() <= tolerance;
        unit(x)
            && unit(y)
            && unit(z)
            && x.dot(y).abs() <= tolerance
            && y.dot(z).abs() <= tolerance
            && z.dot(x).abs() <= tolerance
    }
}

fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
