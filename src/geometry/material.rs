/// Surface response of a shape: restitution `e` and Coulomb friction `mu`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    e: f32,
    mu: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self { e: 0.0, mu: 1.0 }
    }
}

impl Material {
    /// Restitution is clamped to `[0, 1]`, friction to `>= 0`.
    pub fn new(e: f32, mu: f32) -> Self {
        Self {
            e: e.clamp(0.0, 1.0),
            mu: mu.max(0.0),
        }
    }

    #[inline]
    pub fn e(&self) -> f32 {
        self.e
    }

    pub fn set_e(&mut self, e: f32) {
        self.e = e.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn set_mu(&mut self, mu: f32) {
        self.mu = mu.max(0.0);
    }

    /// Combined material for a contact: restitutions multiply, frictions average.
    #[inline]
    pub fn mixed(&self, other: &Material) -> Material {
        Material {
            e: self.e * other.e,
            mu: (self.mu + other.mu) * 0.5,
        }
    }
}
