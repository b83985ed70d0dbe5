use crate::so2::SO2;
use glam::DVec2;

/// A rigid body transformation of the plane.
///
/// Acts on points as `p' = R * p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE2 {
    /// Rotation part.
    pub r: SO2,
    /// Translation part.
    pub t: DVec2,
}

impl SE2 {
    /// Create a transformation from its rotation and translation.
    pub fn new(r: SO2, t: DVec2) -> Self {
        Self { r, t }
    }

    /// The inverse transformation.
    pub fn inverse(&self) -> Self {
        let r_inv = self.r.inverse();
        Self {
            r: r_inv,
            t: r_inv * (-self.t),
        }
    }
}

impl std::ops::Mul<SE2> for SE2 {
    type Output = SE2;

    fn mul(self, other: SE2) -> SE2 {
        SE2::new(self.r * other.r, self.r * other.t + self.t)
    }
}

impl std::ops::Mul<DVec2> for SE2 {
    type Output = DVec2;

    fn mul(self, rhs: DVec2) -> Self::Output {
        self.r * rhs + self.t
    }
}
