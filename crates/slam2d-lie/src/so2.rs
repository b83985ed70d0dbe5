use glam::DVec2;

/// A rotation of the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO2 {
    /// representing complex number [real, imaginary]
    pub z: DVec2,
}

impl SO2 {
    /// Create a rotation from a unit complex number.
    pub fn new(z: DVec2) -> Self {
        Self { z }
    }

    /// inverting the complex number z (represented as a 2D vector)
    /// assumes unit norm
    pub fn inverse(&self) -> Self {
        Self {
            z: DVec2::new(self.z.x, -self.z.y),
        }
    }

    /// Exponential map from an angle in radians.
    pub fn exp(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            z: DVec2::new(cos, sin),
        }
    }

    /// Logarithm map, returns the angle in `(-pi, pi]`.
    pub fn log(&self) -> f64 {
        self.z.y.atan2(self.z.x)
    }

    /// Derivative of `R(theta) * p` with respect to `theta`.
    ///
    /// Equals `R(theta) * hat(1) * p`, the point turned by 90 degrees and then rotated.
    pub fn d_rotate(&self, p: DVec2) -> DVec2 {
        *self * p.perp()
    }
}

impl std::ops::Mul<DVec2> for SO2 {
    type Output = DVec2;

    fn mul(self, rhs: DVec2) -> Self::Output {
        DVec2::new(
            self.z.x * rhs.x - self.z.y * rhs.y,
            self.z.y * rhs.x + self.z.x * rhs.y,
        )
    }
}

impl std::ops::Mul<SO2> for SO2 {
    type Output = SO2;

    fn mul(self, other: SO2) -> Self::Output {
        // Complex number multiplication: (a + bi)(c + di) = (ac - bd) + (ad + bc)i
        let real = self.z.x * other.z.x - self.z.y * other.z.y;
        let imag = self.z.x * other.z.y + self.z.y * other.z.x;
        SO2::new(DVec2::new(real, imag))
    }
}
