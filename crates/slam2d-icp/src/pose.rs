use glam::DVec2;
use serde::{Deserialize, Serialize};
use slam2d_lie::{se2::SE2, so2::SO2, wrap_angle};

/// A planar rigid transform `(x, y, theta)`.
///
/// Applied to a point as `p' = R(theta) * p + (x, y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// Translation along x in meters.
    pub x: f64,
    /// Translation along y in meters.
    pub y: f64,
    /// Rotation in radians.
    pub theta: f64,
}

impl Pose2D {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        theta: 0.0,
    };

    /// Create a new pose.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    /// The translation part.
    #[inline]
    pub fn translation(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn transform_point(&self, p: DVec2) -> DVec2 {
        SE2::from(*self) * p
    }

    /// SE(2) composition `self ∘ other`: apply `other` first, then `self`.
    ///
    /// The resulting angle is wrapped to `(-pi, pi]`.
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        Pose2D::from(SE2::from(*self) * SE2::from(*other))
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Pose2D {
        Pose2D::from(SE2::from(*self).inverse())
    }

    /// Euclidean norm of the parameter difference `(dx, dy, dtheta)`.
    pub fn parameter_distance(&self, other: &Pose2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dtheta = wrap_angle(self.theta - other.theta);
        (dx * dx + dy * dy + dtheta * dtheta).sqrt()
    }

    /// Whether all components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.theta.is_finite()
    }
}

impl From<Pose2D> for SE2 {
    fn from(pose: Pose2D) -> Self {
        SE2::new(SO2::exp(pose.theta), pose.translation())
    }
}

impl From<SE2> for Pose2D {
    fn from(se2: SE2) -> Self {
        Pose2D::new(se2.t.x, se2.t.y, wrap_angle(se2.r.log()))
    }
}
