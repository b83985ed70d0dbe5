use serde::{Deserialize, Serialize};

use crate::pose::Pose2D;

/// Running odometry of a sequence of registered scans.
///
/// Two directions are involved. `delta` is the registration result: it maps
/// points of the previous scan into the frame of the current scan. Its
/// inverse is the sensor motion, the current sensor pose expressed in the
/// previous sensor frame, and that motion is what accumulates into `state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationState {
    /// Pose of the sensor in the frame of the first scan.
    pub state: Pose2D,
    /// Previous-to-current point transform estimated for the latest scan.
    pub delta: Pose2D,
}

impl RegistrationState {
    /// Start accumulating from `initial`.
    pub fn new(initial: Pose2D) -> Self {
        Self {
            state: initial,
            delta: Pose2D::IDENTITY,
        }
    }

    /// Fold a registration result into the accumulated pose.
    ///
    /// `state' = state ∘ delta⁻¹`, angle wrapped to `(-pi, pi]`.
    pub fn integrate(&mut self, delta: Pose2D) {
        self.delta = delta;
        self.state = self.state.compose(&delta.inverse());
    }
}
