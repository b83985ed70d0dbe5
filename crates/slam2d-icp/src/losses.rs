//! Robust loss functions for least squares optimization.
//!
//! A loss `rho(s)` is applied to the squared residual `s = r²`. The solver
//! sums `rho` to get the robustified cost and uses `rho'(s)` as the weight of
//! each residual in the normal equations.

/// Trait for robust loss functions that scale residuals by weight.
pub trait RobustLoss: Send + Sync {
    /// Robustified cost of a squared residual norm.
    fn cost(&self, squared_norm: f64) -> f64;

    /// Compute loss weight `rho'(s)` for a squared residual norm.
    fn weight(&self, squared_norm: f64) -> f64;
}

/// Identity loss: weight always 1.0 (L2 baseline).
#[derive(Debug, Clone, Copy)]
pub struct IdentityLoss;

impl RobustLoss for IdentityLoss {
    fn cost(&self, squared_norm: f64) -> f64 {
        squared_norm
    }

    fn weight(&self, _squared_norm: f64) -> f64 {
        1.0
    }
}

/// Huber loss: smooth transition from quadratic to linear weighting.
#[derive(Debug, Clone, Copy)]
pub struct HuberLoss {
    /// Residual magnitude where the loss turns linear.
    pub delta: f64,
}

impl HuberLoss {
    /// Create new Huber loss. Panics if delta <= 0.
    pub fn new(delta: f64) -> Self {
        assert!(delta > 0.0, "Huber delta must be positive, got {}", delta);
        HuberLoss { delta }
    }
}

impl RobustLoss for HuberLoss {
    fn cost(&self, squared_norm: f64) -> f64 {
        let delta_sq = self.delta * self.delta;
        if squared_norm <= delta_sq {
            squared_norm
        } else {
            2.0 * self.delta * squared_norm.sqrt() - delta_sq
        }
    }

    fn weight(&self, squared_norm: f64) -> f64 {
        let delta_sq = self.delta * self.delta;
        if squared_norm <= delta_sq {
            1.0
        } else {
            self.delta / squared_norm.sqrt()
        }
    }
}

/// Cauchy loss: aggressive outlier rejection via 1/(1 + s/σ²).
///
/// `rho(s) = σ² ln(1 + s/σ²)`.
#[derive(Debug, Clone, Copy)]
pub struct CauchyLoss {
    /// Residual scale σ.
    pub scale: f64,
}

impl CauchyLoss {
    /// Create new Cauchy loss. Panics if scale <= 0.
    pub fn new(scale: f64) -> Self {
        assert!(scale > 0.0, "Cauchy scale must be positive, got {}", scale);
        CauchyLoss { scale }
    }
}

impl RobustLoss for CauchyLoss {
    fn cost(&self, squared_norm: f64) -> f64 {
        let scale_sq = self.scale * self.scale;
        scale_sq * (squared_norm / scale_sq).ln_1p()
    }

    fn weight(&self, squared_norm: f64) -> f64 {
        let scale_sq = self.scale * self.scale;
        1.0 / (1.0 + squared_norm / scale_sq)
    }
}
