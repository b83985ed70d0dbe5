use std::path::Path;

use serde::{Deserialize, Serialize};
use slam2d_scan::PointSet;

use crate::icp_point_to_line::ICPConvergenceCriteria;
use crate::losses::{CauchyLoss, HuberLoss, IdentityLoss, RobustLoss};
use crate::solver::LevenbergMarquardt;

/// Errors raised while loading or validating a [`RegistrationConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Robust loss applied to the squared point-to-line residuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LossKind {
    /// Plain least squares.
    L2,
    /// Huber loss with the given threshold in meters.
    Huber {
        /// Residual magnitude where the loss turns linear.
        delta: f64,
    },
    /// Cauchy loss with the given scale in meters.
    Cauchy {
        /// Residual scale.
        scale: f64,
    },
}

impl Default for LossKind {
    fn default() -> Self {
        LossKind::Cauchy { scale: 0.5 }
    }
}

impl LossKind {
    /// Instantiate the loss function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the threshold or scale is not positive.
    pub fn build(&self) -> Result<Box<dyn RobustLoss>, ConfigError> {
        Ok(match *self {
            LossKind::L2 => Box::new(IdentityLoss),
            LossKind::Huber { delta } => {
                ensure_positive("loss.delta", delta)?;
                Box::new(HuberLoss::new(delta))
            }
            LossKind::Cauchy { scale } => {
                ensure_positive("loss.scale", scale)?;
                Box::new(CauchyLoss::new(scale))
            }
        })
    }
}

fn ensure_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn ensure_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

/// Rule that rejects correspondences whose nearest neighbor is too far away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrespondenceGate {
    /// Accept every pair of neighbors.
    None,
    /// Fixed maximum distance in meters.
    Absolute {
        /// Maximum nearest neighbor distance.
        max_distance: f64,
    },
    /// Multiple of the current scan's point spacing, with a floor in meters.
    ScanResolution {
        /// Multiplier applied to the median spacing between consecutive points.
        factor: f64,
        /// Lower bound of the gate.
        min_distance: f64,
    },
}

impl Default for CorrespondenceGate {
    fn default() -> Self {
        CorrespondenceGate::ScanResolution {
            factor: 10.0,
            min_distance: 0.1,
        }
    }
}

impl CorrespondenceGate {
    /// Maximum nearest neighbor distance for matching against `target`.
    pub fn max_distance(&self, target: &PointSet) -> Option<f64> {
        match *self {
            CorrespondenceGate::None => None,
            CorrespondenceGate::Absolute { max_distance } => Some(max_distance),
            CorrespondenceGate::ScanResolution {
                factor,
                min_distance,
            } => Some(
                target
                    .resolution()
                    .map_or(min_distance, |r| (factor * r).max(min_distance)),
            ),
        }
    }
}

/// Configuration of the scan registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Outer loop termination.
    pub criteria: ICPConvergenceCriteria,
    /// Inner solver parameters.
    pub solver: LevenbergMarquardt,
    /// Robust loss.
    pub loss: LossKind,
    /// Correspondence distance gate.
    pub gate: CorrespondenceGate,
}

impl RegistrationConfig {
    /// Parse a configuration from a JSON string and validate it.
    ///
    /// Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that every value is in its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.criteria.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "criteria.max_iterations must be at least 1".to_string(),
            ));
        }
        ensure_non_negative("criteria.tolerance", self.criteria.tolerance)?;
        if self.criteria.min_correspondences < 3 {
            return Err(ConfigError::Invalid(format!(
                "criteria.min_correspondences must be at least 3, got {}",
                self.criteria.min_correspondences
            )));
        }

        if self.solver.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "solver.max_iterations must be at least 1".to_string(),
            ));
        }
        ensure_positive("solver.lambda_init", self.solver.lambda_init)?;
        ensure_positive("solver.lambda_max", self.solver.lambda_max)?;
        if self.solver.lambda_factor.is_nan() || self.solver.lambda_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "solver.lambda_factor must be greater than 1, got {}",
                self.solver.lambda_factor
            )));
        }

        ensure_non_negative("solver.cost_tolerance", self.solver.cost_tolerance)?;
        ensure_non_negative("solver.gradient_tolerance", self.solver.gradient_tolerance)?;

        self.loss.build()?;

        match self.gate {
            CorrespondenceGate::None => {}
            CorrespondenceGate::Absolute { max_distance } => {
                ensure_positive("gate.max_distance", max_distance)?
            }
            CorrespondenceGate::ScanResolution {
                factor,
                min_distance,
            } => {
                ensure_positive("gate.factor", factor)?;
                ensure_positive("gate.min_distance", min_distance)?;
            }
        }

        Ok(())
    }
}
