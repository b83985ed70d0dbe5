//! Levenberg-Marquardt optimizer for the point-to-line registration problem.
//!
//! The unknowns are the three pose parameters `(x, y, theta)`. Each step solves
//! the damped, robustly weighted normal equations `(J^T W J + λI) δ = -J^T W r`
//! and is only accepted when it lowers the robustified cost.

use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use slam2d_lie::so2::SO2;
use slam2d_scan::PointSet;

use crate::correspondence::Correspondence;
use crate::losses::RobustLoss;
use crate::pose::Pose2D;

/// Signed distance of a transformed point to an infinite line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineConstraint {
    /// The point in the previous scan frame.
    pub point: DVec2,
    /// A point on the line, in the current scan frame.
    pub anchor: DVec2,
    /// Unit normal of the line.
    pub normal: DVec2,
}

impl LineConstraint {
    /// Create the constraint for `point` against the line through `a` and `b`.
    ///
    /// Returns `None` if `a` and `b` coincide.
    pub fn new(point: DVec2, a: DVec2, b: DVec2) -> Option<Self> {
        let normal = (b - a).perp().try_normalize()?;
        Some(Self {
            point,
            anchor: a,
            normal,
        })
    }

    /// Build the constraint of a correspondence between two scans.
    pub fn from_correspondence(
        source: &PointSet,
        target: &PointSet,
        correspondence: &Correspondence,
    ) -> Option<Self> {
        Self::new(
            source.point(correspondence.source)?,
            target.point(correspondence.first)?,
            target.point(correspondence.second)?,
        )
    }

    /// Residual at `pose`.
    #[inline]
    pub fn residual(&self, pose: &Pose2D) -> f64 {
        self.normal.dot(pose.transform_point(self.point) - self.anchor)
    }

    /// Residual and its gradient with respect to `(x, y, theta)` at `pose`.
    #[inline]
    pub fn linearize(&self, pose: &Pose2D) -> (f64, DVec3) {
        let rotation = SO2::exp(pose.theta);
        let transformed = rotation * self.point + pose.translation();
        let residual = self.normal.dot(transformed - self.anchor);
        let d_theta = self.normal.dot(rotation.d_rotate(self.point));
        (residual, DVec3::new(self.normal.x, self.normal.y, d_theta))
    }
}

/// Reason why the optimizer terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverTermination {
    /// Converged: relative cost change below tolerance
    CostConverged,
    /// Converged: gradient norm below tolerance
    GradientConverged,
    /// Converged: step is essentially zero
    StepConverged,
    /// Maximum iterations reached
    MaxIterations,
    /// Lambda exceeded maximum (likely numerical issues)
    LambdaMaxExceeded,
    /// The damped system could not be solved
    SolveFailed,
    /// There were no constraints to optimize
    NoConstraints,
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// The optimized pose.
    pub pose: Pose2D,
    /// Final robustified cost.
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Cost after every accepted step, starting with the initial cost.
    pub cost_history: Vec<f64>,
    /// Reason for termination
    pub termination_reason: SolverTermination,
}

/// Levenberg-Marquardt optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardt {
    /// Initial damping parameter
    pub lambda_init: f64,
    /// Maximum damping parameter
    pub lambda_max: f64,
    /// Factor for lambda adaptation
    pub lambda_factor: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Convergence threshold for relative cost change
    pub cost_tolerance: f64,
    /// Convergence threshold for gradient norm
    pub gradient_tolerance: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            lambda_init: 1e-4,
            lambda_max: 1e10,
            lambda_factor: 10.0,
            max_iterations: 20,
            cost_tolerance: 1e-10,
            gradient_tolerance: 1e-12,
        }
    }
}

impl LevenbergMarquardt {
    /// Minimum step norm threshold. Steps smaller than this are considered zero.
    const STEP_SIZE_TOLERANCE: f64 = 1e-14;

    /// Create a new optimizer with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total robustified cost of `constraints` at `pose`.
    pub fn cost(constraints: &[LineConstraint], pose: &Pose2D, loss: &dyn RobustLoss) -> f64 {
        constraints
            .iter()
            .map(|c| {
                let r = c.residual(pose);
                loss.cost(r * r)
            })
            .sum()
    }

    /// Minimize the robustified point-to-line cost over a fixed set of correspondences.
    ///
    /// # Arguments
    ///
    /// * `source` - The previous scan.
    /// * `target` - The current scan.
    /// * `correspondences` - Pairings between the two scans.
    /// * `initial` - Starting pose.
    /// * `loss` - Robust loss applied to each squared residual.
    pub fn optimize(
        &self,
        source: &PointSet,
        target: &PointSet,
        correspondences: &[Correspondence],
        initial: Pose2D,
        loss: &dyn RobustLoss,
    ) -> SolverResult {
        let constraints = correspondences
            .iter()
            .filter_map(|c| LineConstraint::from_correspondence(source, target, c))
            .collect::<Vec<_>>();
        self.optimize_constraints(&constraints, initial, loss)
    }

    /// Minimize the robustified cost of `constraints` starting at `initial`.
    pub fn optimize_constraints(
        &self,
        constraints: &[LineConstraint],
        initial: Pose2D,
        loss: &dyn RobustLoss,
    ) -> SolverResult {
        let mut pose = initial;
        let mut current_cost = Self::cost(constraints, &pose, loss);
        let mut result = SolverResult {
            pose,
            final_cost: current_cost,
            iterations: 0,
            cost_history: vec![current_cost],
            termination_reason: SolverTermination::MaxIterations,
        };

        if constraints.is_empty() {
            result.termination_reason = SolverTermination::NoConstraints;
            return result;
        }

        let mut lambda = self.lambda_init;

        result.termination_reason = loop {
            if result.iterations >= self.max_iterations {
                break SolverTermination::MaxIterations;
            }

            let (jtj, jtr) = Self::build_normal_equations(constraints, &pose, loss);

            if jtr.length() < self.gradient_tolerance {
                break SolverTermination::GradientConverged;
            }

            let Some(delta) = Self::solve_damped_system(&jtj, jtr, lambda) else {
                break SolverTermination::SolveFailed;
            };

            if delta.length() < Self::STEP_SIZE_TOLERANCE {
                break SolverTermination::StepConverged;
            }

            let candidate = Pose2D::new(pose.x + delta.x, pose.y + delta.y, pose.theta + delta.z);
            let new_cost = Self::cost(constraints, &candidate, loss);
            result.iterations += 1;

            let cost_change = current_cost - new_cost;
            if cost_change > 0.0 {
                // Step improved cost: accept it and decrease lambda
                let relative_cost_change = if current_cost > 0.0 {
                    cost_change / current_cost
                } else {
                    cost_change
                };

                pose = candidate;
                current_cost = new_cost;
                result.cost_history.push(new_cost);
                lambda = (lambda / self.lambda_factor).max(1e-12);

                if relative_cost_change < self.cost_tolerance {
                    break SolverTermination::CostConverged;
                }
            } else {
                // Step increased cost: reject it and increase lambda
                lambda *= self.lambda_factor;
                if lambda > self.lambda_max {
                    break SolverTermination::LambdaMaxExceeded;
                }
            }
        };

        result.pose = Pose2D::new(pose.x, pose.y, slam2d_lie::wrap_angle(pose.theta));
        result.final_cost = current_cost;
        result
    }

    /// Build the weighted normal equations J^T W J and J^T W r.
    fn build_normal_equations(
        constraints: &[LineConstraint],
        pose: &Pose2D,
        loss: &dyn RobustLoss,
    ) -> (DMat3, DVec3) {
        let mut jtj = DMat3::ZERO;
        let mut jtr = DVec3::ZERO;
        for c in constraints {
            let (r, j) = c.linearize(pose);
            let w = loss.weight(r * r);
            // outer product j * j^T, column by column
            jtj += DMat3::from_cols(j * (w * j.x), j * (w * j.y), j * (w * j.z));
            jtr += j * (w * r);
        }
        (jtj, jtr)
    }

    /// Solve the damped system (J^T J + λI) δ = -J^T r.
    fn solve_damped_system(jtj: &DMat3, jtr: DVec3, lambda: f64) -> Option<DVec3> {
        let h = *jtj + DMat3::from_diagonal(DVec3::splat(lambda));
        let det = h.determinant();
        if !det.is_finite() || det.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let delta = h.inverse() * (-jtr);
        delta.is_finite().then_some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::{CauchyLoss, IdentityLoss};
    use approx::assert_relative_eq;

    // points on the walls of an axis-aligned room, plus their line through a neighbor
    fn room_constraints(truth: &Pose2D) -> Vec<LineConstraint> {
        let mut constraints = Vec::new();
        for i in 0..40 {
            let s = -2.0 + i as f64 * 0.1;
            for (p, dir) in [
                (DVec2::new(s, 3.0), DVec2::X),
                (DVec2::new(s, -2.0), DVec2::X),
                (DVec2::new(4.0, s), DVec2::Y),
                (DVec2::new(-3.0, s), DVec2::Y),
            ] {
                let a = truth.transform_point(p);
                let b = truth.transform_point(p + dir * 0.1);
                if let Some(c) = LineConstraint::new(p, a, b) {
                    constraints.push(c);
                }
            }
        }
        constraints
    }

    #[test]
    fn test_linearize_matches_finite_difference() {
        let c = LineConstraint::new(
            DVec2::new(1.0, 2.0),
            DVec2::new(0.5, 0.0),
            DVec2::new(1.5, 0.7),
        )
        .expect("constraint");
        let pose = Pose2D::new(0.1, -0.2, 0.3);
        let (r, j) = c.linearize(&pose);
        assert_relative_eq!(r, c.residual(&pose), epsilon = 1e-12);

        let h = 1e-6;
        let fd = DVec3::new(
            (c.residual(&Pose2D::new(pose.x + h, pose.y, pose.theta)) - r) / h,
            (c.residual(&Pose2D::new(pose.x, pose.y + h, pose.theta)) - r) / h,
            (c.residual(&Pose2D::new(pose.x, pose.y, pose.theta + h)) - r) / h,
        );
        assert_relative_eq!(j.x, fd.x, epsilon = 1e-5);
        assert_relative_eq!(j.y, fd.y, epsilon = 1e-5);
        assert_relative_eq!(j.z, fd.z, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_line() {
        let p = DVec2::new(1.0, 1.0);
        assert!(LineConstraint::new(p, DVec2::ZERO, DVec2::ZERO).is_none());
    }

    #[test]
    fn test_optimize_recovers_pose() {
        let truth = Pose2D::new(0.08, -0.05, 0.03);
        let constraints = room_constraints(&truth);

        let result = LevenbergMarquardt::new().optimize_constraints(
            &constraints,
            Pose2D::IDENTITY,
            &CauchyLoss::new(0.5),
        );

        assert_relative_eq!(result.pose.x, truth.x, epsilon = 1e-6);
        assert_relative_eq!(result.pose.y, truth.y, epsilon = 1e-6);
        assert_relative_eq!(result.pose.theta, truth.theta, epsilon = 1e-6);
        assert!(result.final_cost < 1e-10);
    }

    #[test]
    fn test_cost_history_non_increasing() {
        let truth = Pose2D::new(0.3, 0.2, -0.1);
        let constraints = room_constraints(&truth);

        let result = LevenbergMarquardt::new().optimize_constraints(
            &constraints,
            Pose2D::IDENTITY,
            &CauchyLoss::new(0.5),
        );

        assert!(result.cost_history.len() >= 2);
        for w in result.cost_history.windows(2) {
            assert!(w[1] <= w[0], "cost increased: {} -> {}", w[0], w[1]);
        }
        assert_eq!(result.cost_history.last().copied(), Some(result.final_cost));
    }

    #[test]
    fn test_robust_loss_downweights_outliers() {
        let truth = Pose2D::new(0.05, -0.03, 0.02);
        let mut constraints = room_constraints(&truth);

        // corrupt every 20th constraint (5%) by pushing the point off its wall
        for c in constraints.iter_mut().step_by(20) {
            c.point += DVec2::new(1.5, -1.0);
        }

        let solver = LevenbergMarquardt {
            max_iterations: 100,
            ..Default::default()
        };
        let robust =
            solver.optimize_constraints(&constraints, Pose2D::IDENTITY, &CauchyLoss::new(0.5));
        let plain = solver.optimize_constraints(&constraints, Pose2D::IDENTITY, &IdentityLoss);

        let robust_error = robust.pose.parameter_distance(&truth);
        let plain_error = plain.pose.parameter_distance(&truth);
        assert!(
            robust_error < plain_error,
            "robust {} vs plain {}",
            robust_error,
            plain_error
        );
    }

    #[test]
    fn test_zero_residual_converges_immediately() {
        let constraints = room_constraints(&Pose2D::IDENTITY);
        let result = LevenbergMarquardt::new().optimize_constraints(
            &constraints,
            Pose2D::IDENTITY,
            &CauchyLoss::new(0.5),
        );
        assert_eq!(result.iterations, 0);
        assert_eq!(result.pose, Pose2D::IDENTITY);
        assert_eq!(
            result.termination_reason,
            SolverTermination::GradientConverged
        );
    }

    #[test]
    fn test_no_constraints() {
        let result =
            LevenbergMarquardt::new().optimize_constraints(&[], Pose2D::IDENTITY, &IdentityLoss);
        assert_eq!(result.termination_reason, SolverTermination::NoConstraints);
        assert_eq!(result.pose, Pose2D::IDENTITY);
    }

    #[test]
    fn test_cost_tolerance_relative_to_previous_cost() {
        // one Gauss-Newton step solves a pure translation, removing almost all
        // of the cost: relative change close to 1 against the previous cost
        let truth = Pose2D::new(0.1, -0.05, 0.0);
        let constraints = room_constraints(&truth);
        let solver = LevenbergMarquardt {
            cost_tolerance: 2.0,
            ..Default::default()
        };

        let result = solver.optimize_constraints(&constraints, Pose2D::IDENTITY, &IdentityLoss);
        assert_eq!(result.termination_reason, SolverTermination::CostConverged);
        assert_eq!(result.iterations, 1);
        assert!(result.pose.parameter_distance(&truth) < 1e-4);
    }
}
