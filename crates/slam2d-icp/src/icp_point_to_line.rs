use serde::{Deserialize, Serialize};
use slam2d_scan::PointSet;

use crate::config::RegistrationConfig;
use crate::correspondence::find_correspondences;
use crate::pose::Pose2D;
use crate::solver::{LevenbergMarquardt, LineConstraint, SolverTermination};
use crate::spatial_index::SpatialIndex;

/// Why the registration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The pose update fell below the tolerance.
    Converged,
    /// The iteration budget was exhausted; the last estimate is returned.
    MaxIterations,
    /// Too few correspondences to constrain the pose; the last estimate is returned.
    InsufficientCorrespondences,
    /// One of the scans had no points; the identity is returned.
    EmptyScan,
    /// The inner solver could not move the estimate; the last estimate is returned.
    SolverFailed,
    /// The configuration does not validate; the initial estimate is returned.
    InvalidConfig,
}

/// Result of the ICP algorithm.
///
/// The transformation maps points of the previous scan into the frame of the current scan.
#[derive(Debug, Clone)]
pub struct ICPResult {
    /// Estimated incremental transform.
    pub pose: Pose2D,
    /// The total number of outer iterations performed.
    pub num_iterations: usize,
    /// Number of correspondences at the last iteration.
    pub num_correspondences: usize,
    /// Robustified cost at the returned pose over the last correspondences.
    ///
    /// Zero when there are no correspondences.
    pub cost: f64,
    /// Cost after every accepted step of the last inner solve.
    pub cost_history: Vec<f64>,
    /// Why the loop stopped.
    pub termination_reason: TerminationReason,
}

impl ICPResult {
    /// Identity result used when one of the scans is empty.
    pub fn empty_scan() -> Self {
        Self {
            pose: Pose2D::IDENTITY,
            num_iterations: 0,
            num_correspondences: 0,
            cost: 0.0,
            cost_history: Vec::new(),
            termination_reason: TerminationReason::EmptyScan,
        }
    }

    fn invalid_config(initial: Pose2D) -> Self {
        Self {
            pose: initial,
            termination_reason: TerminationReason::InvalidConfig,
            ..Self::empty_scan()
        }
    }

    /// Whether the estimate met the convergence tolerance.
    pub fn converged(&self) -> bool {
        self.termination_reason == TerminationReason::Converged
    }
}

/// Structure to define the ICP parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ICPConvergenceCriteria {
    /// Maximum number of outer iterations to perform.
    pub max_iterations: usize,
    /// Convergence tolerance on the norm of the pose update between two outer iterations.
    pub tolerance: f64,
    /// Minimum number of correspondences needed to run the solver.
    pub min_correspondences: usize,
}

impl Default for ICPConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
            min_correspondences: 3,
        }
    }
}

/// Iterative Closest Point (ICP) algorithm using point to line distance.
///
/// Every outer iteration re-associates the source points with line segments
/// of the target at the current estimate, then refines the estimate with a
/// robust Levenberg-Marquardt solve over those correspondences.
///
/// # Arguments
///
/// * `source` - The previous scan.
/// * `target` - The current scan.
/// * `index` - Spatial index built over `target`.
/// * `initial` - Initial estimate of the previous-to-current transform.
/// * `config` - Registration parameters.
///
/// # Returns
///
/// The estimate and its quality. An empty scan yields the identity, an
/// invalid configuration yields `initial`.
pub fn icp_point_to_line(
    source: &PointSet,
    target: &PointSet,
    index: &SpatialIndex,
    initial: Pose2D,
    config: &RegistrationConfig,
) -> ICPResult {
    let loss = match config.validate().and_then(|_| config.loss.build()) {
        Ok(loss) => loss,
        Err(err) => {
            log::error!("Not registering: {err}");
            return ICPResult::invalid_config(initial);
        }
    };

    if source.is_empty() || target.is_empty() {
        log::debug!(
            "Skipping registration: {} source and {} target points",
            source.len(),
            target.len()
        );
        return ICPResult::empty_scan();
    }

    let criteria = &config.criteria;
    let max_distance = config.gate.max_distance(target);

    let mut result = ICPResult {
        pose: initial,
        num_iterations: 0,
        num_correspondences: 0,
        cost: 0.0,
        cost_history: Vec::new(),
        termination_reason: TerminationReason::MaxIterations,
    };

    // main icp loop
    for i in 0..criteria.max_iterations {
        let now = std::time::Instant::now();

        let (correspondences, stats) =
            find_correspondences(source, target, index, &result.pose, max_distance);
        result.num_correspondences = correspondences.len();

        if correspondences.len() < criteria.min_correspondences {
            log::warn!(
                "Only {} correspondences at iteration {} ({} gated, {} insufficient, {} degenerate)",
                correspondences.len(),
                i,
                stats.num_gated,
                stats.num_insufficient,
                stats.num_degenerate
            );
            let constraints = correspondences
                .iter()
                .filter_map(|c| LineConstraint::from_correspondence(source, target, c))
                .collect::<Vec<_>>();
            result.cost = LevenbergMarquardt::cost(&constraints, &result.pose, loss.as_ref());
            result.cost_history.clear();
            result.termination_reason = TerminationReason::InsufficientCorrespondences;
            break;
        }

        let solved = config.solver.optimize(
            source,
            target,
            &correspondences,
            result.pose,
            loss.as_ref(),
        );

        let update = solved.pose.parameter_distance(&result.pose);
        result.pose = solved.pose;
        result.cost = solved.final_cost;
        result.cost_history = solved.cost_history;
        result.num_iterations += 1;

        log::debug!(
            "Iteration {}: {} correspondences, cost {:.6e}, update {:.3e}, solver {:?}, elapsed {:?}",
            i,
            correspondences.len(),
            result.cost,
            update,
            solved.termination_reason,
            now.elapsed()
        );

        // check convergence and exit if below tolerance
        if let Some(reason) = stop_reason(update, criteria.tolerance, solved.termination_reason) {
            result.termination_reason = reason;
            break;
        }
    }

    if result.termination_reason == TerminationReason::SolverFailed {
        log::warn!("ICP stalled after {} iterations", result.num_iterations);
    } else if result.termination_reason == TerminationReason::MaxIterations {
        log::warn!(
            "ICP did not converge in {} iterations, cost {:.6e}",
            result.num_iterations,
            result.cost
        );
    }

    result
}

// an update below tolerance only counts as convergence if the solver did not give up
fn stop_reason(
    update: f64,
    tolerance: f64,
    solver: SolverTermination,
) -> Option<TerminationReason> {
    if update >= tolerance {
        return None;
    }
    match solver {
        SolverTermination::SolveFailed
        | SolverTermination::LambdaMaxExceeded
        | SolverTermination::NoConstraints => Some(TerminationReason::SolverFailed),
        SolverTermination::CostConverged
        | SolverTermination::GradientConverged
        | SolverTermination::StepConverged
        | SolverTermination::MaxIterations => Some(TerminationReason::Converged),
    }
}
