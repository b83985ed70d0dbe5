#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod config;
pub use config::*;

mod correspondence;
pub use correspondence::{find_correspondences, Correspondence, CorrespondenceStats};

mod engine;
pub use engine::ScanMatcher;

mod icp_point_to_line;
pub use icp_point_to_line::*;

/// Robust loss functions.
pub mod losses;

mod pose;
pub use pose::Pose2D;

mod solver;
pub use solver::{LevenbergMarquardt, LineConstraint, SolverResult, SolverTermination};

mod spatial_index;
pub use spatial_index::{Neighbor, SpatialIndex};

mod state;
pub use state::RegistrationState;
