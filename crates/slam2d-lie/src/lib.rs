#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # 2D Lie groups
//!
//! Rotations and rigid body transformations of the plane used to represent
//! and compose sensor poses.
//!
//! - **SO(2)**: 2D rotation group, stored as a unit complex number
//! - **SE(2)**: 2D rigid body transformations (rotation + translation)
//!
//! ## Example
//!
//! ```rust
//! use slam2d_lie::{se2::SE2, so2::SO2};
//! use glam::DVec2;
//!
//! let pose = SE2::new(SO2::exp(std::f64::consts::FRAC_PI_2), DVec2::new(1.0, 0.0));
//! let p = pose * DVec2::new(1.0, 0.0);
//! assert!((p - DVec2::new(1.0, 1.0)).length() < 1e-12);
//! ```

/// Special Euclidean group SE(2) for 2D rigid transformations.
pub mod se2;

/// Special Orthogonal group SO(2) for 2D rotations.
pub mod so2;

/// Wrap an angle to the interval `(-pi, pi]`.
pub fn wrap_angle(theta: f64) -> f64 {
    let wrapped = theta.sin().atan2(theta.cos());
    if wrapped <= -std::f64::consts::PI {
        wrapped + std::f64::consts::TAU
    } else {
        wrapped
    }
}
