#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Surface normal estimation over ordered scans.
pub mod normals;

/// Ordered 2D point sets built from range samples.
pub mod pointset;

/// Range sensor messages and their conversion into point sets.
pub mod sensor;

pub use normals::{estimate_normals, Normals};
pub use pointset::{PointSet, PolarSample, ScanError};
pub use sensor::{LaserEcho, LaserScan, MultiEchoLaserScan, ScanSource};
