use serde::{Deserialize, Serialize};

use crate::pointset::{PointSet, PolarSample, ScanError};

/// A source of ordered range samples that can be turned into a [`PointSet`].
///
/// Every sensor message format gets one implementation; the registration
/// code only ever sees the resulting point set.
pub trait ScanSource {
    /// Angle of the first sample in radians.
    fn angle_min(&self) -> f64;

    /// Angular step between consecutive samples in radians.
    fn angle_increment(&self) -> f64;

    /// Number of samples in the scan.
    fn num_samples(&self) -> usize;

    /// Distance reported for sample `index`, `NaN` if the sample carries none.
    fn distance(&self, index: usize) -> f64;

    /// Valid measurement window `(range_min, range_max)` in meters.
    fn range_limits(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    /// Produce the polar samples in scan order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidAngles`] if the scan angles are not finite.
    fn polar_samples(&self) -> Result<Vec<PolarSample>, ScanError> {
        let angle_min = self.angle_min();
        let angle_increment = self.angle_increment();
        if !(angle_min.is_finite() && angle_increment.is_finite()) {
            return Err(ScanError::InvalidAngles {
                angle_min,
                angle_increment,
            });
        }

        Ok((0..self.num_samples())
            .map(|i| PolarSample::new(self.distance(i), angle_min + i as f64 * angle_increment))
            .collect())
    }

    /// Convert the scan into a point set, dropping malformed samples.
    fn to_point_set(&self) -> Result<PointSet, ScanError> {
        let (range_min, range_max) = self.range_limits();
        Ok(PointSet::from_polar_within(
            self.polar_samples()?,
            range_min,
            range_max,
        ))
    }
}

/// A single-echo planar laser scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// The angle (in radians) where the scan starts.
    pub angle_min: f32,
    /// The angle (in radians) where the scan ends.
    pub angle_max: f32,
    /// The angular difference (in radians) between consecutive samples.
    pub angle_increment: f32,
    /// The minimum range (in meters) of valid distance measurements.
    pub range_min: f32,
    /// The maximum range (in meters) of valid distance measurements.
    pub range_max: f32,
    /// Distance measurements (in meters) for each angle.
    pub ranges: Vec<f32>,
}

impl ScanSource for LaserScan {
    fn angle_min(&self) -> f64 {
        self.angle_min as f64
    }

    fn angle_increment(&self) -> f64 {
        self.angle_increment as f64
    }

    fn num_samples(&self) -> usize {
        self.ranges.len()
    }

    fn distance(&self, index: usize) -> f64 {
        self.ranges.get(index).map_or(f64::NAN, |&r| r as f64)
    }

    fn range_limits(&self) -> (f64, f64) {
        range_limits(self.range_min, self.range_max)
    }
}

/// All echoes returned by one beam of a multi-echo scanner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserEcho {
    /// Echo distances in meters, strongest return first.
    pub echoes: Vec<f32>,
}

/// A planar laser scan reporting several echoes per beam.
///
/// Only the first echo of every beam is used; later echoes are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiEchoLaserScan {
    /// The angle (in radians) where the scan starts.
    pub angle_min: f32,
    /// The angle (in radians) where the scan ends.
    pub angle_max: f32,
    /// The angular difference (in radians) between consecutive beams.
    pub angle_increment: f32,
    /// The minimum range (in meters) of valid distance measurements.
    pub range_min: f32,
    /// The maximum range (in meters) of valid distance measurements.
    pub range_max: f32,
    /// Echoes for each beam.
    pub ranges: Vec<LaserEcho>,
}

impl ScanSource for MultiEchoLaserScan {
    fn angle_min(&self) -> f64 {
        self.angle_min as f64
    }

    fn angle_increment(&self) -> f64 {
        self.angle_increment as f64
    }

    fn num_samples(&self) -> usize {
        self.ranges.len()
    }

    fn distance(&self, index: usize) -> f64 {
        self.ranges
            .get(index)
            .and_then(|beam| beam.echoes.first())
            .map_or(f64::NAN, |&r| r as f64)
    }

    fn range_limits(&self) -> (f64, f64) {
        range_limits(self.range_min, self.range_max)
    }
}

// a zero or inverted window means the sensor did not advertise one
fn range_limits(range_min: f32, range_max: f32) -> (f64, f64) {
    if range_max > range_min && range_max > 0.0 {
        (range_min.max(0.0) as f64, range_max as f64)
    } else {
        (0.0, f64::INFINITY)
    }
}
