use glam::DVec2;

/// Errors raised while building a [`PointSet`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScanError {
    /// The scan geometry cannot place samples at an angle.
    #[error("Invalid scan angles: angle_min={angle_min}, angle_increment={angle_increment}")]
    InvalidAngles {
        /// Angle of the first sample in radians.
        angle_min: f64,
        /// Angular step between consecutive samples in radians.
        angle_increment: f64,
    },

    /// A cartesian point has a NaN or infinite coordinate.
    #[error("Point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Position of the offending point in the input.
        index: usize,
    },
}

/// A single range measurement in polar form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarSample {
    /// Measured distance in meters.
    pub distance: f64,
    /// Beam angle in radians.
    pub angle: f64,
}

impl PolarSample {
    /// Create a new polar sample.
    pub fn new(distance: f64, angle: f64) -> Self {
        Self { distance, angle }
    }

    /// Whether the sample holds a usable distance.
    ///
    /// NaN, infinite and non-positive distances are malformed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.distance.is_finite() && self.distance > 0.0 && self.angle.is_finite()
    }

    /// Convert the sample to cartesian coordinates in the sensor frame.
    #[inline]
    pub fn to_cartesian(&self) -> [f64; 2] {
        let (sin, cos) = self.angle.sin_cos();
        [self.distance * cos, self.distance * sin]
    }
}

/// An ordered set of 2D points in angular scan order.
///
/// Consecutive indices are adjacent in beam angle, which is not the same as
/// being close in space: a beam that grazes an edge may land far away from
/// its predecessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    // The points in the sensor frame.
    points: Vec<[f64; 2]>,
    // For every point, the index of the raw sample it was built from.
    sample_indices: Vec<usize>,
}

impl PointSet {
    /// Create an empty point set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point set from polar samples, dropping malformed ones.
    ///
    /// Samples with a non-finite or non-positive distance are discarded; the
    /// remaining samples keep their relative order.
    pub fn from_polar<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = PolarSample>,
    {
        Self::from_polar_within(samples, 0.0, f64::INFINITY)
    }

    /// Create a point set from polar samples whose distance lies in `[range_min, range_max]`.
    ///
    /// Malformed samples are dropped as in [`PointSet::from_polar`]. A
    /// non-finite bound is treated as unbounded on that side.
    pub fn from_polar_within<I>(samples: I, range_min: f64, range_max: f64) -> Self
    where
        I: IntoIterator<Item = PolarSample>,
    {
        let range_min = if range_min.is_finite() { range_min } else { 0.0 };
        let range_max = if range_max.is_finite() {
            range_max
        } else {
            f64::INFINITY
        };

        let mut points = Vec::new();
        let mut sample_indices = Vec::new();
        let mut num_dropped = 0;

        for (i, sample) in samples.into_iter().enumerate() {
            if !sample.is_valid() || sample.distance < range_min || sample.distance > range_max {
                num_dropped += 1;
                continue;
            }
            points.push(sample.to_cartesian());
            sample_indices.push(i);
        }

        if num_dropped > 0 {
            log::debug!(
                "Dropped {} of {} range samples",
                num_dropped,
                num_dropped + points.len()
            );
        }

        Self {
            points,
            sample_indices,
        }
    }

    /// Create a point set from cartesian points, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NonFinitePoint`] if any coordinate is NaN or infinite.
    pub fn from_points(points: Vec<[f64; 2]>) -> Result<Self, ScanError> {
        if let Some(index) = points
            .iter()
            .position(|p| !(p[0].is_finite() && p[1].is_finite()))
        {
            return Err(ScanError::NonFinitePoint { index });
        }
        let sample_indices = (0..points.len()).collect();
        Ok(Self {
            points,
            sample_indices,
        })
    }

    /// Get the number of points in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the raw points.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Get the raw sample index each point was built from.
    pub fn sample_indices(&self) -> &[usize] {
        &self.sample_indices
    }

    /// Get the point at `index`, if any.
    #[inline]
    pub fn point(&self, index: usize) -> Option<DVec2> {
        self.points.get(index).map(|p| DVec2::from_array(*p))
    }

    /// Iterate over the points in scan order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = DVec2> + '_ {
        self.points.iter().map(|p| DVec2::from_array(*p))
    }

    /// Median distance between consecutive points.
    ///
    /// Returns `None` when the set holds fewer than two points.
    pub fn resolution(&self) -> Option<f64> {
        if self.points.len() < 2 {
            return None;
        }
        let mut gaps = self
            .points
            .windows(2)
            .map(|w| DVec2::from_array(w[0]).distance(DVec2::from_array(w[1])))
            .collect::<Vec<_>>();
        gaps.sort_by(|a, b| a.total_cmp(b));
        Some(gaps[gaps.len() / 2])
    }
}

impl std::ops::Index<usize> for PointSet {
    type Output = [f64; 2];

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}
