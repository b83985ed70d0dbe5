use slam2d_scan::{estimate_normals, Normals, PointSet, ScanError, ScanSource};

use crate::config::{ConfigError, RegistrationConfig};
use crate::icp_point_to_line::{icp_point_to_line, ICPResult};
use crate::pose::Pose2D;
use crate::spatial_index::SpatialIndex;
use crate::state::RegistrationState;

/// Incremental scan-to-scan registration.
///
/// Every new scan is registered against the previous one, the estimated
/// incremental transform is folded into the running pose and the new scan
/// becomes the reference for the next call.
///
/// # Example
///
/// ```
/// use slam2d_icp::{RegistrationConfig, ScanMatcher};
/// use slam2d_scan::LaserScan;
///
/// let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;
/// let scan = LaserScan {
///     angle_min: -1.0,
///     angle_max: 1.0,
///     angle_increment: 0.01,
///     range_min: 0.1,
///     range_max: 10.0,
///     ranges: vec![2.0; 201],
/// };
/// matcher.update(&scan)?;
/// let result = matcher.update(&scan)?;
/// assert!(result.pose.x.abs() < 1e-6);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScanMatcher {
    config: RegistrationConfig,
    state: RegistrationState,
    scan: PointSet,
    normals: Normals,
    last_result: Option<ICPResult>,
}

impl ScanMatcher {
    /// Create a matcher starting at the origin.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration does not validate.
    pub fn new(config: RegistrationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RegistrationState::default(),
            scan: PointSet::new(),
            normals: Normals::default(),
            last_result: None,
        })
    }

    /// Register a new sensor message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be converted into a point set.
    pub fn update<S: ScanSource + ?Sized>(&mut self, source: &S) -> Result<ICPResult, ScanError> {
        let points = source.to_point_set()?;
        Ok(self.update_points(points))
    }

    /// Register a new point set against the previous one.
    ///
    /// The returned transform maps the previous scan into the frame of
    /// `points`. When either scan is empty the identity is returned and the
    /// running pose is left untouched.
    pub fn update_points(&mut self, points: PointSet) -> ICPResult {
        self.normals = estimate_normals(&points);

        let result = if self.scan.is_empty() || points.is_empty() {
            log::debug!(
                "Not registering: {} previous and {} current points",
                self.scan.len(),
                points.len()
            );
            self.state.delta = Pose2D::IDENTITY;
            ICPResult::empty_scan()
        } else {
            let index = SpatialIndex::new(&points);
            let result = icp_point_to_line(
                &self.scan,
                &points,
                &index,
                Pose2D::IDENTITY,
                &self.config,
            );
            self.state.integrate(result.pose);
            result
        };

        log::debug!(
            "Scan {} points, delta {:?}, state {:?}",
            points.len(),
            self.state.delta,
            self.state.state
        );

        self.scan = points;
        self.last_result = Some(result.clone());
        result
    }

    /// Pose of the sensor in the frame of the first scan.
    ///
    /// Each update composes it with the inverse of [`Self::delta`].
    pub fn state(&self) -> Pose2D {
        self.state.state
    }

    /// Transform of the latest update, mapping points of the previous scan
    /// into the frame of the current scan.
    pub fn delta(&self) -> Pose2D {
        self.state.delta
    }

    /// Running state, pose and delta together.
    pub fn registration_state(&self) -> &RegistrationState {
        &self.state
    }

    /// The latest scan, reference for the next update.
    pub fn scan(&self) -> &PointSet {
        &self.scan
    }

    /// Normals of the latest scan.
    pub fn normals(&self) -> &Normals {
        &self.normals
    }

    /// Outcome of the latest update, if any.
    pub fn last_result(&self) -> Option<&ICPResult> {
        self.last_result.as_ref()
    }

    /// The configuration in use.
    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Forget the previous scan and restart from the origin.
    pub fn reset(&mut self) {
        self.state = RegistrationState::default();
        self.scan = PointSet::new();
        self.normals = Normals::default();
        self.last_result = None;
    }
}
