//! End-to-end registration tests on a synthetic rectangular room.
//!
//! Scans are ray-cast from the sensor pose against the four walls of the
//! room, so consecutive scans sample the walls at different places just like
//! a real range sensor moving through the room.

use approx::assert_relative_eq;
use slam2d_icp::{
    icp_point_to_line, CorrespondenceGate, ICPResult, LossKind, Pose2D, RegistrationConfig,
    ScanMatcher, SpatialIndex, TerminationReason,
};
use slam2d_scan::{LaserEcho, LaserScan, MultiEchoLaserScan, PointSet};
use std::f64::consts::PI;

const ROOM_MIN: [f64; 2] = [-3.0, -2.0];
const ROOM_MAX: [f64; 2] = [5.0, 4.0];
const NUM_BEAMS: usize = 360;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn beam_angle(i: usize) -> f64 {
    -PI + i as f64 * 2.0 * PI / NUM_BEAMS as f64
}

/// Distance from `pose` to the room wall along the sensor-frame angle `angle`.
fn cast_ray(pose: &Pose2D, angle: f64) -> f64 {
    let (dy, dx) = (pose.theta + angle).sin_cos();
    let mut best = f64::INFINITY;
    let axes = [
        (dx, pose.x, ROOM_MIN[0], ROOM_MAX[0]),
        (dy, pose.y, ROOM_MIN[1], ROOM_MAX[1]),
    ];
    for (d, o, lo, hi) in axes {
        if d.abs() < 1e-12 {
            continue;
        }
        let wall = if d > 0.0 { hi } else { lo };
        best = best.min((wall - o) / d);
    }
    best
}

fn room_ranges(pose: &Pose2D) -> Vec<f32> {
    (0..NUM_BEAMS)
        .map(|i| cast_ray(pose, beam_angle(i)) as f32)
        .collect()
}

fn room_scan(pose: &Pose2D) -> LaserScan {
    LaserScan {
        angle_min: -PI as f32,
        angle_max: beam_angle(NUM_BEAMS - 1) as f32,
        angle_increment: (2.0 * PI / NUM_BEAMS as f64) as f32,
        range_min: 0.05,
        range_max: 30.0,
        ranges: room_ranges(pose),
    }
}

fn room_points(pose: &Pose2D) -> Result<PointSet, Box<dyn std::error::Error>> {
    let points = (0..NUM_BEAMS)
        .map(|i| {
            let angle = beam_angle(i);
            let d = cast_ray(pose, angle);
            [d * angle.cos(), d * angle.sin()]
        })
        .collect();
    Ok(PointSet::from_points(points)?)
}

fn transformed(points: &PointSet, pose: &Pose2D) -> Result<PointSet, Box<dyn std::error::Error>> {
    Ok(PointSet::from_points(
        points
            .iter()
            .map(|p| pose.transform_point(p).to_array())
            .collect(),
    )?)
}

/// Transform that maps points seen from `prev` into the frame of `curr`.
fn true_delta(prev: &Pose2D, curr: &Pose2D) -> Pose2D {
    curr.inverse().compose(prev)
}

fn register(source: &PointSet, target: &PointSet, config: &RegistrationConfig) -> ICPResult {
    let index = SpatialIndex::new(target);
    icp_point_to_line(source, target, &index, Pose2D::IDENTITY, config)
}

#[test]
fn identity_registration() -> TestResult {
    let scan = room_points(&Pose2D::IDENTITY)?;
    let result = register(&scan, &scan, &RegistrationConfig::default());

    assert!(result.converged());
    assert!(result.pose.parameter_distance(&Pose2D::IDENTITY) < 1e-6);
    Ok(())
}

#[test]
fn known_translation_recovery() -> TestResult {
    let prev = room_points(&Pose2D::IDENTITY)?;
    let offset = Pose2D::new(0.1, -0.05, 0.0);
    let curr = transformed(&prev, &offset)?;

    let result = register(&prev, &curr, &RegistrationConfig::default());

    assert!(result.converged());
    assert_relative_eq!(result.pose.x, offset.x, max_relative = 0.01);
    assert_relative_eq!(result.pose.y, offset.y, max_relative = 0.01);
    assert!(result.pose.theta.abs() < 1e-4);
    Ok(())
}

#[test]
fn known_rotation_recovery() -> TestResult {
    let prev = room_points(&Pose2D::IDENTITY)?;
    let rotation = Pose2D::new(0.0, 0.0, 0.02);
    let curr = transformed(&prev, &rotation)?;

    let result = register(&prev, &curr, &RegistrationConfig::default());

    assert!(result.converged());
    assert_relative_eq!(result.pose.theta, 0.02, epsilon = 1e-3);
    assert!(result.pose.translation().length() < 1e-3);
    Ok(())
}

#[test]
fn resampled_motion_recovery() -> TestResult {
    let prev_pose = Pose2D::new(0.2, 0.1, 0.05);
    let curr_pose = Pose2D::new(0.28, 0.13, 0.07);
    let prev = room_points(&prev_pose)?;
    let curr = room_points(&curr_pose)?;

    let result = register(&prev, &curr, &RegistrationConfig::default());
    let expected = true_delta(&prev_pose, &curr_pose);

    assert!(result.pose.parameter_distance(&expected) < 5e-3);
    Ok(())
}

#[test]
fn empty_scan_is_safe() -> TestResult {
    let scan = room_points(&Pose2D::IDENTITY)?;
    let empty = PointSet::new();
    let config = RegistrationConfig::default();

    let result = register(&empty, &scan, &config);
    assert_eq!(result.termination_reason, TerminationReason::EmptyScan);
    assert_eq!(result.pose, Pose2D::IDENTITY);

    let result = register(&scan, &empty, &config);
    assert_eq!(result.termination_reason, TerminationReason::EmptyScan);
    assert_eq!(result.pose, Pose2D::IDENTITY);
    Ok(())
}

#[test]
fn robust_loss_resists_outliers() -> TestResult {
    let prev_clean = room_points(&Pose2D::IDENTITY)?;
    let offset = Pose2D::new(0.05, 0.03, 0.0);
    let curr = transformed(&prev_clean, &offset)?;

    // every 20th point is shifted off its wall by the same vector
    let prev = PointSet::from_points(
        prev_clean
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i % 20 == 0 {
                    [p.x + 0.6, p.y + 0.4]
                } else {
                    p.to_array()
                }
            })
            .collect(),
    )?;

    let cauchy = RegistrationConfig {
        gate: CorrespondenceGate::None,
        ..Default::default()
    };
    let l2 = RegistrationConfig {
        loss: LossKind::L2,
        ..cauchy.clone()
    };

    let l2_error = register(&prev, &curr, &l2).pose.parameter_distance(&offset);
    let cauchy_error = register(&prev, &curr, &cauchy)
        .pose
        .parameter_distance(&offset);

    assert!(
        cauchy_error < l2_error,
        "cauchy error {cauchy_error} not below l2 error {l2_error}"
    );
    Ok(())
}

#[test]
fn matcher_tracks_translation() -> TestResult {
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;
    let step = 0.05;

    for k in 0..6 {
        let pose = Pose2D::new(k as f64 * step, 0.0, 0.0);
        let result = matcher.update(&room_scan(&pose))?;
        if k == 0 {
            assert_eq!(result.termination_reason, TerminationReason::EmptyScan);
            continue;
        }
        assert_relative_eq!(matcher.delta().x, -step, epsilon = 5e-3);
        assert!(matcher.delta().y.abs() < 5e-3);
    }

    // the state follows the sensor, not the point transform
    assert_relative_eq!(matcher.state().x, 5.0 * step, epsilon = 2e-2);
    assert!(matcher.state().theta.abs() < 5e-3);
    assert_eq!(matcher.scan().len(), NUM_BEAMS);
    Ok(())
}

#[test]
fn matcher_tracks_mixed_motion() -> TestResult {
    let trajectory = [
        Pose2D::IDENTITY,
        Pose2D::new(0.1, 0.0, 0.1),
        Pose2D::new(0.2, 0.05, 0.2),
        Pose2D::new(0.25, 0.15, 0.3),
    ];
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;

    for (k, pose) in trajectory.iter().enumerate() {
        matcher.update(&room_scan(pose))?;
        if k == 0 {
            continue;
        }

        let expected = true_delta(&trajectory[k - 1], pose);
        assert!(matcher.delta().parameter_distance(&expected) < 5e-3);
        assert!(matcher.state().parameter_distance(pose) < 1e-2);
    }

    let last = trajectory[trajectory.len() - 1];
    assert_relative_eq!(matcher.state().x, last.x, epsilon = 1e-2);
    assert_relative_eq!(matcher.state().y, last.y, epsilon = 1e-2);
    assert_relative_eq!(matcher.state().theta, last.theta, epsilon = 5e-3);
    Ok(())
}

#[test]
fn matcher_repeated_scan_keeps_state() -> TestResult {
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;
    let scan = room_scan(&Pose2D::new(0.5, 0.5, 0.3));

    matcher.update(&scan)?;
    let result = matcher.update(&scan)?;

    assert!(result.converged());
    assert!(matcher.delta().parameter_distance(&Pose2D::IDENTITY) < 1e-6);
    assert!(matcher.state().parameter_distance(&Pose2D::IDENTITY) < 1e-6);
    Ok(())
}

#[test]
fn matcher_multi_echo_uses_first_echo() -> TestResult {
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;

    for k in 0..3 {
        let pose = Pose2D::new(0.0, k as f64 * 0.04, 0.0);
        let ranges = room_ranges(&pose)
            .into_iter()
            .enumerate()
            .map(|(i, r)| LaserEcho {
                // later echoes are spurious returns that must be ignored
                echoes: if i % 50 == 7 { Vec::new() } else { vec![r, r + 1.5] },
            })
            .collect::<Vec<_>>();
        let scan = MultiEchoLaserScan {
            angle_min: -PI as f32,
            angle_max: beam_angle(NUM_BEAMS - 1) as f32,
            angle_increment: (2.0 * PI / NUM_BEAMS as f64) as f32,
            range_min: 0.05,
            range_max: 30.0,
            ranges,
        };

        matcher.update(&scan)?;
        // beams without echoes are dropped
        assert!(matcher.scan().len() < NUM_BEAMS);
        if k > 0 {
            assert_relative_eq!(matcher.delta().y, -0.04, epsilon = 5e-3);
        }
    }
    Ok(())
}

#[test]
fn matcher_malformed_ranges_are_dropped() -> TestResult {
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;
    let mut scan = room_scan(&Pose2D::IDENTITY);
    scan.ranges[3] = f32::NAN;
    scan.ranges[10] = -1.0;
    scan.ranges[11] = f32::INFINITY;
    scan.ranges[12] = 0.0;

    matcher.update(&scan)?;
    assert_eq!(matcher.scan().len(), NUM_BEAMS - 4);
    assert!(!matcher.scan().sample_indices().contains(&3));
    assert!(matcher.scan().sample_indices().contains(&4));
    Ok(())
}

#[test]
fn matcher_rejects_invalid_angles() -> TestResult {
    let mut matcher = ScanMatcher::new(RegistrationConfig::default())?;
    let mut scan = room_scan(&Pose2D::IDENTITY);
    scan.angle_increment = f32::NAN;
    assert!(matcher.update(&scan).is_err());
    assert!(matcher.last_result().is_none());
    Ok(())
}
