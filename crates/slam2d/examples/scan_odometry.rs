use argh::FromArgs;
use rand::Rng;
use std::path::PathBuf;

use slam2d::icp::{Pose2D, RegistrationConfig, ScanMatcher};
use slam2d::scan::LaserScan;

#[derive(FromArgs)]
/// Scan-to-scan odometry on a simulated rectangular room
struct Args {
    /// path to a JSON registration config
    #[argh(option)]
    config: Option<PathBuf>,

    /// number of scans to simulate
    #[argh(option, default = "20")]
    num_scans: usize,

    /// forward motion between scans in meters
    #[argh(option, default = "0.04")]
    step: f64,

    /// number of beams per scan
    #[argh(option, default = "720")]
    num_beams: usize,

    /// half-width of the uniform range noise in meters
    #[argh(option, default = "0.005")]
    noise: f64,

    /// print the effective config as JSON and exit
    #[argh(switch)]
    print_config: bool,
}

const ROOM: [f64; 4] = [-3.0, 5.0, -2.0, 4.0];

fn simulate_scan(pose: &Pose2D, num_beams: usize, noise: f64, rng: &mut impl Rng) -> LaserScan {
    let increment = 2.0 * std::f64::consts::PI / num_beams as f64;
    let ranges = (0..num_beams)
        .map(|i| {
            let (dy, dx) = (pose.theta - std::f64::consts::PI + i as f64 * increment).sin_cos();
            let wall_x = if dx > 0.0 { ROOM[1] } else { ROOM[0] };
            let wall_y = if dy > 0.0 { ROOM[3] } else { ROOM[2] };
            let d = ((wall_x - pose.x) / dx).min((wall_y - pose.y) / dy);
            let n = if noise > 0.0 {
                rng.random_range(-noise..=noise)
            } else {
                0.0
            };
            (d + n) as f32
        })
        .collect();

    LaserScan {
        angle_min: -std::f64::consts::PI as f32,
        angle_max: (std::f64::consts::PI - increment) as f32,
        angle_increment: increment as f32,
        range_min: 0.05,
        range_max: 30.0,
        ranges,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => RegistrationConfig::from_json_file(path)?,
        None => RegistrationConfig::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut matcher = ScanMatcher::new(config)?;
    let mut rng = rand::rng();

    // gentle arc through the room
    let trajectory = (0..args.num_scans)
        .map(|k| {
            let s = k as f64;
            Pose2D::new(args.step * s, 0.5 * (0.1 * s).sin(), 0.01 * s)
        })
        .collect::<Vec<_>>();

    let mut max_error = 0.0f64;
    for (k, pose) in trajectory.iter().enumerate() {
        let scan = simulate_scan(pose, args.num_beams, args.noise, &mut rng);
        let result = matcher.update(&scan)?;

        if k == 0 {
            log::info!("Reference scan: {} points", matcher.scan().len());
            continue;
        }

        let expected = trajectory[k].inverse().compose(&trajectory[k - 1]);
        let error = result.pose.parameter_distance(&expected);
        max_error = max_error.max(error);

        let drift = matcher.state().parameter_distance(pose);
        log::info!(
            "Scan {k}: delta ({:.4}, {:.4}, {:.4}), error {error:.2e}, drift {drift:.2e}, {:?}",
            result.pose.x,
            result.pose.y,
            result.pose.theta,
            result.termination_reason
        );
    }

    let state = matcher.state();
    let drift = trajectory
        .last()
        .map_or(0.0, |pose| state.parameter_distance(pose));
    println!(
        "{} scans, final state ({:.4}, {:.4}, {:.4}), drift {:.2e}, max delta error {:.2e}",
        args.num_scans, state.x, state.y, state.theta, drift, max_error
    );

    Ok(())
}
