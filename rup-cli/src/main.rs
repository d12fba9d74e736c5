//! undistort-point: recover undistorted pixel coordinates for a calibrated camera.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rup_core::{
    Intrinsics, PixelPoint, PointUndistorter, RupError, SolveOutcome, SolverOptions,
    DEFAULT_MAX_ITERATIONS,
};
use rup_io::{default_intrinsics, load_intrinsics_or_default, to_yaml_string, IntrinsicsSource};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "undistort-point")]
#[command(version, about = "Compute undistorted pixel coordinates under Brown-Conrady distortion")]
struct Args {
    /// Camera parameter file (YAML). Built-in defaults are used if it cannot be read.
    #[arg(default_value = "camera.yaml")]
    camera: PathBuf,

    /// Distorted pixel as X,Y. Repeatable. Defaults to the four image corners.
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    points: Vec<PixelPoint>,

    /// Maximum solver iterations per point.
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Print results as a JSON array.
    #[arg(long)]
    json: bool,

    /// Print the solver report for every point.
    #[arg(long)]
    report: bool,

    /// Log solver progress.
    #[arg(short, long)]
    verbose: bool,

    /// Print the default camera file and exit.
    #[arg(long)]
    print_defaults: bool,
}

#[derive(Debug, Serialize)]
struct PointReport {
    distorted: [f64; 2],
    undistorted: Option<[f64; 2]>,
    last_estimate: [f64; 2],
    termination: String,
    message: String,
    iterations: usize,
    initial_cost: f64,
    final_cost: f64,
}

impl PointReport {
    fn new(observed: &PixelPoint, outcome: &SolveOutcome) -> Self {
        let summary = outcome.summary();
        let estimate = outcome.estimate();
        Self {
            distorted: [observed.x, observed.y],
            undistorted: outcome.point().map(|p| [p.x, p.y]),
            last_estimate: [estimate.x, estimate.y],
            termination: summary.termination_type().to_string(),
            message: summary.termination.to_string(),
            iterations: summary.iterations.len(),
            initial_cost: summary.initial_cost,
            final_cost: summary.final_cost,
        }
    }
}

fn parse_point(s: &str) -> Result<PixelPoint, RupError> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| RupError::InvalidInput(format!("expected X,Y but got '{s}'")))?;

    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| RupError::InvalidInput(format!("invalid coordinate '{v}' in '{s}'")))
    };

    Ok(PixelPoint::new(parse(x)?, parse(y)?))
}

fn format_outcome(observed: &PixelPoint, outcome: &SolveOutcome) -> String {
    match outcome.point() {
        Some(p) => format!(
            "Distorted: ({}, {}) vs Undistorted: ({}, {})",
            observed.x, observed.y, p.x, p.y
        ),
        None => format!(
            "Failed to compute undistorted coordinates for point ({}, {})!",
            observed.x, observed.y
        ),
    }
}

fn log_progress(observed: &PixelPoint, outcome: &SolveOutcome) {
    let summary = outcome.summary();
    for it in &summary.iterations {
        debug!(
            point = %format!("({}, {})", observed.x, observed.y),
            iter = it.iteration,
            cost = it.cost,
            cost_change = it.cost_change,
            gradient = it.gradient_max_norm,
            step = it.step_norm,
            rho = it.relative_decrease,
            radius = it.trust_region_radius,
            accepted = it.step_is_successful,
        );
    }
    if let SolveOutcome::Failed {
        reason,
        last_estimate,
        ..
    } = outcome
    {
        warn!(
            "Point ({}, {}) did not converge: {reason}; last estimate ({}, {})",
            observed.x, observed.y, last_estimate.x, last_estimate.y
        );
    }
}

fn run(args: &Args, intrinsics: Intrinsics) -> Result<String, Box<dyn Error>> {
    let points = if args.points.is_empty() {
        intrinsics.image_corners().to_vec()
    } else {
        args.points.clone()
    };

    let options = SolverOptions::default().with_max_iterations(args.max_iterations);
    let undistorter = PointUndistorter::with_options(intrinsics, options);
    let outcomes = undistorter.undistort_all(&points);

    for (observed, outcome) in points.iter().zip(&outcomes) {
        log_progress(observed, outcome);
    }

    if args.json {
        let reports: Vec<PointReport> = points
            .iter()
            .zip(&outcomes)
            .map(|(p, o)| PointReport::new(p, o))
            .collect();
        return Ok(serde_json::to_string_pretty(&reports)?);
    }

    let mut lines = Vec::with_capacity(points.len() * 2);
    for (observed, outcome) in points.iter().zip(&outcomes) {
        lines.push(format_outcome(observed, outcome));
        if args.report {
            lines.push(format!("  {}", outcome.summary().brief_report()));
        }
    }
    Ok(lines.join("\n"))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.print_defaults {
        print!("{}", to_yaml_string(&default_intrinsics()?)?);
        return Ok(());
    }

    let loaded = load_intrinsics_or_default(&args.camera)?;
    if loaded.source == IntrinsicsSource::Defaults {
        info!("Using built-in camera parameters");
    }

    let output = run(&args, loaded.intrinsics)?;
    println!("{output}");
    Ok(())
}
