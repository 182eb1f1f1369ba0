use argh::FromArgs;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::PathBuf};

use picalign::calib::{
    parse_distance, AutoCalibration, CalibrationConfig, CalibrationOutcome, CalibrationReport,
    CalibrationState, MercatorView, PictureLayer, PlacedPicture,
};
use picalign::geometry::{DAffine2, DVec2};

#[derive(FromArgs)]
/// Calibrate a picture from a JSON job file and print the result as JSON
struct Args {
    /// path to the job file
    #[argh(option, short = 'j')]
    job_path: PathBuf,

    /// distance between the second and third reference point in meters, replaces the job value
    #[argh(option)]
    distance_12: Option<String>,

    /// side ratio tolerance, replaces the job value
    #[argh(option, short = 't')]
    tolerance: Option<f64>,
}

#[derive(Deserialize)]
struct Placement {
    position: DVec2,
    scale: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            scale: 1.0,
        }
    }
}

#[derive(Deserialize)]
struct Job {
    view: MercatorView,
    #[serde(default)]
    placement: Placement,
    image_points: Vec<DVec2>,
    reference_points: Vec<DVec2>,
    distance_01: String,
    distance_12: String,
    #[serde(default)]
    config: CalibrationConfig,
}

#[derive(Serialize)]
struct Output<'a> {
    outcome: CalibrationOutcome,
    state: CalibrationState,
    report: Option<&'a CalibrationReport>,
    error: Option<String>,
    matrix: DAffine2,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut job: Job = serde_json::from_reader(BufReader::new(File::open(&args.job_path)?))?;
    if let Some(tolerance) = args.tolerance {
        job.config.ratio_tolerance = tolerance;
    }

    let mut calibration = AutoCalibration::new(job.config, job.view);
    calibration.start(PlacedPicture::at(
        job.placement.position,
        job.placement.scale,
    ));

    for point in job.image_points {
        calibration.add_origin_point(point)?;
    }
    for point in job.reference_points {
        calibration.add_reference_point(point)?;
    }

    let distance_12 = args.distance_12.as_deref().unwrap_or(&job.distance_12);
    calibration.set_distance_01(parse_distance(&job.distance_01)?)?;
    calibration.set_distance_12(parse_distance(distance_12)?)?;
    log::info!("state before calibration: {:?}", calibration.state());

    let result = calibration.calibrate();
    if let Err(err) = &result {
        log::warn!("{err}");
    }

    let output = Output {
        outcome: CalibrationOutcome::of(&result),
        state: calibration.state(),
        report: result.as_ref().ok(),
        error: result.as_ref().err().map(ToString::to_string),
        matrix: calibration
            .layer()
            .map(|layer| layer.transform().matrix())
            .unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
