use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use planar_measure::Scene;

#[derive(Parser, Debug)]
#[command(
    name = "planar-measure",
    version,
    about = "Metric distances between points tapped on a camera frame"
)]
struct Cli {
    /// Log level for stderr output (off, error, warn, info, debug, trace).
    /// With the `tracing` feature, a set `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure the distance between the two points of a scene.
    Measure {
        /// Scene JSON file.
        #[arg(long)]
        scene: PathBuf,
        /// Print a JSON report instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Estimate the image-to-world homography of the scene rectangle.
    Calibrate {
        /// Scene JSON file.
        #[arg(long)]
        scene: PathBuf,
    },
}

#[derive(Serialize)]
struct CalibrationReport {
    homography: [[f64; 3]; 3],
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: &str) {
    let _ = planar_measure::core::init_with_level(planar_measure::core::level_from_name(level));
}

#[cfg(feature = "tracing")]
fn init_logging(level: &str) {
    planar_measure::core::init_tracing(level, false);
    let _ = tracing_log::LogTracer::init();
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Measure { scene, json } => {
            let report = Scene::load(&scene)?.evaluate()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Distance: {}", report.display);
                println!("Status: {}", report.status);
                if let Some(reason) = &report.unavailable {
                    println!("Note: {reason}");
                }
            }
        }
        Command::Calibrate { scene } => {
            let homography = Scene::load(&scene)?.calibrate()?;
            let report = CalibrationReport { homography };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
