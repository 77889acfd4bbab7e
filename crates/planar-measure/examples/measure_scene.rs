//! Replay a scene file through a measuring session and print the result.
//!
//! ```text
//! cargo run -p planar-measure --example measure_scene -- testdata/scene_rectangle.json
//! ```

use std::env;
use std::path::PathBuf;

use log::{info, warn, LevelFilter};
use planar_measure::core::init_with_level;
use planar_measure::Scene;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)?;

    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("testdata/scene_rectangle.json"));
    info!("loading scene {}", path.display());

    let scene = Scene::load(&path)?;
    let session = scene.replay()?;
    info!("calibration status: {}", session.status());

    match session.measure() {
        Ok(m) => info!("distance via {:?}: {:.4} m", m.method, m.meters),
        Err(err) => warn!("{err}"),
    }
    println!("{}", session.formatted_distance());
    Ok(())
}
