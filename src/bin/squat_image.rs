//! Batch image mode: annotate a single image with squat state and rep count.

use anyhow::{bail, Result};
use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;

use squat_tracker::config::Config;
use squat_tracker::pose::{AngleSource, PoseAngleExtractor};
use squat_tracker::render::overlay;
use squat_tracker::rep::Session;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (input, output) = match args.len() {
        2 => (args[1].clone(), "output_squat.jpg".to_string()),
        3 => (args[1].clone(), args[2].clone()),
        _ => {
            eprintln!("Usage: squat_image <input.jpg> [output.jpg]");
            std::process::exit(1);
        }
    };

    let config = Config::load_or_default(CONFIG_PATH);
    let thresholds = config.thresholds.knee_thresholds();

    println!("Loading model from {}...", config.pose.model);
    let mut extractor =
        PoseAngleExtractor::new(&config.pose.model, config.pose.confidence_threshold)?;

    let mut frame = imgcodecs::imread(&input, imgcodecs::IMREAD_COLOR)?;
    if frame.empty() {
        bail!("Failed to read image {}", input);
    }

    let observation = extractor.observe(&frame)?;

    // 単発画像なのでセッションはstartから1フレームぶんだけ進む
    let mut session = Session::new();
    match observation.knee_angle {
        Some(angle) => {
            session.observe(thresholds.discretize(angle));
            overlay::draw_status(&mut frame, &session, angle)?;
            overlay::draw_boxes(&mut frame, &observation.boxes, session.state())?;
            println!("Knee angle: {:.1}", angle);
            println!("State: {}", session.state());
            println!("Reps: {}", session.reps());
        }
        None => {
            println!("No knee angle measured, writing image unchanged");
        }
    }

    if !imgcodecs::imwrite(&output, &frame, &Vector::<i32>::new())? {
        bail!("Failed to write image {}", output);
    }
    println!("Saved {}", output);

    Ok(())
}
