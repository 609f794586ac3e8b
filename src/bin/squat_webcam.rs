//! Webcam mode: live rep counting with a preview window.

use anyhow::Result;
use std::time::Instant;

use squat_tracker::camera::OpenCvCamera;
use squat_tracker::config::Config;
use squat_tracker::pose::{AngleSource, PoseAngleExtractor};
use squat_tracker::render::{overlay, MinifbRenderer};
use squat_tracker::rep::Session;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let thresholds = config.thresholds.knee_thresholds();

    println!("Squat Webcam");
    println!("Press ESC to exit");

    println!("Opening camera...");
    let mut camera = OpenCvCamera::open(
        config.camera.index,
        Some(config.camera.width),
        Some(config.camera.height),
    )?;
    let (width, height) = camera.resolution();
    println!("Camera resolution: {}x{}", width, height);

    println!("Loading model from {}...", config.pose.model);
    let mut extractor =
        PoseAngleExtractor::new(&config.pose.model, config.pose.confidence_threshold)?;
    println!("Model loaded");

    let mut renderer = MinifbRenderer::new("Squat Webcam", width as usize, height as usize)?;

    let mut session = Session::new();
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();

    while renderer.is_open() {
        let mut frame = match camera.read_frame() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Frame capture error: {}", e);
                continue;
            }
        };

        let observation = extractor.observe(&frame)?;

        if let Some(angle) = observation.knee_angle {
            let completed = session.observe(thresholds.discretize(angle));
            if completed {
                println!("Rep: {}", session.reps());
            }
            overlay::draw_status(&mut frame, &session, angle)?;
            overlay::draw_boxes(&mut frame, &observation.boxes, session.state())?;
        }

        renderer.draw_frame(&frame)?;
        renderer.update()?;

        frame_count += 1;
        if fps_timer.elapsed().as_secs() >= 1 {
            println!(
                "FPS: {}  state: {}  reps: {}",
                frame_count,
                session.state(),
                session.reps()
            );
            frame_count = 0;
            fps_timer = Instant::now();
        }
    }

    println!("Total reps: {}", session.reps());
    Ok(())
}
