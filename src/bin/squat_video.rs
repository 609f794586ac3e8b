//! Video pipeline mode: read an exercise video, overlay rep feedback on
//! every frame, and write the annotated video back out.

use anyhow::Result;
use std::time::Instant;

use squat_tracker::camera::{VideoReader, VideoSink};
use squat_tracker::config::Config;
use squat_tracker::pose::{AngleSource, PoseAngleExtractor};
use squat_tracker::render::overlay;
use squat_tracker::rep::Session;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (input, output) = match args.len() {
        2 => (args[1].clone(), "output_squat.mp4".to_string()),
        3 => (args[1].clone(), args[2].clone()),
        _ => {
            eprintln!("Usage: squat_video <input.mp4> [output.mp4]");
            std::process::exit(1);
        }
    };

    let config = Config::load_or_default(CONFIG_PATH);
    let thresholds = config.thresholds.knee_thresholds();

    println!("Loading model from {}...", config.pose.model);
    let mut extractor =
        PoseAngleExtractor::new(&config.pose.model, config.pose.confidence_threshold)?;

    let mut reader = VideoReader::open(&input)?;
    let (width, height) = reader.resolution();
    let fps = reader.fps();
    println!("Input: {} ({}x{} @ {:.1} fps)", input, width, height, fps);

    let mut sink = VideoSink::create(&output, fps, width, height)?;

    let mut session = Session::new();
    let mut frame_count = 0u64;
    let mut measured_count = 0u64;
    let started = Instant::now();

    while let Some(mut frame) = reader.next_frame()? {
        let observation = extractor.observe(&frame)?;

        // 測定なしのフレームはFSMを進めずそのまま書き出す
        if let Some(angle) = observation.knee_angle {
            measured_count += 1;
            let completed = session.observe(thresholds.discretize(angle));
            if completed {
                println!("Rep: {}", session.reps());
            }
            overlay::draw_status(&mut frame, &session, angle)?;
            overlay::draw_boxes(&mut frame, &observation.boxes, session.state())?;
        }

        sink.write(&frame)?;
        frame_count += 1;
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "Processed {} frames ({} with measurement) in {:.1}s",
        frame_count, measured_count, elapsed
    );
    println!("Total reps: {}", session.reps());
    println!("Saved {}", output);

    Ok(())
}
