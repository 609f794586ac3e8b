//! Squat server: receives JPEG frames over TCP, runs pose estimation,
//! advances the rep state machine from the client-supplied session, and
//! returns the annotated frame with the new session.
//!
//! The server keeps no per-client state: every request carries the
//! client's `squat_state`/`squat_reps`, and the client is responsible for
//! validating the returned transition (responses may be applied out of
//! order on the client side).

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};

use squat_tracker::pose::{AngleSource, PoseAngleExtractor};
use squat_tracker::protocol::{self, ProcessRequest, ProcessResponse, NO_ANGLE};
use squat_tracker::render::overlay;
use squat_tracker::rep::{KneeThresholds, Session, DOWN_ANGLE, UP_ANGLE};

// ---------------------------------------------------------------------------
// Config (inline, reads squat_server.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_confidence_threshold")]
    confidence_threshold: f32,
    #[serde(default = "default_down_angle")]
    down_angle: f32,
    #[serde(default = "default_up_angle")]
    up_angle: f32,
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: i32,
    #[serde(default)]
    verbose: bool,
}

fn default_listen_addr() -> String { "0.0.0.0:9100".to_string() }
fn default_model() -> String { "models/movenet_lightning.onnx".to_string() }
fn default_confidence_threshold() -> f32 { 0.3 }
fn default_down_angle() -> f32 { DOWN_ANGLE }
fn default_up_angle() -> f32 { UP_ANGLE }
fn default_jpeg_quality() -> i32 { 80 }

const CONFIG_PATH: &str = "squat_server.toml";

fn load_config() -> Result<Config> {
    let content = match std::fs::read_to_string(CONFIG_PATH) {
        Ok(c) => c,
        // 設定ファイルなしでも既定値で起動する
        Err(_) => String::new(),
    };
    toml::from_str(&content).context("Failed to parse config")
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/squat_server_{}.log", ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

// ---------------------------------------------------------------------------
// Frame processing
// ---------------------------------------------------------------------------

struct FrameProcessor {
    extractor: PoseAngleExtractor,
    thresholds: KneeThresholds,
    jpeg_quality: i32,
}

impl FrameProcessor {
    /// Run one request through inference + FSM + overlay.
    ///
    /// The FSM advance starts from the session the client sent; the
    /// server never remembers previous frames.
    fn process(&mut self, request: &ProcessRequest) -> Result<ProcessResponse> {
        let buf = Vector::<u8>::from_slice(&request.frame);
        let mut frame: Mat = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)?;
        if frame.empty() {
            bail!("Request frame could not be decoded");
        }

        let observation = self.extractor.observe(&frame)?;

        let mut session = Session::resume(request.squat_state, request.squat_reps);
        if let Some(angle) = observation.knee_angle {
            session.observe(self.thresholds.discretize(angle));
            overlay::draw_status(&mut frame, &session, angle)?;
            overlay::draw_boxes(&mut frame, &observation.boxes, session.state())?;
        }

        let mut encoded = Vector::<u8>::new();
        let mut params = Vector::<i32>::new();
        params.push(imgcodecs::IMWRITE_JPEG_QUALITY);
        params.push(self.jpeg_quality);
        if !imgcodecs::imencode(".jpg", &frame, &mut encoded, &params)? {
            bail!("JPEG encoding failed");
        }

        Ok(ProcessResponse {
            frame: encoded.to_vec(),
            squat_state: session.state(),
            squat_reps: session.reps(),
            knee_angle: observation.knee_angle.unwrap_or(NO_ANGLE),
        })
    }
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

async fn handle_client(
    stream: TcpStream,
    processor: Arc<tokio::sync::Mutex<FrameProcessor>>,
    logfile: LogFile,
    verbose: bool,
) -> Result<()> {
    let peer = stream.peer_addr()?;
    log!(logfile, "Client connected: {}", peer);

    let mut stream = protocol::message_stream(stream);
    let mut frame_count = 0u64;

    loop {
        let request: ProcessRequest = match protocol::recv_message(&mut stream).await {
            Ok(r) => r,
            Err(_) => break, // disconnect
        };
        frame_count += 1;

        let response = {
            let mut processor = processor.lock().await;
            processor.process(&request)
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                // 推論失敗はフレームを落とすだけ。セッションは据え置きで返す。
                log!(logfile, "Frame {} from {} failed: {:#}", frame_count, peer, e);
                ProcessResponse {
                    frame: request.frame.clone(),
                    squat_state: request.squat_state,
                    squat_reps: request.squat_reps,
                    knee_angle: NO_ANGLE,
                }
            }
        };

        if verbose {
            log!(
                logfile,
                "{} frame {}: state={} reps={} angle={}",
                peer,
                frame_count,
                response.squat_state,
                response.squat_reps,
                response.knee_angle
            );
        }

        protocol::send_message(&mut stream, &response).await?;
    }

    log!(logfile, "Client disconnected: {} ({} frames)", peer, frame_count);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let logfile = open_log_file()?;

    log!(logfile, "Squat Server ({})", env!("GIT_VERSION"));
    log!(logfile, "Listen: {}", config.listen_addr);
    log!(logfile, "Model: {}", config.model);
    log!(
        logfile,
        "Thresholds: down<{} up>{}",
        config.down_angle,
        config.up_angle
    );

    let extractor = PoseAngleExtractor::new(&config.model, config.confidence_threshold)
        .context("Failed to load pose model")?;
    log!(logfile, "Model loaded");

    let processor = Arc::new(tokio::sync::Mutex::new(FrameProcessor {
        extractor,
        thresholds: KneeThresholds::new(config.down_angle, config.up_angle),
        jpeg_quality: config.jpeg_quality,
    }));

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    loop {
        let (stream, _) = listener.accept().await?;
        let processor = processor.clone();
        let logfile = logfile.clone();
        let verbose = config.verbose;
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, processor, logfile.clone(), verbose).await {
                log!(logfile, "Client error: {:#}", e);
            }
        });
    }
}
