//! Squat client: captures webcam frames, streams them to squat-server,
//! and applies returned sessions through the transition guard.
//!
//! Frames are pipelined: the next frame is sent before the previous
//! response arrives, so a response can reach us after newer frames were
//! already sent with an older session snapshot. Every response therefore
//! goes through `Session::apply_remote`, which only accepts states that
//! are legal one-step transitions from the local session; anything else
//! is discarded and the local session stays authoritative.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use opencv::core::{Mat, Vector};
use opencv::imgcodecs;
use opencv::prelude::*;
use serde::Deserialize;
use tokio::net::TcpStream;

use squat_tracker::camera::ThreadedCamera;
use squat_tracker::protocol::{self, ProcessRequest, ProcessResponse};
use squat_tracker::render::MinifbRenderer;
use squat_tracker::rep::Session;

// ---------------------------------------------------------------------------
// Config (inline, reads squat_client.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default = "default_server_addr")]
    server_addr: String,
    #[serde(default)]
    camera_index: i32,
    #[serde(default = "default_camera_width")]
    camera_width: u32,
    #[serde(default = "default_camera_height")]
    camera_height: u32,
    /// Frame send interval in milliseconds (~5 FPS by default)
    #[serde(default = "default_send_interval_ms")]
    send_interval_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: i32,
    #[serde(default = "default_max_in_flight")]
    max_in_flight: u64,
    #[serde(default)]
    verbose: bool,
}

fn default_server_addr() -> String { "127.0.0.1:9100".to_string() }
fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_send_interval_ms() -> u64 { 200 }
fn default_jpeg_quality() -> i32 { 80 }
fn default_max_in_flight() -> u64 { 4 }

const CONFIG_PATH: &str = "squat_client.toml";

fn load_config() -> Result<Config> {
    let content = std::fs::read_to_string(CONFIG_PATH).unwrap_or_default();
    toml::from_str(&content).context("Failed to parse config")
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file() -> Result<LogFile> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/squat_client_{}.log", ts);
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
// JPEG helpers
// ---------------------------------------------------------------------------

fn encode_jpeg(frame: &Mat, quality: i32) -> Result<Vec<u8>> {
    let mut encoded = Vector::<u8>::new();
    let mut params = Vector::<i32>::new();
    params.push(imgcodecs::IMWRITE_JPEG_QUALITY);
    params.push(quality);
    if !imgcodecs::imencode(".jpg", frame, &mut encoded, &params)? {
        bail!("JPEG encoding failed");
    }
    Ok(encoded.to_vec())
}

fn decode_jpeg(data: &[u8]) -> Result<Mat> {
    let buf = Vector::<u8>::from_slice(data);
    let frame: Mat = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)?;
    if frame.empty() {
        bail!("JPEG decoding failed");
    }
    Ok(frame)
}

// minifbのウィンドウはスレッドをまたげないのでシングルスレッドランタイム
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = load_config()?;
    let logfile = open_log_file()?;

    log!(logfile, "Squat Client ({})", env!("GIT_VERSION"));
    log!(logfile, "Server: {}", config.server_addr);

    let camera = ThreadedCamera::start(
        config.camera_index,
        Some(config.camera_width),
        Some(config.camera_height),
    )?;
    let (width, height) = camera.resolution();
    log!(logfile, "Camera: {}x{}", width, height);

    let mut renderer = MinifbRenderer::new("Squat Client", width as usize, height as usize)?;

    let stream = TcpStream::connect(&config.server_addr)
        .await
        .with_context(|| format!("Failed to connect to {}", config.server_addr))?;
    let (mut sink, mut source) = protocol::split(protocol::message_stream(stream));
    log!(logfile, "Connected");

    // ローカルセッションが常に正。サーバ応答は検証に通ったときだけ反映する。
    let mut session = Session::new();
    let mut annotated: Option<Mat> = None;

    let mut send_timer = tokio::time::interval(Duration::from_millis(config.send_interval_ms));
    let mut ui_timer = tokio::time::interval(Duration::from_millis(16));
    let mut sent = 0u64;
    let mut received = 0u64;
    let mut discarded = 0u64;
    let mut last_frame_id = 0u64;

    while renderer.is_open() {
        tokio::select! {
            _ = send_timer.tick() => {
                // 応答が詰まっているときは送信を抑える
                if sent - received >= config.max_in_flight {
                    continue;
                }
                let frame_id = camera.frame_id();
                if frame_id == last_frame_id {
                    continue;
                }
                let Some(frame) = camera.get_frame() else { continue };
                last_frame_id = frame_id;

                let request = ProcessRequest {
                    frame: encode_jpeg(&frame, config.jpeg_quality)?,
                    squat_state: session.state(),
                    squat_reps: session.reps(),
                };
                protocol::send_to(&mut sink, &request).await?;
                sent += 1;
            }
            response = protocol::recv_from::<ProcessResponse>(&mut source) => {
                let response = match response {
                    Ok(r) => r,
                    Err(e) => {
                        log!(logfile, "Connection lost: {:#}", e);
                        break;
                    }
                };
                received += 1;

                let prev_reps = session.reps();
                if session.apply_remote(response.squat_state, response.squat_reps) {
                    if session.reps() > prev_reps {
                        log!(logfile, "Rep: {}", session.reps());
                    }
                    if let Ok(frame) = decode_jpeg(&response.frame) {
                        annotated = Some(frame);
                    }
                    if config.verbose {
                        log!(
                            logfile,
                            "Applied: state={} reps={} angle={}",
                            session.state(),
                            session.reps(),
                            response.knee_angle
                        );
                    }
                } else {
                    // 順序が入れ替わって届いた古い結果。黙って破棄する。
                    discarded += 1;
                    if config.verbose {
                        log!(
                            logfile,
                            "Discarded stale update: {} (local: {})",
                            response.squat_state,
                            session.state()
                        );
                    }
                }
            }
            _ = ui_timer.tick() => {
                if let Some(frame) = &annotated {
                    renderer.draw_frame(frame)?;
                }
                renderer.update()?;
            }
        }
    }

    log!(
        logfile,
        "Done: {} sent, {} received, {} discarded, {} reps",
        sent,
        received,
        discarded,
        session.reps()
    );
    Ok(())
}
