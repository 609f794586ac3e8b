use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs, VideoWriter},
};
use std::path::Path;

/// 動画ファイルの逐次読み込み
pub struct VideoReader {
    capture: VideoCapture,
    fps: f64,
    width: u32,
    height: u32,
}

impl VideoReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let capture = VideoCapture::from_file(&path_str, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open video {}", path_str))?;

        if !capture.is_opened()? {
            anyhow::bail!("Video {} could not be opened", path_str);
        }

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        Ok(Self {
            capture,
            fps,
            width,
            height,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 次のフレームを読む。終端に達したらNone。
    pub fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self.capture.read(&mut frame)?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// mp4vコーデックでの動画書き出し
pub struct VideoSink {
    writer: VideoWriter,
}

impl VideoSink {
    pub fn create<P: AsRef<Path>>(path: P, fps: f64, width: u32, height: u32) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &path_str,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .with_context(|| format!("Failed to create video {}", path_str))?;

        if !writer.is_opened()? {
            anyhow::bail!("Video writer for {} could not be opened", path_str);
        }

        Ok(Self { writer })
    }

    pub fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }
}
