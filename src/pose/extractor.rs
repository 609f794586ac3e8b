use anyhow::Result;
use opencv::core::Mat;
use opencv::prelude::*;
use std::path::Path;

use super::angle::knee_angle;
use super::detector::PoseDetector;
use super::keypoint::{bbox_from_keypoints, BBox};
use super::preprocess::preprocess_for_movenet;

/// 1フレームぶんの観測結果
#[derive(Debug, Clone)]
pub struct Observation {
    /// 膝角度（度）。測定不能ならNone。
    pub knee_angle: Option<f32>,
    /// 検出された人物のラベル付きボックス
    pub boxes: Vec<LabeledBox>,
}

/// ラベル付きバウンディングボックス
#[derive(Debug, Clone)]
pub struct LabeledBox {
    pub label: String,
    pub bbox: BBox,
}

/// 推論コラボレータの最小インタフェース
///
/// コア側はフレームから膝角度（と任意のボックス）が得られることだけを
/// 要求する。推論ライブラリの詳細はこの裏に隠す。
pub trait AngleSource {
    fn observe(&mut self, frame: &Mat) -> Result<Observation>;
}

/// MoveNet姿勢推定から膝角度を導出するAngleSource実装
pub struct PoseAngleExtractor {
    detector: PoseDetector,
    confidence_threshold: f32,
}

impl PoseAngleExtractor {
    pub fn new<P: AsRef<Path>>(model_path: P, confidence_threshold: f32) -> Result<Self> {
        Ok(Self {
            detector: PoseDetector::new(model_path)?,
            confidence_threshold,
        })
    }
}

impl AngleSource for PoseAngleExtractor {
    fn observe(&mut self, frame: &Mat) -> Result<Observation> {
        let frame_w = frame.cols() as u32;
        let frame_h = frame.rows() as u32;

        let input = preprocess_for_movenet(frame)?;
        let pose = self.detector.detect(input)?;

        let knee_angle = knee_angle(&pose, frame_w, frame_h, self.confidence_threshold);

        let mut boxes = Vec::new();
        if let Some(bbox) = bbox_from_keypoints(&pose, frame_w, frame_h, self.confidence_threshold)
        {
            boxes.push(LabeledBox {
                label: "person".to_string(),
                bbox,
            });
        }

        Ok(Observation { knee_angle, boxes })
    }
}
