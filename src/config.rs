use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::rep::{KneeThresholds, DOWN_ANGLE, UP_ANGLE};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdConfig {
    /// この角度未満でdown判定（度）
    #[serde(default = "default_down_angle")]
    pub down_angle: f32,
    /// この角度超でup判定（度）
    #[serde(default = "default_up_angle")]
    pub up_angle: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoseConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model")]
    pub model: String,
    /// キーポイント信頼度の閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラインデックス
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

fn default_down_angle() -> f32 { DOWN_ANGLE }
fn default_up_angle() -> f32 { UP_ANGLE }
fn default_model() -> String { "models/movenet_lightning.onnx".to_string() }
fn default_confidence_threshold() -> f32 { 0.3 }
fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            down_angle: default_down_angle(),
            up_angle: default_up_angle(),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

impl ThresholdConfig {
    pub fn knee_thresholds(&self) -> KneeThresholds {
        KneeThresholds::new(self.down_angle, self.up_angle)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければ既定値で動く
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(_) => {
                eprintln!(
                    "Config {} not found, using defaults",
                    path.as_ref().display()
                );
                Config::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.thresholds.down_angle, 73.0);
        assert_eq!(config.thresholds.up_angle, 170.0);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [thresholds]
            down_angle = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.down_angle, 80.0);
        assert_eq!(config.thresholds.up_angle, 170.0);
        assert_eq!(config.camera.index, 0);
    }
}
