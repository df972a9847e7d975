//! Pipeline configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How overlapping candidates are suppressed during decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionPolicy {
    /// Only candidates of the same class suppress each other
    ClassScoped,
    /// Any overlapping candidate is suppressed regardless of class
    ClassAgnostic,
}

/// Which resampling implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleMode {
    /// Vectorized when the host supports it, scalar otherwise
    Auto,
    Scalar,
    Vectorized,
}

/// Decision thresholds, all in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum best-class score for a candidate to be kept
    pub confidence: f32,
    /// Overlap above which the lower scoring candidate is suppressed
    pub iou: f32,
    /// Per-pixel probability above which a mask bit is set
    pub pixel_confidence: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            iou: 0.45,
            pixel_confidence: 0.5,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        check_unit("confidence", self.confidence)?;
        check_unit("iou", self.iou)?;
        check_unit("pixel_confidence", self.pixel_confidence)?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(Error::Configuration(format!(
            "{} threshold must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Segmentation pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub thresholds: Thresholds,
    /// Overrides the policy implied by the model task when set
    pub suppression: Option<SuppressionPolicy>,
    /// Keep only these class indices
    pub class_filter: Option<Vec<usize>>,
    /// Grow (or shrink) each box about its center before mask synthesis
    pub box_scale: Option<f32>,
    /// Masks cover only the object's box when true, the whole image otherwise
    pub crop_to_box: bool,
    /// Process objects on the rayon pool
    pub parallel: bool,
    pub resample: ResampleMode,
    /// Upper bound on objects returned per image
    pub max_detections: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            suppression: None,
            class_filter: None,
            box_scale: None,
            crop_to_box: true,
            parallel: true,
            resample: ResampleMode::Auto,
            max_detections: 300,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<PipelineConfig>(content) {
            return Ok(config);
        }

        // Try TOML
        if let Ok(config) = toml::from_str::<PipelineConfig>(content) {
            return Ok(config);
        }

        // Try YAML
        if let Ok(config) = serde_yaml::from_str::<PipelineConfig>(content) {
            return Ok(config);
        }

        Err(Error::Parse("Unknown configuration format".to_string()))
    }

    /// Defaults overlaid with `SEGMASK_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_f32("SEGMASK_CONFIDENCE") {
            config.thresholds.confidence = v;
        }
        if let Some(v) = env_f32("SEGMASK_IOU") {
            config.thresholds.iou = v;
        }
        if let Some(v) = env_f32("SEGMASK_PIXEL_CONFIDENCE") {
            config.thresholds.pixel_confidence = v;
        }
        if let Ok(v) = std::env::var("SEGMASK_PARALLEL") {
            if let Ok(b) = v.parse::<bool>() {
                config.parallel = b;
            }
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        if let Some(scale) = self.box_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(Error::Configuration(format!(
                    "box_scale must be a positive finite factor, got {}",
                    scale
                )));
            }
        }

        if self.max_detections == 0 {
            return Err(Error::Configuration("max_detections must be > 0".to_string()));
        }

        Ok(())
    }
}

fn env_f32(key: &str) -> Option<f32> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<f32>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}
