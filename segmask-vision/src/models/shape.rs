//! Model shape constants
//!
//! One parameterized description covers every YOLO generation that emits the
//! `[4 + classes + mask_channels] x anchors` layout; there is no per-version type.

use crate::error::VisionError;
use segmask_core::SuppressionPolicy;
use serde::{Deserialize, Serialize};

/// Task the exported model was trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelTask {
    Detect,
    Segment,
    Pose,
    Obb,
    Classify,
}

impl ModelTask {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detect" => Some(ModelTask::Detect),
            "segment" => Some(ModelTask::Segment),
            "pose" => Some(ModelTask::Pose),
            "obb" => Some(ModelTask::Obb),
            "classify" => Some(ModelTask::Classify),
            _ => None,
        }
    }

    /// Oriented boxes suppress across classes, everything else per class
    pub fn default_suppression(&self) -> SuppressionPolicy {
        match self {
            ModelTask::Obb => SuppressionPolicy::ClassAgnostic,
            _ => SuppressionPolicy::ClassScoped,
        }
    }
}

/// Declared output shape of a detection/segmentation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelShape {
    pub input_width: u32,
    pub input_height: u32,
    pub num_classes: usize,
    /// Coefficients per anchor; 0 for detection-only models
    pub mask_channels: usize,
    pub mask_width: u32,
    pub mask_height: u32,
    pub anchors: usize,
}

impl ModelShape {
    /// Standard segmentation head: strides 8/16/32, 32 prototypes at 1/4 input resolution
    pub fn yolo_seg(input_width: u32, input_height: u32, num_classes: usize) -> Self {
        Self {
            input_width,
            input_height,
            num_classes,
            mask_channels: 32,
            mask_width: input_width / 4,
            mask_height: input_height / 4,
            anchors: anchor_count(input_width, input_height),
        }
    }

    /// Standard detection head without mask coefficients
    pub fn yolo_detect(input_width: u32, input_height: u32, num_classes: usize) -> Self {
        Self {
            mask_channels: 0,
            mask_width: 0,
            mask_height: 0,
            ..Self::yolo_seg(input_width, input_height, num_classes)
        }
    }

    /// Values per anchor in the detection tensor
    pub fn detection_channels(&self) -> usize {
        4 + self.num_classes + self.mask_channels
    }

    pub fn detection_len(&self) -> usize {
        self.detection_channels() * self.anchors
    }

    pub fn embedding_len(&self) -> usize {
        self.mask_channels * self.mask_width as usize * self.mask_height as usize
    }

    pub fn has_masks(&self) -> bool {
        self.mask_channels > 0 && self.mask_width > 0 && self.mask_height > 0
    }

    /// Input grid to mask grid factors `(x, y)`
    pub fn mask_scale(&self) -> (f32, f32) {
        (
            self.mask_width as f32 / self.input_width as f32,
            self.mask_height as f32 / self.input_height as f32,
        )
    }

    pub fn validate(&self) -> Result<(), VisionError> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(VisionError::Config("Model input size must be non-zero".to_string()));
        }
        if self.num_classes == 0 {
            return Err(VisionError::Config("Model must declare at least one class".to_string()));
        }
        if self.anchors == 0 {
            return Err(VisionError::Config("Model must declare at least one anchor".to_string()));
        }
        if self.mask_channels > 0 && (self.mask_width == 0 || self.mask_height == 0) {
            return Err(VisionError::Config(
                "Mask grid must be non-zero when mask channels are declared".to_string(),
            ));
        }
        self.detection_len()
            .checked_add(self.embedding_len())
            .ok_or_else(|| VisionError::Config("Model shape would overflow".to_string()))?;
        Ok(())
    }
}

/// Anchors produced by a three-level feature pyramid at strides 8, 16 and 32
pub fn anchor_count(input_width: u32, input_height: u32) -> usize {
    [8u32, 16, 32]
        .iter()
        .map(|s| (input_width / s) as usize * (input_height / s) as usize)
        .sum()
}
