//! Detection-only pipeline

use crate::decoder::{CandidateObject, DecodeParams, DetectionDecoder};
use crate::error::VisionError;
use crate::models::{ClassNames, ModelShape};
use crate::tensor::DetectionTensor;
use segmask_core::{PipelineConfig, SuppressionPolicy};
use tracing::{debug, info};

/// Decodes detection tensors into suppressed candidates
pub struct DetectionPipeline {
    shape: ModelShape,
    config: PipelineConfig,
    decoder: DetectionDecoder,
}

impl DetectionPipeline {
    /// Validate `config` and `shape`, then build the decoder.
    ///
    /// An explicit suppression policy in `config` wins over `default_policy`.
    pub fn new(
        shape: ModelShape,
        class_names: ClassNames,
        config: PipelineConfig,
        default_policy: SuppressionPolicy,
    ) -> Result<Self, VisionError> {
        config.validate()?;
        shape.validate()?;

        let suppression = config.suppression.unwrap_or(default_policy);
        info!(
            "Detection pipeline ready: {}x{} input, {} classes, {} anchors, {:?} suppression",
            shape.input_width, shape.input_height, shape.num_classes, shape.anchors, suppression
        );

        Ok(Self {
            shape,
            config,
            decoder: DetectionDecoder::new(shape, class_names, suppression),
        })
    }

    pub fn shape(&self) -> &ModelShape {
        &self.shape
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn suppression(&self) -> SuppressionPolicy {
        self.decoder.suppression()
    }

    /// Decode a raw detection buffer for an image of `image_width x image_height`
    pub fn detect(
        &self,
        detection: &[f32],
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<CandidateObject>, VisionError> {
        let tensor = DetectionTensor::for_shape(detection, &self.shape)?;
        Ok(self.decode(&tensor, image_width, image_height))
    }

    pub(crate) fn decode(
        &self,
        tensor: &DetectionTensor<'_>,
        image_width: u32,
        image_height: u32,
    ) -> Vec<CandidateObject> {
        let thresholds = &self.config.thresholds;
        let params = DecodeParams {
            confidence: thresholds.confidence,
            iou: thresholds.iou,
            image_width,
            image_height,
            class_filter: self.config.class_filter.as_deref(),
            max_detections: self.config.max_detections,
        };
        let candidates = self.decoder.decode(tensor, &params);
        debug!("Detected {} objects", candidates.len());
        candidates
    }
}
