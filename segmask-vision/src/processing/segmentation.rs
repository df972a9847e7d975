//! Instance segmentation pipeline

use super::detection::DetectionPipeline;
use crate::capability::SimdCapability;
use crate::compositor::{default_color, Canvas, CompositeLayer, Compositor};
use crate::decoder::CandidateObject;
use crate::error::VisionError;
use crate::geometry::{scale_about_center, to_pixel_box};
use crate::models::{ClassNames, ModelMetadata, ModelShape};
use crate::packing::PackedMask;
use crate::resample::Resampler;
use crate::synthesis::MaskSynthesizer;
use crate::tensor::{DetectionTensor, MaskEmbeddingTensor};
use rayon::prelude::*;
use segmask_core::{BoundingBox, PipelineConfig, PixelFormat, Rgba, SuppressionPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A finished object: its detection, output box and packed mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectResult {
    pub candidate: CandidateObject,
    /// Placement in output coordinates; the mask stride is `bbox.width`
    pub bbox: BoundingBox,
    /// `None` when the object has no usable mask
    pub mask: Option<PackedMask>,
}

impl ObjectResult {
    pub fn has_mask(&self) -> bool {
        self.mask.as_ref().map_or(false, |m| !m.is_empty())
    }

    /// Composite view of this object; the stored box is never moved
    pub fn layer(&self, color: Option<Rgba>, offset: (i32, i32)) -> Option<CompositeLayer<'_>> {
        let mask = self.mask.as_ref()?;
        Some(CompositeLayer {
            mask,
            bbox: self.bbox,
            color,
            offset,
        })
    }
}

/// Output canvas and per-object styling for [`SegmentationPipeline::composite`]
#[derive(Debug, Clone)]
pub struct CompositeOptions {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub tint: Rgba,
    /// Per-object colors by result index; missing entries use the class palette
    pub colors: Vec<Rgba>,
    /// Per-object placement offsets by result index; missing entries are `(0, 0)`
    pub offsets: Vec<(i32, i32)>,
    pub parallel: bool,
}

impl CompositeOptions {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            tint: Rgba::WHITE,
            colors: Vec::new(),
            offsets: Vec::new(),
            parallel: false,
        }
    }
}

/// Rows per band for the parallel compositor
const COMPOSITE_BAND_ROWS: u32 = 32;

/// Decode, synthesize, resample and pack every object of one forward pass
pub struct SegmentationPipeline {
    detection: DetectionPipeline,
    synthesizer: MaskSynthesizer,
    resampler: Resampler,
}

impl SegmentationPipeline {
    /// Fails fast on invalid thresholds or shape
    pub fn new(
        shape: ModelShape,
        class_names: ClassNames,
        config: PipelineConfig,
        capability: SimdCapability,
    ) -> Result<Self, VisionError> {
        Self::with_default_policy(shape, class_names, config, capability, SuppressionPolicy::ClassScoped)
    }

    /// Build from exported model metadata; the task picks the suppression policy
    /// unless `config` sets one
    pub fn from_metadata(
        metadata: &ModelMetadata,
        mask_channels: usize,
        mask_width: u32,
        mask_height: u32,
        config: PipelineConfig,
        capability: SimdCapability,
    ) -> Result<Self, VisionError> {
        let shape = metadata.resolve_shape(mask_channels, mask_width, mask_height)?;
        let policy = metadata
            .task
            .map(|task| task.default_suppression())
            .unwrap_or(SuppressionPolicy::ClassScoped);
        Self::with_default_policy(shape, metadata.class_names(), config, capability, policy)
    }

    fn with_default_policy(
        shape: ModelShape,
        class_names: ClassNames,
        config: PipelineConfig,
        capability: SimdCapability,
        policy: SuppressionPolicy,
    ) -> Result<Self, VisionError> {
        let resampler = Resampler::new(config.resample, capability);
        let detection = DetectionPipeline::new(shape, class_names, config, policy)?;
        info!(
            "Segmentation pipeline ready: {} mask channels on a {}x{} grid, {:?} resampling",
            shape.mask_channels,
            shape.mask_width,
            shape.mask_height,
            resampler.path()
        );
        Ok(Self {
            detection,
            synthesizer: MaskSynthesizer::new(shape),
            resampler,
        })
    }

    pub fn shape(&self) -> &ModelShape {
        self.detection.shape()
    }

    pub fn config(&self) -> &PipelineConfig {
        self.detection.config()
    }

    pub fn suppression(&self) -> SuppressionPolicy {
        self.detection.suppression()
    }

    /// Decode only, for models without a mask head
    pub fn detect(
        &self,
        detection: &[f32],
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<CandidateObject>, VisionError> {
        self.detection.detect(detection, image_width, image_height)
    }

    /// Full pipeline over one forward pass.
    ///
    /// Tensor lengths are checked against the declared shape before any pixel work.
    /// Results keep the decoder's confidence order.
    pub fn process(
        &self,
        detection: &[f32],
        embedding: &[f32],
        image_width: u32,
        image_height: u32,
    ) -> Result<Vec<ObjectResult>, VisionError> {
        let shape = self.shape();
        let det = DetectionTensor::for_shape(detection, shape)?;
        let emb = MaskEmbeddingTensor::for_shape(embedding, shape)?;

        let candidates = self.detection.decode(&det, image_width, image_height);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let build = |candidate: CandidateObject| self.build_object(candidate, &det, &emb, image_width, image_height);
        let results: Vec<ObjectResult> = if self.config().parallel {
            candidates.into_par_iter().map(build).collect()
        } else {
            candidates.into_iter().map(build).collect()
        };

        debug!(
            "Produced {} objects, {} with masks",
            results.len(),
            results.iter().filter(|r| r.has_mask()).count()
        );
        Ok(results)
    }

    fn build_object(
        &self,
        candidate: CandidateObject,
        det: &DetectionTensor<'_>,
        emb: &MaskEmbeddingTensor<'_>,
        image_width: u32,
        image_height: u32,
    ) -> ObjectResult {
        let shape = self.shape();
        let config = self.config();

        let (model_box, image_box) = match config.box_scale {
            Some(factor) if factor != 1.0 => (
                scale_about_center(
                    &candidate.model_box,
                    factor,
                    shape.input_width as f32,
                    shape.input_height as f32,
                ),
                scale_about_center(&candidate.image_box, factor, image_width as f32, image_height as f32),
            ),
            _ => (candidate.model_box, candidate.image_box),
        };

        let bbox = to_pixel_box(&image_box, image_width, image_height);
        if bbox.is_empty() || !shape.has_masks() {
            return ObjectResult {
                candidate,
                bbox,
                mask: None,
            };
        }

        let synthesized = self.synthesizer.synthesize(candidate.anchor_index, &model_box, det, emb);
        let resampled = self
            .resampler
            .resample(&synthesized.raster, &synthesized.region, bbox.width, bbox.height);
        if resampled.is_empty() {
            return ObjectResult {
                candidate,
                bbox,
                mask: None,
            };
        }

        let packed = PackedMask::pack(&resampled, config.thresholds.pixel_confidence);
        if config.crop_to_box {
            ObjectResult {
                candidate,
                bbox,
                mask: Some(packed),
            }
        } else {
            ObjectResult {
                candidate,
                bbox: BoundingBox::new(0, 0, image_width, image_height),
                mask: Some(packed.expand_to_canvas(&bbox, image_width, image_height)),
            }
        }
    }

    /// Rasterize `results` onto a fresh canvas
    pub fn composite(&self, results: &[ObjectResult], options: &CompositeOptions) -> Canvas {
        composite_results(results, options)
    }
}

/// Composite without a pipeline instance
pub fn composite_results(results: &[ObjectResult], options: &CompositeOptions) -> Canvas {
    let layers: Vec<CompositeLayer<'_>> = results
        .iter()
        .enumerate()
        .filter_map(|(i, result)| {
            let color = options
                .colors
                .get(i)
                .copied()
                .unwrap_or_else(|| default_color(result.candidate.class_index));
            let offset = options.offsets.get(i).copied().unwrap_or((0, 0));
            result.layer(Some(color), offset)
        })
        .collect();

    let compositor = Compositor::new(options.width, options.height, options.format, options.tint);
    if options.parallel {
        compositor.composite_parallel(&layers, COMPOSITE_BAND_ROWS)
    } else {
        compositor.composite(&layers)
    }
}
