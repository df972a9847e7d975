//! Instance mask synthesis from mask coefficients and prototype planes

use crate::geometry::{input_to_mask_region, MaskRegion};
use crate::models::ModelShape;
use crate::raster::GrayRaster;
use crate::tensor::{DetectionTensor, MaskEmbeddingTensor};
use segmask_core::BoxF32;

/// Probability raster on the mask grid plus the region it was computed for
#[derive(Debug, Clone)]
pub struct SynthesizedMask {
    /// Full mask-grid raster; pixels outside `region` are zero
    pub raster: GrayRaster,
    pub region: MaskRegion,
}

/// Combines per-object coefficients with the prototype planes
pub struct MaskSynthesizer {
    shape: ModelShape,
}

impl MaskSynthesizer {
    pub fn new(shape: ModelShape) -> Self {
        Self { shape }
    }

    /// Mask coefficients of `anchor`, stored after the box and class channels
    pub fn coefficients(&self, detections: &DetectionTensor<'_>, anchor: usize) -> Vec<f32> {
        detections.gather(anchor, 4 + self.shape.num_classes, self.shape.mask_channels)
    }

    /// Synthesize the mask of the object read from `anchor`, restricted to `model_box`
    pub fn synthesize(
        &self,
        anchor: usize,
        model_box: &BoxF32,
        detections: &DetectionTensor<'_>,
        embeddings: &MaskEmbeddingTensor<'_>,
    ) -> SynthesizedMask {
        let mut raster = GrayRaster::new(embeddings.width() as u32, embeddings.height() as u32);
        let region = input_to_mask_region(model_box, &self.shape);
        if region.is_empty() || raster.is_empty() {
            return SynthesizedMask { raster, region };
        }
        // Guard against an embedding grid smaller than the declared shape
        let region = MaskRegion {
            x1: region.x1.min(raster.width() - 1),
            y1: region.y1.min(raster.height() - 1),
            ..region
        };
        if region.is_empty() {
            return SynthesizedMask { raster, region };
        }

        let coefficients = self.coefficients(detections, anchor);
        let mask_w = embeddings.width();
        let region_w = region.width() as usize;
        let region_h = region.height() as usize;
        let mut logits = vec![0.0f32; region_w * region_h];

        for (channel, &coefficient) in coefficients.iter().enumerate().take(embeddings.channels()) {
            if coefficient == 0.0 {
                continue;
            }
            let plane = embeddings.plane(channel);
            for (row, y) in (region.y0 as usize..=region.y1 as usize).enumerate() {
                let src = &plane[y * mask_w + region.x0 as usize..=y * mask_w + region.x1 as usize];
                let dst = &mut logits[row * region_w..(row + 1) * region_w];
                for (acc, &value) in dst.iter_mut().zip(src) {
                    *acc += coefficient * value;
                }
            }
        }

        for (row, y) in (region.y0..=region.y1).enumerate() {
            let out = &mut raster.row_mut(y)[region.x0 as usize..=region.x1 as usize];
            let src = &logits[row * region_w..(row + 1) * region_w];
            for (px, &logit) in out.iter_mut().zip(src) {
                *px = probability_to_byte(sigmoid(logit));
            }
        }

        SynthesizedMask { raster, region }
    }
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `[0, 1]` probability to a rounded byte; NaN maps to 0
#[inline]
pub fn probability_to_byte(p: f32) -> u8 {
    if p.is_nan() {
        return 0;
    }
    (p.clamp(0.0, 1.0) * 255.0).round() as u8
}
