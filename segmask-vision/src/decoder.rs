//! Detection decoding: confidence filtering and non-maximum suppression

use crate::geometry::{input_box_from_center, input_to_image};
use crate::models::{ClassNames, ModelShape};
use crate::tensor::DetectionTensor;
use segmask_core::{BoxF32, SuppressionPolicy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A decoded candidate before mask synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateObject {
    pub class_index: usize,
    pub class_name: String,
    pub confidence: f32,
    /// Box in model input grid units, kept unmodified for mask-grid mapping
    pub model_box: BoxF32,
    /// Box in original image pixels
    pub image_box: BoxF32,
    /// Anchor slot in the detection tensor this candidate was read from
    pub anchor_index: usize,
}

/// Per-image decoding parameters
#[derive(Debug, Clone)]
pub struct DecodeParams<'a> {
    pub confidence: f32,
    pub iou: f32,
    pub image_width: u32,
    pub image_height: u32,
    pub class_filter: Option<&'a [usize]>,
    pub max_detections: usize,
}

/// Scans a detection tensor and produces suppressed, confidence-ordered candidates
pub struct DetectionDecoder {
    shape: ModelShape,
    class_names: ClassNames,
    suppression: SuppressionPolicy,
}

impl DetectionDecoder {
    pub fn new(shape: ModelShape, class_names: ClassNames, suppression: SuppressionPolicy) -> Self {
        Self {
            shape,
            class_names,
            suppression,
        }
    }

    pub fn suppression(&self) -> SuppressionPolicy {
        self.suppression
    }

    /// Decode every anchor, keep those above the confidence threshold and run NMS
    pub fn decode(&self, tensor: &DetectionTensor<'_>, params: &DecodeParams<'_>) -> Vec<CandidateObject> {
        if tensor.is_empty() || params.image_width == 0 || params.image_height == 0 {
            return Vec::new();
        }

        let num_classes = self.shape.num_classes;
        let mut candidates = Vec::new();
        let mut skipped_non_finite = 0usize;

        for anchor in 0..tensor.anchors() {
            let mut best_class = 0;
            let mut best_score = f32::NEG_INFINITY;
            for class_idx in 0..num_classes {
                if let Some(score) = tensor.get(4 + class_idx, anchor) {
                    if score.is_finite() && score > best_score {
                        best_score = score;
                        best_class = class_idx;
                    }
                }
            }

            if !best_score.is_finite() {
                skipped_non_finite += 1;
                continue;
            }
            if best_score <= params.confidence {
                continue;
            }
            if let Some(filter) = params.class_filter {
                if !filter.contains(&best_class) {
                    continue;
                }
            }

            let coords = (
                tensor.get(0, anchor),
                tensor.get(1, anchor),
                tensor.get(2, anchor),
                tensor.get(3, anchor),
            );
            let (cx, cy, w, h) = match coords {
                (Some(cx), Some(cy), Some(w), Some(h)) => (cx, cy, w, h),
                _ => continue,
            };

            let model_box = input_box_from_center(cx, cy, w, h);
            if !model_box.is_finite() || w < 0.0 || h < 0.0 {
                skipped_non_finite += 1;
                continue;
            }

            candidates.push(CandidateObject {
                class_index: best_class,
                class_name: self.class_names.name(best_class),
                confidence: best_score,
                model_box,
                image_box: input_to_image(&model_box, &self.shape, params.image_width, params.image_height),
                anchor_index: anchor,
            });
        }

        if skipped_non_finite > 0 {
            warn!("Skipped {} anchors with non-finite values", skipped_non_finite);
        }

        let retained = candidates.len();
        let mut kept = non_max_suppression(candidates, params.iou, self.suppression);
        kept.truncate(params.max_detections);

        debug!(
            "Decoded {} anchors: {} above threshold, {} after suppression",
            tensor.anchors(),
            retained,
            kept.len()
        );
        kept
    }
}

/// Greedy NMS over candidates; output is ordered by confidence, highest first
pub fn non_max_suppression(
    mut candidates: Vec<CandidateObject>,
    iou_threshold: f32,
    policy: SuppressionPolicy,
) -> Vec<CandidateObject> {
    if candidates.is_empty() {
        return candidates;
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then(a.anchor_index.cmp(&b.anchor_index))
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; candidates.len()];

    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }

        for j in (i + 1)..candidates.len() {
            if suppressed[j] {
                continue;
            }
            if policy == SuppressionPolicy::ClassScoped
                && candidates[i].class_index != candidates[j].class_index
            {
                continue;
            }

            if candidates[i].model_box.iou(&candidates[j].model_box) > iou_threshold {
                suppressed[j] = true;
            }
        }

        keep.push(i);
    }

    let mut slots: Vec<Option<CandidateObject>> = candidates.into_iter().map(Some).collect();
    keep.into_iter().filter_map(|i| slots[i].take()).collect()
}
