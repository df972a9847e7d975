//! segmask-vision: instance segmentation post-processing
//!
//! Turns the raw output of a YOLO-style segmentation head into per-object
//! packed masks and composites them onto a single raster:
//!
//! 1. [`decoder`] scans the detection tensor and suppresses overlaps
//! 2. [`synthesis`] combines mask coefficients with the prototype planes
//! 3. [`resample`] crops each mask to its box and upsamples it
//! 4. [`packing`] thresholds it to 1 bit per pixel
//! 5. [`compositor`] draws the packed masks with max-alpha-wins blending
//!
//! [`SegmentationPipeline`] runs all of it from flat `f32` buffers.

pub mod capability;
pub mod compositor;
pub mod decoder;
pub mod error;
pub mod geometry;
pub mod models;
pub mod packing;
pub mod processing;
pub mod raster;
pub mod resample;
pub mod synthesis;
pub mod tensor;

pub use capability::SimdCapability;
pub use compositor::{default_color, Canvas, CompositeLayer, Compositor};
pub use decoder::{non_max_suppression, CandidateObject, DecodeParams, DetectionDecoder};
pub use error::VisionError;
pub use geometry::MaskRegion;
pub use models::{ClassNames, ModelMetadata, ModelShape, ModelTask};
pub use packing::PackedMask;
pub use processing::{composite_results, CompositeOptions, DetectionPipeline, ObjectResult, SegmentationPipeline};
pub use raster::GrayRaster;
pub use resample::{ResamplePath, Resampler};
pub use synthesis::{MaskSynthesizer, SynthesizedMask};
pub use tensor::{DetectionTensor, MaskEmbeddingTensor};
