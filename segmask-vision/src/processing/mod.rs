//! Vision processing pipelines

pub mod detection;
pub mod segmentation;

pub use detection::DetectionPipeline;
pub use segmentation::{composite_results, CompositeOptions, ObjectResult, SegmentationPipeline};
