//! segmask-core: shared error taxonomy, configuration and geometry types
//! for the segmask detection and mask pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use config::{PipelineConfig, ResampleMode, SuppressionPolicy, Thresholds};
pub use error::{Error, Result};
pub use types::{BoundingBox, BoxF32, PixelFormat, Rgba};
