//! Error types for segmask-vision

use segmask_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tensor shape error: {0}")]
    Shape(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Core(inner) => inner,
            VisionError::Shape(msg) => CoreError::ShapeMismatch {
                expected: "declared model shape".to_string(),
                actual: msg,
            },
            VisionError::Metadata(msg) => CoreError::Parse(msg),
            VisionError::Config(msg) => CoreError::Configuration(msg),
        }
    }
}
