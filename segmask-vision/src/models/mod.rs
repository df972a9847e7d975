//! Model shape, class tables and metadata

pub mod classes;
pub mod metadata;
pub mod shape;

pub use classes::{ClassNames, COCO_CLASSES, MAX_CLASS_INDEX};
pub use metadata::ModelMetadata;
pub use shape::{ModelShape, ModelTask};
