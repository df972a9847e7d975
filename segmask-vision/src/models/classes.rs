//! Class name tables

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest class index accepted from model metadata
pub const MAX_CLASS_INDEX: usize = 65_536;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Index to label lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Builds a dense table from sparse `(index, name)` pairs; gaps get generated names.
    /// Entries past [`MAX_CLASS_INDEX`] are dropped.
    pub fn from_indexed(entries: impl IntoIterator<Item = (usize, String)>) -> Self {
        let mut names: Vec<Option<String>> = Vec::new();
        for (idx, name) in entries {
            let len = match idx.checked_add(1) {
                Some(len) if idx <= MAX_CLASS_INDEX => len,
                _ => {
                    warn!("Dropping class {:?} with index {} past {}", name, idx, MAX_CLASS_INDEX);
                    continue;
                }
            };
            if len > names.len() {
                names.resize(len, None);
            }
            names[idx] = Some(name);
        }
        Self::new(
            names
                .into_iter()
                .enumerate()
                .map(|(i, n)| n.unwrap_or_else(|| fallback_name(i)))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label for `index`, `class_<index>` when unknown
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .cloned()
            .unwrap_or_else(|| fallback_name(index))
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::coco()
    }
}

fn fallback_name(index: usize) -> String {
    format!("class_{}", index)
}
