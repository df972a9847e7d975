//! Parsing of exported model metadata (`imgsz`, `names`, `task`)

use super::classes::{ClassNames, MAX_CLASS_INDEX};
use super::shape::{anchor_count, ModelShape, ModelTask};
use crate::error::VisionError;
use tracing::{debug, warn};

/// Metadata entries attached to an exported model
#[derive(Debug, Clone, Default)]
pub struct ModelMetadata {
    pub task: Option<ModelTask>,
    /// `(width, height)` of the model input
    pub input_size: Option<(u32, u32)>,
    pub names: Option<ClassNames>,
}

impl ModelMetadata {
    /// Parse from raw key/value pairs as exposed by the inference engine
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, VisionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut meta = ModelMetadata::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "task" => {
                    meta.task = ModelTask::parse(value);
                    if meta.task.is_none() {
                        warn!("Unrecognized model task {:?}", value);
                    }
                }
                "imgsz" => meta.input_size = Some(parse_imgsz(value)?),
                "names" => meta.names = Some(parse_names(value)?),
                other => debug!("Ignoring metadata key {:?}", other),
            }
        }
        Ok(meta)
    }

    /// Class names, COCO when the model does not declare any
    pub fn class_names(&self) -> ClassNames {
        self.names.clone().unwrap_or_default()
    }

    /// Resolve a full shape from metadata plus the mask tensor's declared dimensions
    pub fn resolve_shape(
        &self,
        mask_channels: usize,
        mask_width: u32,
        mask_height: u32,
    ) -> Result<ModelShape, VisionError> {
        let (input_width, input_height) = self
            .input_size
            .ok_or_else(|| VisionError::Metadata("Missing imgsz entry".to_string()))?;
        let shape = ModelShape {
            input_width,
            input_height,
            num_classes: self.class_names().len(),
            mask_channels,
            mask_width,
            mask_height,
            anchors: anchor_count(input_width, input_height),
        };
        shape.validate()?;
        Ok(shape)
    }
}

/// `"[640, 640]"` (height, width) or a bare `"640"`
fn parse_imgsz(value: &str) -> Result<(u32, u32), VisionError> {
    let trimmed = value.trim().trim_start_matches('[').trim_end_matches(']');
    let dims: Vec<u32> = trimmed
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u32>()
                .map_err(|_| VisionError::Metadata(format!("Invalid imgsz component {:?}", p)))
        })
        .collect::<Result<_, _>>()?;

    match dims.as_slice() {
        [side] => Ok((*side, *side)),
        [height, width] => Ok((*width, *height)),
        _ => Err(VisionError::Metadata(format!("Invalid imgsz {:?}", value))),
    }
}

/// `"{0: 'person', 1: \"traffic light\"}"`
fn parse_names(value: &str) -> Result<ClassNames, VisionError> {
    let body = value.trim();
    let body = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .ok_or_else(|| VisionError::Metadata("names must be a {index: name} map".to_string()))?;

    let mut entries = Vec::new();
    let mut chars = body.char_indices().peekable();

    loop {
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut colon = None;
        for (i, c) in chars.by_ref() {
            if c == ':' {
                colon = Some(i);
                break;
            }
        }
        let colon =
            colon.ok_or_else(|| VisionError::Metadata("Missing ':' in names entry".to_string()))?;
        let index = body[start..colon].trim().parse::<usize>().map_err(|_| {
            VisionError::Metadata(format!("Invalid class index {:?}", body[start..colon].trim()))
        })?;
        if index > MAX_CLASS_INDEX {
            return Err(VisionError::Metadata(format!(
                "Class index {} exceeds {}",
                index, MAX_CLASS_INDEX
            )));
        }

        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let quote = match chars.next() {
            Some((_, q)) if q == '\'' || q == '"' => q,
            _ => return Err(VisionError::Metadata("Class name must be quoted".to_string())),
        };

        let mut name = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
            if c == quote {
                closed = true;
                break;
            }
            name.push(c);
        }
        if !closed {
            return Err(VisionError::Metadata("Unterminated class name".to_string()));
        }
        entries.push((index, name));
    }

    if entries.is_empty() {
        return Err(VisionError::Metadata("names map is empty".to_string()));
    }
    Ok(ClassNames::from_indexed(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs() {
        let meta = ModelMetadata::from_pairs(vec![
            ("task", "segment"),
            ("imgsz", "[480, 640]"),
            ("names", "{0: 'person', 1: \"traffic light\", 2: 'it, too'}"),
            ("stride", "32"),
        ])
        .unwrap();
        assert_eq!(meta.task, Some(ModelTask::Segment));
        assert_eq!(meta.input_size, Some((640, 480)));
        let names = meta.class_names();
        assert_eq!(names.len(), 3);
        assert_eq!(names.name(1), "traffic light");
        assert_eq!(names.name(2), "it, too");
    }

    #[test]
    fn test_square_imgsz() {
        assert_eq!(parse_imgsz("320").unwrap(), (320, 320));
        assert!(parse_imgsz("[1, 2, 3]").is_err());
        assert!(parse_imgsz("[a, 2]").is_err());
    }

    #[test]
    fn test_bad_names() {
        assert!(parse_names("[0, 1]").is_err());
        assert!(parse_names("{0: person}").is_err());
        assert!(parse_names("{0: 'person}").is_err());
        assert!(parse_names("{}").is_err());
    }

    #[test]
    fn test_names_index_bound() {
        for raw in ["{18446744073709551615: 'x'}", "{1000000000000: 'x'}", "{65537: 'x'}"] {
            assert!(matches!(parse_names(raw), Err(VisionError::Metadata(_))), "{}", raw);
        }
        let names = parse_names("{65536: 'last'}").unwrap();
        assert_eq!(names.len(), 65_537);
        assert_eq!(names.name(65_536), "last");
    }

    #[test]
    fn test_resolve_shape() {
        let meta = ModelMetadata::from_pairs(vec![("imgsz", "[640, 640]")]).unwrap();
        let shape = meta.resolve_shape(32, 160, 160).unwrap();
        assert_eq!(shape.num_classes, 80);
        assert_eq!(shape.anchors, 8400);
    }

    #[test]
    fn test_resolve_shape_without_imgsz() {
        let meta = ModelMetadata::default();
        assert!(matches!(meta.resolve_shape(32, 160, 160), Err(VisionError::Metadata(_))));
    }
}
