// Tensor dumps, shape files and output writers

use anyhow::{bail, Context, Result};
use segmask_vision::ModelShape;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read a raw little-endian `f32` dump
pub fn read_f32_le(path: &Path) -> Result<Vec<f32>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read tensor {}", path.display()))?;
    if bytes.len() % 4 != 0 {
        bail!(
            "Tensor {} is {} bytes, not a whole number of f32 values",
            path.display(),
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Load a model shape from JSON, TOML or YAML
pub fn load_shape(path: &Path) -> Result<ModelShape> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read shape {}", path.display()))?;
    parse_shape(&content).with_context(|| format!("Invalid shape file {}", path.display()))
}

pub fn parse_shape(content: &str) -> Result<ModelShape> {
    if let Ok(shape) = serde_json::from_str(content) {
        return Ok(shape);
    }
    if let Ok(shape) = toml::from_str(content) {
        return Ok(shape);
    }
    serde_yaml::from_str(content).context("Shape is not valid JSON, TOML or YAML")
}

/// Serialize `value` in the requested text format
pub fn render<T: Serialize>(value: &T, format: TextFormat) -> Result<String> {
    Ok(match format {
        TextFormat::Json => serde_json::to_string_pretty(value)?,
        TextFormat::Toml => toml::to_string_pretty(value)?,
        TextFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TextFormat {
    Json,
    Toml,
    Yaml,
}
