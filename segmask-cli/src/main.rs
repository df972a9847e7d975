// segmask command line interface
// Runs the segmentation post-processing pipeline over raw tensor dumps

mod io;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use io::TextFormat;
use segmask_core::{PipelineConfig, PixelFormat, ResampleMode};
use segmask_vision::{ClassNames, CompositeOptions, ModelMetadata, ModelShape, SegmentationPipeline, SimdCapability};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "segmask")]
#[command(about = "Instance segmentation post-processing: decode, mask and composite", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline over a detection and a mask-embedding tensor
    Run {
        /// Raw little-endian f32 detection tensor
        #[arg(long)]
        detection: PathBuf,

        /// Raw little-endian f32 mask-embedding tensor
        #[arg(long)]
        embedding: PathBuf,

        /// Model shape file (JSON, TOML or YAML); defaults to a 640x640 YOLO segmentation head
        #[arg(long)]
        shape: Option<PathBuf>,

        /// Class count for the default shape
        #[arg(long, default_value = "80")]
        num_classes: usize,

        /// Class names as exported model metadata, e.g. "{0: 'cat', 1: 'dog'}"; defaults to COCO
        #[arg(long)]
        names: Option<String>,

        /// Model task from exported metadata; picks the default suppression policy
        #[arg(long)]
        task: Option<String>,

        /// Original image width
        #[arg(long)]
        image_width: u32,

        /// Original image height
        #[arg(long)]
        image_height: u32,

        /// Pipeline configuration file; environment overrides apply otherwise
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Where to write the composited raster
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Raster pixel format
        #[arg(long, value_enum, default_value = "rgba")]
        format: OutputFormat,

        /// Where to write the per-object results as JSON
        #[arg(long)]
        results: Option<PathBuf>,

        /// Disable the vectorized resampler
        #[arg(long)]
        scalar: bool,
    },

    /// Print the default pipeline configuration
    DefaultConfig {
        #[arg(long, value_enum, default_value = "toml")]
        format: TextFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Gray,
    Rgba,
}

impl From<OutputFormat> for PixelFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Gray => PixelFormat::Gray8,
            OutputFormat::Rgba => PixelFormat::Rgba8,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        parse_level(&cli.log_level)?
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            detection,
            embedding,
            shape,
            num_classes,
            names,
            task,
            image_width,
            image_height,
            config,
            output,
            format,
            results,
            scalar,
        } => {
            let shape = match shape {
                Some(path) => io::load_shape(&path)?,
                None => ModelShape::yolo_seg(640, 640, num_classes),
            };
            let mut config = match config {
                Some(path) => PipelineConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::from_env(),
            };
            if scalar {
                config.resample = ResampleMode::Scalar;
            }
            let metadata = load_metadata(names, task)?;
            if config.suppression.is_none() {
                config.suppression = metadata.task.map(|t| t.default_suppression());
            }
            let request = RunRequest {
                detection,
                embedding,
                shape,
                class_names: metadata.class_names(),
                image_width,
                image_height,
                config,
                output,
                format: format.into(),
                results,
            };
            run(request)?;
        }
        Commands::DefaultConfig { format } => {
            println!("{}", io::render(&PipelineConfig::default(), format)?);
        }
    }

    Ok(())
}

fn parse_level(level: &str) -> Result<tracing::Level> {
    match level.to_ascii_lowercase().as_str() {
        "error" => Ok(tracing::Level::ERROR),
        "warn" => Ok(tracing::Level::WARN),
        "info" => Ok(tracing::Level::INFO),
        "debug" => Ok(tracing::Level::DEBUG),
        "trace" => Ok(tracing::Level::TRACE),
        other => bail!("Unknown log level {:?}", other),
    }
}

/// Model metadata from the `--names` and `--task` values
fn load_metadata(names: Option<String>, task: Option<String>) -> Result<ModelMetadata> {
    let pairs = names
        .map(|v| ("names", v))
        .into_iter()
        .chain(task.map(|v| ("task", v)));
    ModelMetadata::from_pairs(pairs).context("Invalid model metadata")
}

struct RunRequest {
    detection: PathBuf,
    embedding: PathBuf,
    shape: ModelShape,
    class_names: ClassNames,
    image_width: u32,
    image_height: u32,
    config: PipelineConfig,
    output: Option<PathBuf>,
    format: PixelFormat,
    results: Option<PathBuf>,
}

fn run(request: RunRequest) -> Result<()> {
    let detection = io::read_f32_le(&request.detection)?;
    let embedding = if request.shape.has_masks() {
        io::read_f32_le(&request.embedding)?
    } else {
        Vec::new()
    };
    debug!(
        "Loaded {} detection and {} embedding values",
        detection.len(),
        embedding.len()
    );

    let pipeline = SegmentationPipeline::new(
        request.shape,
        request.class_names,
        request.config,
        SimdCapability::detect(),
    )?;

    let started = Instant::now();
    let objects = pipeline.process(&detection, &embedding, request.image_width, request.image_height)?;
    info!("Processed {} objects in {:?}", objects.len(), started.elapsed());

    for object in &objects {
        let c = &object.candidate;
        println!(
            "{:<16} {:.3}  box=({}, {}, {}x{})  mask_pixels={}",
            c.class_name,
            c.confidence,
            object.bbox.x,
            object.bbox.y,
            object.bbox.width,
            object.bbox.height,
            object.mask.as_ref().map_or(0, |m| m.count_set())
        );
    }

    if let Some(path) = &request.results {
        let json = serde_json::to_string_pretty(&objects)?;
        fs::write(path, json).with_context(|| format!("Failed to write results {}", path.display()))?;
        info!("Wrote results to {}", path.display());
    }

    if let Some(path) = &request.output {
        let options = CompositeOptions {
            parallel: pipeline.config().parallel,
            ..CompositeOptions::new(request.image_width, request.image_height, request.format)
        };
        let canvas = pipeline.composite(&objects, &options);
        fs::write(path, &canvas.data).with_context(|| format!("Failed to write raster {}", path.display()))?;
        info!(
            "Wrote {}x{} {:?} raster to {}",
            canvas.width,
            canvas.height,
            canvas.format,
            path.display()
        );
    }

    Ok(())
}
