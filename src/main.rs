use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use numtag::config::{AppConfig, load_config};
use numtag::decode::{FrameDecoder, ImageFrameDecoder};
use numtag::{FrameOptions, FrameResult, OcrsRecognizer, Pipeline};

#[derive(Parser)]
#[command(name = "numtag")]
#[command(about = "Detect number tags in images and read their codes")]
struct Cli {
    /// Frames to process, in order
    #[arg(value_name = "IMAGES", required = true)]
    images: Vec<PathBuf>,

    /// Confirm codes by voting across the given frames
    #[arg(long)]
    vote: bool,

    /// Recognize the raw crop without enhancement
    #[arg(long)]
    no_preprocess: bool,

    /// Only report tag regions
    #[arg(long)]
    detect_only: bool,

    /// Skip text recognition (no models needed)
    #[arg(long)]
    skip_ocr: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the OCR models
    #[arg(long, value_name = "DIR")]
    models: Option<PathBuf>,

    /// Per-region recognition timeout
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print one JSON object per frame
    #[arg(long)]
    json: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "numtag=debug" } else { "numtag=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(timeout_ms) = args.timeout_ms {
        config.recognizer.timeout_ms = timeout_ms;
    }
    if args.models.is_some() {
        config.recognizer.model_dir = args.models.clone();
    }

    let mut pipeline = Pipeline::new(&config)?;

    if !args.skip_ocr && !args.detect_only {
        let recognizer = OcrsRecognizer::load(config.recognizer.model_dir.as_deref())?;
        pipeline = pipeline.with_recognizer(Arc::new(recognizer));
    }

    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    if args.detect_only {
        return detect(&mut pipeline, &args);
    }

    let options = FrameOptions {
        use_preprocessing: !args.no_preprocess,
        use_voting: args.vote,
    };

    let mut successful = 0;
    for path in &args.images {
        let result = match std::fs::read(path) {
            Ok(bytes) => pipeline.process_bytes(&bytes, options),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                continue;
            }
        };
        if result.code.is_some() {
            successful += 1;
        }
        print_result(path, &result, args.json)?;
    }

    info!("{} of {} frames produced a code", successful, args.images.len());
    Ok(())
}

fn detect(pipeline: &mut Pipeline, args: &Cli) -> Result<()> {
    let decoder = ImageFrameDecoder;

    for path in &args.images {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let frame = match decoder.decode(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let detections = pipeline.detect_frame(&frame);
        if args.json {
            let line = serde_json::json!({
                "image": path.display().to_string(),
                "detections": detections,
            });
            println!("{}", line);
        } else {
            println!("{}: {} tag(s)", path.display(), detections.len());
            for det in &detections {
                println!(
                    "  {} at ({}, {})-({}, {}) - confidence: {:.2}",
                    det.label, det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2, det.confidence
                );
            }
        }
    }

    Ok(())
}

fn print_result(path: &std::path::Path, result: &FrameResult, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(result)?;
        value["image"] = serde_json::Value::String(path.display().to_string());
        value["message"] = serde_json::Value::String(result.status.message().to_string());
        println!("{}", value);
        return Ok(());
    }

    match &result.code {
        Some(code) => println!(
            "{}: {} - confidence: {:.2} ({})",
            path.display(),
            code,
            result.confidence,
            result.status.message()
        ),
        None => println!("{}: {}", path.display(), result.status.message()),
    }
    Ok(())
}
