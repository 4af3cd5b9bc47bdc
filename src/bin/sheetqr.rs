use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use sheetqr::payload::barcode_value;
use sheetqr::tools::{annotate, dataset_iter, dataset_root_from_env, load_rgb, save_variants};
use sheetqr::worker::ScanJob;
use sheetqr::{BoundingBox, DetectConfig, Pipeline, ScanStrategy, ScanTelemetry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetqr", version, about = "Find and read every QR code on a label sheet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    RegionFirst,
    WholeImageOnly,
}

impl From<StrategyArg> for ScanStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::RegionFirst => ScanStrategy::RegionFirst,
            StrategyArg::WholeImageOnly => ScanStrategy::WholeImageOnly,
        }
    }
}

/// Settings shared by the scanning subcommands
#[derive(clap::Args)]
struct ScanArgs {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Fallback threshold on distinct payloads
    #[arg(long)]
    min_count: Option<usize>,
    /// Region proposer score cutoff
    #[arg(long)]
    confidence: Option<f32>,
    /// ONNX weights for the region proposer: a YOLOv8n detector exported to
    /// ONNX (`yolo export model=yolov8n.pt format=onnx`), 640x640 input
    #[arg(long)]
    model: Option<PathBuf>,
    /// Download the weights from this URL when `--model` does not exist
    #[arg(long)]
    model_url: Option<String>,
    /// Keep located but undecodable codes
    #[arg(long)]
    record_unreadable: bool,
}

impl ScanArgs {
    fn resolve(&self) -> Result<DetectConfig> {
        let mut config = match &self.config {
            Some(path) => DetectConfig::from_json_file(path)?,
            None => DetectConfig::default(),
        };
        if let Some(strategy) = self.strategy {
            config.strategy = strategy.into();
        }
        if let Some(min_count) = self.min_count {
            config.min_qr_count = min_count;
        }
        if let Some(confidence) = self.confidence {
            config.proposer_confidence = confidence;
        }
        if let Some(model) = &self.model {
            config.proposer.model_path = model.clone();
        }
        if let Some(url) = &self.model_url {
            config.proposer.model_url = Some(url.clone());
        }
        config.record_unreadable |= self.record_unreadable;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Scan a single image
    Detect {
        #[arg(long)]
        image: PathBuf,
        #[command(flatten)]
        scan: ScanArgs,
        /// Write a copy with detections outlined
        #[arg(long)]
        annotate: Option<PathBuf>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Give up on the scan after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Write the seven preprocessing variants of an image
    Variants {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Scan every image under a directory in parallel
    Batch {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        scan: ScanArgs,
    },
}

#[derive(Serialize)]
struct CodeRecord<'a> {
    payload: Option<&'a str>,
    barcode: Option<&'a str>,
    rect: BoundingBox,
}

#[derive(Serialize)]
struct ImageRecord<'a> {
    image: &'a Path,
    codes: Vec<CodeRecord<'a>>,
    telemetry: ScanTelemetry,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Detect {
            image,
            scan,
            annotate,
            json,
            timeout_ms,
        } => detect_cmd(&image, &scan, annotate.as_deref(), json, timeout_ms),
        Command::Variants { image, out_dir } => variants_cmd(&image, &out_dir),
        Command::Batch { root, limit, scan } => batch_cmd(root, limit, &scan),
    }
}

fn detect_cmd(
    image_path: &Path,
    scan: &ScanArgs,
    annotate_to: Option<&Path>,
    json: bool,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let config = scan.resolve()?;
    let image = load_rgb(image_path).with_context(|| format!("loading {}", image_path.display()))?;
    let pipeline = Arc::new(Pipeline::from_config(config)?);

    let start = Instant::now();
    let job = ScanJob::spawn(pipeline, image.clone());
    if let Some(limit) = timeout_ms.map(Duration::from_millis) {
        while !job.is_finished() {
            if start.elapsed() >= limit {
                warn!("Scan exceeded {} ms, cancelling", limit.as_millis());
                job.cancel();
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
    let report = job.join()?;
    let elapsed = start.elapsed();

    if json {
        let record = ImageRecord {
            image: image_path,
            codes: report
                .codes
                .iter()
                .map(|c| CodeRecord {
                    payload: c.payload.as_deref(),
                    barcode: c.payload.as_deref().map(barcode_value),
                    rect: c.rect,
                })
                .collect(),
            telemetry: report.telemetry,
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Image: {} ({}x{})",
            image_path.display(),
            image.width(),
            image.height()
        );
        println!(
            "Found {} QR codes in {:.1} ms",
            report.codes.unique_payloads(),
            elapsed.as_secs_f64() * 1000.0
        );
        for (i, code) in report.codes.iter().enumerate() {
            let r = code.rect;
            match &code.payload {
                Some(payload) => println!(
                    "  QR {i}: ({}, {}, {}x{}) {payload} [{}]",
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    barcode_value(payload)
                ),
                None => println!("  QR {i}: ({}, {}, {}x{}) <unreadable>", r.x, r.y, r.width, r.height),
            }
        }
        if report.codes.has_unreadable() {
            println!("Some codes were located but could not be read");
        }
    }

    if let Some(out) = annotate_to {
        annotate(&image, &report.codes)
            .save(out)
            .with_context(|| format!("writing {}", out.display()))?;
        info!("Annotated image written to {}", out.display());
    }
    Ok(())
}

fn variants_cmd(image_path: &Path, out_dir: &Path) -> Result<()> {
    let image = load_rgb(image_path).with_context(|| format!("loading {}", image_path.display()))?;
    let written = save_variants(&image, out_dir)
        .with_context(|| format!("writing variants to {}", out_dir.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn batch_cmd(root: Option<PathBuf>, limit: Option<usize>, scan: &ScanArgs) -> Result<()> {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let paths: Vec<PathBuf> = dataset_iter(&root, limit).collect();
    if paths.is_empty() {
        warn!("No images found under {}", root.display());
        return Ok(());
    }
    let pipeline = Arc::new(Pipeline::from_config(scan.resolve()?)?);

    let start = Instant::now();
    let counts: Vec<usize> = paths
        .par_iter()
        .map(|path| {
            let outcome = load_rgb(path).and_then(|image| pipeline.detect(&image));
            match outcome {
                Ok(codes) => {
                    println!("{}: {} codes", path.display(), codes.unique_payloads());
                    codes.unique_payloads()
                }
                Err(err) => {
                    warn!("{}: {err}", path.display());
                    0
                }
            }
        })
        .collect();

    let total: usize = counts.iter().sum();
    println!(
        "Scanned {} images, {} codes, {:.1} ms/image",
        paths.len(),
        total,
        start.elapsed().as_secs_f64() * 1000.0 / paths.len() as f64
    );
    Ok(())
}
