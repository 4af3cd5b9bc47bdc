//! sheetqr - find and read every QR code on a photographed sheet
//!
//! A learned region proposer points at likely codes, two independent
//! decode backends read each region, and when that cheap pass finds too
//! few codes the whole page is rescanned under seven preprocessing
//! variants. Results are merged into one entry per distinct payload.
//!
//! ```no_run
//! use sheetqr::{DetectConfig, detect};
//!
//! let codes = detect("labels.jpg", &DetectConfig::default())?;
//! for code in &codes {
//!     println!("{:?} at {:?}", code.payload, code.rect);
//! }
//! # Ok::<(), sheetqr::DetectError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Decode backends (multi-symbol and finder-geometry readers)
pub mod backends;
/// Scan configuration
pub mod config;
/// Finder-pattern localization used by the geometric backend
pub mod detector;
/// Error type and result alias
pub mod error;
/// Deduplicating result merger
pub mod merge;
/// Core data structures (BoundingBox, DetectedCode, ResultSet, Quad, ...)
pub mod models;
/// Payload sub-field extraction
pub mod payload;
/// Scan orchestration and cancellation
pub mod pipeline;
/// Image preprocessing variants
pub mod preprocess;
/// Region proposals from the localization model
pub mod proposer;
/// CLI and bench helpers (loading, datasets, annotation)
pub mod tools;
/// Utility functions (grayscale, binarization, geometry)
pub mod utils;
/// Background scan jobs
pub mod worker;

pub use config::{DetectConfig, ProposerSettings, ScanStrategy};
pub use error::{DetectError, Result};
pub use models::{BoundingBox, DetectedCode, Point, Quad, ResultSet};
pub use pipeline::{CancelToken, Pipeline, ScanReport, ScanTelemetry};
pub use proposer::{ProposalParams, RegionProposer};

use image::RgbImage;
use std::path::Path;

/// Detect every QR code in the image file at `path`.
///
/// The file is decoded before the model is touched, so an unreadable image
/// fails with [`DetectError::UnsupportedImage`] and nothing else runs.
pub fn detect<P: AsRef<Path>>(path: P, config: &DetectConfig) -> Result<ResultSet> {
    let image = pipeline::load_image(path.as_ref())?;
    detect_image(&image, config)
}

/// Detect every QR code in an already decoded raster
pub fn detect_image(image: &RgbImage, config: &DetectConfig) -> Result<ResultSet> {
    Pipeline::from_config(config.clone())?.detect(image)
}
