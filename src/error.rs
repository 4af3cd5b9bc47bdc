use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a scan. A backend finding nothing is not an error.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Localization model weights are missing and could not be obtained,
    /// or the runtime rejected them
    #[error("failed to load region model: {0}")]
    ModelLoad(String),

    /// The source file could not be read or decoded as an image
    #[error("unsupported image {path:?}: {source}")]
    UnsupportedImage {
        /// File that failed to load
        path: PathBuf,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// The raster has no pixels
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Raster width
        width: u32,
        /// Raster height
        height: u32,
    },

    /// The loaded model failed while running
    #[error("region model inference failed: {0}")]
    Inference(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A background scan thread died before returning a result
    #[error("scan worker panicked")]
    WorkerPanicked,

    /// The caller cancelled the scan; partial results were discarded
    #[error("scan cancelled")]
    Cancelled,
}

impl From<ort::Error> for DetectError {
    fn from(err: ort::Error) -> Self {
        DetectError::Inference(err.to_string())
    }
}

/// Crate result alias
pub type Result<T> = std::result::Result<T, DetectError>;
