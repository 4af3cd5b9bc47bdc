//! Region proposals from a pretrained localization model.
//!
//! The model is frozen. It is loaded (or downloaded, then loaded) once per
//! process and shared read-only between concurrent scans.

pub mod weights;
pub mod yolo;

pub use weights::ensure_weights;
pub use yolo::YoloRegionProposer;

use crate::config::ProposerSettings;
use crate::error::Result;
use crate::models::BoundingBox;
use image::RgbImage;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Per-call proposal knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalParams {
    /// Minimum detection score
    pub confidence: f32,
    /// Square side the image is resized to before inference
    pub inference_size: u32,
}

impl Default for ProposalParams {
    fn default() -> Self {
        Self {
            confidence: 0.2,
            inference_size: 640,
        }
    }
}

/// Something that suggests where codes might be.
///
/// Boxes are clipped to the image and non-empty. Overlapping boxes are
/// allowed; the merge stage absorbs the redundancy. The order must be
/// deterministic for a given image.
pub trait RegionProposer: Send + Sync {
    /// Candidate boxes in source pixel space
    fn propose(&self, image: &RgbImage, params: &ProposalParams) -> Result<Vec<BoundingBox>>;
}

static SHARED: OnceCell<Arc<YoloRegionProposer>> = OnceCell::new();

/// Process-wide model handle, loaded on first use.
///
/// The first successful call fixes the model for the life of the process;
/// later calls return the same handle regardless of `settings`. A failed
/// load is not cached, so a later call may retry.
pub fn shared_proposer(settings: &ProposerSettings) -> Result<Arc<YoloRegionProposer>> {
    SHARED
        .get_or_try_init(|| {
            let path = ensure_weights(settings)?;
            YoloRegionProposer::load(&path, settings.iou_threshold).map(Arc::new)
        })
        .cloned()
}
