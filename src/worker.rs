//! Running a scan off the caller's thread.
//!
//! Interactive front ends hand the image to a [`ScanJob`] and stay
//! responsive; a cancel request is honored at the next checkpoint, and a
//! result that completes after cancellation is still discarded.

use crate::error::{DetectError, Result};
use crate::pipeline::{CancelToken, Pipeline, ScanReport};
use image::RgbImage;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// A scan running on its own thread
pub struct ScanJob {
    cancel: CancelToken,
    handle: JoinHandle<Result<ScanReport>>,
}

impl ScanJob {
    /// Start scanning `image` on a new thread
    pub fn spawn(pipeline: Arc<Pipeline>, image: RgbImage) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = std::thread::spawn(move || pipeline.scan(&image, &token));
        Self { cancel, handle }
    }

    /// Ask the scan to stop and its result to be dropped
    pub fn cancel(&self) {
        debug!("scan job cancelled");
        self.cancel.cancel();
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the scan. Returns `Cancelled` whenever a cancel was
    /// requested, even if the scan itself had already completed.
    pub fn join(self) -> Result<ScanReport> {
        let outcome = self
            .handle
            .join()
            .map_err(|_| DetectError::WorkerPanicked)?;
        if self.cancel.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectConfig;
    use crate::models::BoundingBox;
    use crate::proposer::{ProposalParams, RegionProposer};
    use image::Rgb;

    struct PanickingProposer;

    impl RegionProposer for PanickingProposer {
        fn propose(&self, _image: &RgbImage, _params: &ProposalParams) -> Result<Vec<BoundingBox>> {
            panic!("proposer blew up");
        }
    }

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(DetectConfig::whole_image_only(), None).unwrap())
    }

    #[test]
    fn test_job_completes() {
        let image = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
        let report = ScanJob::spawn(pipeline(), image).join().unwrap();
        assert!(report.codes.is_empty());
        assert!(report.telemetry.fallback_ran);
    }

    #[test]
    fn test_cancel_discards_result() {
        let image = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
        let job = ScanJob::spawn(pipeline(), image);
        job.cancel();
        assert!(matches!(job.join(), Err(DetectError::Cancelled)));
    }

    #[test]
    fn test_cancel_after_completion_still_discards() {
        let image = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let job = ScanJob::spawn(pipeline(), image);
        while !job.is_finished() {
            std::thread::yield_now();
        }
        job.cancel();
        assert!(matches!(job.join(), Err(DetectError::Cancelled)));
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let pipeline =
            Pipeline::new(DetectConfig::default(), Some(Arc::new(PanickingProposer))).unwrap();
        let image = RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]));
        let job = ScanJob::spawn(Arc::new(pipeline), image);
        assert!(matches!(job.join(), Err(DetectError::WorkerPanicked)));
    }
}
