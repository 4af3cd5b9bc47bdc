//! Scan orchestration.
//!
//! A scan is a small state machine:
//! `RegionScan -> (WholeImageFallback) -> Done`. The region pass decodes
//! each proposed box directly; the fallback runs every preprocessing variant
//! of the whole image and only happens when the region pass found fewer
//! distinct payloads than `min_qr_count`. With `WholeImageOnly` the scan
//! starts in the fallback state.

use crate::backends::{DecodeBackend, default_backends};
use crate::config::{DetectConfig, ScanStrategy};
use crate::error::{DetectError, Result};
use crate::merge::{Merger, Placement};
use crate::models::ResultSet;
use crate::preprocess::PreprocessingBank;
use crate::proposer::{ProposalParams, RegionProposer, shared_proposer};
use crate::utils::grayscale::{rgb_to_luma, to_luma};
use image::{GrayImage, RgbImage};
use image::imageops::crop_imm;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared between a caller and a scan.
///
/// Scans poll it before starting, after every region and after every
/// variant; a cancelled scan returns `DetectError::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DetectError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Counters describing how a scan went
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTelemetry {
    /// Boxes returned by the region proposer
    pub regions_proposed: usize,
    /// Backend runs during the region pass
    pub region_attempts: usize,
    /// Backend runs during the whole-image pass
    pub variant_attempts: usize,
    /// Whether the whole-image pass ran
    pub fallback_ran: bool,
    /// Entries without a payload in the final result
    pub unreadable: usize,
}

/// Results of one scan plus its telemetry
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Deduplicated detections in discovery order
    pub codes: ResultSet,
    /// Scan counters
    pub telemetry: ScanTelemetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    RegionScan,
    WholeImageFallback,
    Done,
}

/// Configured scanner. Cheap to share behind an `Arc`; scans do not
/// mutate it.
pub struct Pipeline {
    config: DetectConfig,
    proposer: Option<Arc<dyn RegionProposer>>,
    bank: PreprocessingBank,
    backends: Vec<Box<dyn DecodeBackend>>,
}

impl Pipeline {
    /// Build a pipeline around an explicit proposer.
    ///
    /// `RegionFirst` requires a proposer; `WholeImageOnly` ignores it.
    pub fn new(config: DetectConfig, proposer: Option<Arc<dyn RegionProposer>>) -> Result<Self> {
        config.validate()?;
        if config.strategy == ScanStrategy::RegionFirst && proposer.is_none() {
            return Err(DetectError::ModelLoad(
                "region-first scanning needs a region proposer".to_string(),
            ));
        }
        Ok(Self {
            config,
            proposer,
            bank: PreprocessingBank::default(),
            backends: default_backends(),
        })
    }

    /// Build a pipeline using the process-wide model handle.
    ///
    /// If the model cannot be loaded and `proposer.optional` is set, the
    /// pipeline degrades to whole-image scanning instead of failing.
    pub fn from_config(config: DetectConfig) -> Result<Self> {
        if config.strategy == ScanStrategy::WholeImageOnly {
            return Self::new(config, None);
        }
        config.validate()?;
        match shared_proposer(&config.proposer) {
            Ok(proposer) => Self::new(config, Some(proposer)),
            Err(err) if config.proposer.optional => {
                warn!("{err}; continuing with whole-image scanning only");
                let config = DetectConfig {
                    strategy: ScanStrategy::WholeImageOnly,
                    ..config
                };
                Self::new(config, None)
            }
            Err(err) => Err(err),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Scan with no way to cancel
    pub fn detect(&self, image: &RgbImage) -> Result<ResultSet> {
        self.scan(image, &CancelToken::new()).map(|report| report.codes)
    }

    /// Load an image file and scan it
    pub fn detect_path<P: AsRef<Path>>(&self, path: P) -> Result<ResultSet> {
        let image = load_image(path.as_ref())?;
        self.detect(&image)
    }

    /// Full scan with cancellation checkpoints and telemetry
    pub fn scan(&self, image: &RgbImage, cancel: &CancelToken) -> Result<ScanReport> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyImage { width, height });
        }
        cancel.checkpoint()?;

        let mut merger = Merger::new(image, self.config.record_unreadable);
        let mut telemetry = ScanTelemetry::default();
        let mut phase = match self.config.strategy {
            ScanStrategy::RegionFirst => ScanPhase::RegionScan,
            ScanStrategy::WholeImageOnly => ScanPhase::WholeImageFallback,
        };

        loop {
            phase = match phase {
                ScanPhase::RegionScan => {
                    self.region_scan(image, &mut merger, &mut telemetry, cancel)?;
                    let found = merger.unique_payloads();
                    if found < self.config.min_qr_count {
                        info!(
                            found,
                            min = self.config.min_qr_count,
                            "Region pass below target, scanning whole image"
                        );
                        ScanPhase::WholeImageFallback
                    } else {
                        ScanPhase::Done
                    }
                }
                ScanPhase::WholeImageFallback => {
                    telemetry.fallback_ran = true;
                    self.whole_image_scan(image, &mut merger, &mut telemetry, cancel)?;
                    ScanPhase::Done
                }
                ScanPhase::Done => break,
            };
        }

        let codes = merger.finish();
        telemetry.unreadable = codes.len() - codes.unique_payloads();
        info!(
            codes = codes.unique_payloads(),
            unreadable = telemetry.unreadable,
            fallback = telemetry.fallback_ran,
            "Scan finished"
        );
        Ok(ScanReport { codes, telemetry })
    }

    fn region_scan(
        &self,
        image: &RgbImage,
        merger: &mut Merger<'_>,
        telemetry: &mut ScanTelemetry,
        cancel: &CancelToken,
    ) -> Result<()> {
        let proposer = self.proposer.as_ref().ok_or_else(|| {
            DetectError::ModelLoad("no region proposer available".to_string())
        })?;
        let params = ProposalParams {
            confidence: self.config.proposer_confidence,
            inference_size: self.config.proposer_inference_size,
        };
        let regions = proposer.propose(image, &params)?;
        telemetry.regions_proposed = regions.len();
        info!("{} candidate regions", regions.len());

        let (width, height) = image.dimensions();
        for region in regions {
            if let Some(region) = region.clipped(width, height) {
                let crop = crop_imm(image, region.x, region.y, region.width, region.height).to_image();
                let gray = rgb_to_luma(&crop);
                telemetry.region_attempts +=
                    self.run_backends(&gray, &Placement::region(&region), merger);
            }
            cancel.checkpoint()?;
        }
        Ok(())
    }

    fn whole_image_scan(
        &self,
        image: &RgbImage,
        merger: &mut Merger<'_>,
        telemetry: &mut ScanTelemetry,
        cancel: &CancelToken,
    ) -> Result<()> {
        for variant in self.bank.iter(image) {
            let before = merger.unique_payloads();
            let gray = to_luma(&variant.image);
            telemetry.variant_attempts +=
                self.run_backends(&gray, &Placement::scaled(variant.kind.scale()), merger);
            debug!(
                variant = variant.kind.tag(),
                new = merger.unique_payloads() - before,
                "variant scanned"
            );
            cancel.checkpoint()?;
        }
        Ok(())
    }

    /// Every backend over one raster, in order; returns attempts made
    fn run_backends(&self, gray: &GrayImage, placement: &Placement, merger: &mut Merger<'_>) -> usize {
        for backend in &self.backends {
            for symbol in backend.decode(gray) {
                merger.accept(symbol, placement);
            }
        }
        self.backends.len()
    }
}

/// Decode an image file into RGB
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(|source| DetectError::UnsupportedImage {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}
