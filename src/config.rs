//! Scan configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable config.

use crate::error::{DetectError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the orchestrator sequences its passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Cheap per-region pass first; whole-image variant pass only on low yield
    #[default]
    RegionFirst,
    /// Skip region proposals and always run the whole-image variant pass
    WholeImageOnly,
}

/// Where the localization model comes from and how its output is filtered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposerSettings {
    /// ONNX weights on disk: a YOLOv8n detector exported to ONNX with a
    /// 640x640 input and `[1, 4 + classes, anchors]` output
    pub model_path: PathBuf,
    /// Download source used when `model_path` does not exist; unset by
    /// default
    pub model_url: Option<String>,
    /// Class-agnostic NMS overlap threshold
    pub iou_threshold: f32,
    /// Fall back to whole-image scanning when the model cannot be loaded
    pub optional: bool,
}

impl Default for ProposerSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("yolov8n.onnx"),
            model_url: None,
            iou_threshold: 0.7,
            optional: false,
        }
    }
}

/// Options for one `detect` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Region proposer score cutoff
    pub proposer_confidence: f32,
    /// Square resolution fed to the localization model
    pub proposer_inference_size: u32,
    /// Fallback runs when fewer unique payloads than this were found
    pub min_qr_count: usize,
    /// Keep located-but-undecoded symbols as absent-payload entries
    pub record_unreadable: bool,
    /// Pass sequencing
    pub strategy: ScanStrategy,
    /// Model source
    pub proposer: ProposerSettings,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            proposer_confidence: 0.2,
            proposer_inference_size: 640,
            min_qr_count: 3,
            record_unreadable: false,
            strategy: ScanStrategy::RegionFirst,
            proposer: ProposerSettings::default(),
        }
    }
}

impl DetectConfig {
    /// Config that never touches the localization model
    pub fn whole_image_only() -> Self {
        Self {
            strategy: ScanStrategy::WholeImageOnly,
            ..Self::default()
        }
    }

    /// Read a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DetectError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| DetectError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if !self.proposer_confidence.is_finite() || !(0.0..=1.0).contains(&self.proposer_confidence) {
            return Err(DetectError::Config(format!(
                "proposer_confidence must be within [0, 1], got {}",
                self.proposer_confidence
            )));
        }
        if self.proposer_inference_size == 0 {
            return Err(DetectError::Config(
                "proposer_inference_size must be positive".to_string(),
            ));
        }
        let iou = self.proposer.iou_threshold;
        if !iou.is_finite() || iou <= 0.0 || iou > 1.0 {
            return Err(DetectError::Config(format!(
                "proposer.iou_threshold must be within (0, 1], got {iou}"
            )));
        }
        Ok(())
    }
}
