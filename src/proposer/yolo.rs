//! YOLOv8 ONNX region proposer.
//!
//! Output tensors have the layout `[1, 4 + classes, anchors]` with boxes in
//! centre format at inference resolution. Scores are taken class-agnostic
//! (best class per anchor) since any class counts as "a code is here".

use super::{ProposalParams, RegionProposer};
use crate::error::{DetectError, Result};
use crate::models::BoundingBox;
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// A scored box in source pixel space, corner format
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoredBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl ScoredBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &ScoredBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Region proposer backed by a YOLOv8 ONNX session
pub struct YoloRegionProposer {
    // Session::run needs &mut
    session: Mutex<Session>,
    iou_threshold: f32,
}

impl YoloRegionProposer {
    /// Load weights from `model_path`
    pub fn load(model_path: &Path, iou_threshold: f32) -> Result<Self> {
        info!("Loading region model from {}", model_path.display());
        let session = Session::builder()
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", model_path.display())))?;
        info!("Region model loaded");
        Ok(Self {
            session: Mutex::new(session),
            iou_threshold,
        })
    }

    /// Stretch-resize to the inference square, CHW, scaled to [0, 1]
    fn preprocess(image: &RgbImage, size: u32) -> Array4<f32> {
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
        let side = size as usize;
        let mut input = Array4::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
        input
    }
}

impl RegionProposer for YoloRegionProposer {
    fn propose(&self, image: &RgbImage, params: &ProposalParams) -> Result<Vec<BoundingBox>> {
        let (width, height) = image.dimensions();
        let input = Self::preprocess(image, params.inference_size);
        let scale = (
            width as f32 / params.inference_size as f32,
            height as f32 / params.inference_size as f32,
        );

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Inference("model session poisoned".to_string()))?;
        let tensor = TensorRef::from_array_view(input.view())?;
        let outputs = session.run(ort::inputs![tensor])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = shape.as_ref();
        debug!("region model output shape: {:?}", dims);

        let raw = decode_predictions(data, dims, params.confidence, scale)?;
        let kept = non_max_suppression(raw, self.iou_threshold);
        let boxes: Vec<BoundingBox> = kept
            .iter()
            .filter_map(|b| {
                // Truncate toward zero, then clamp
                BoundingBox::from_corners(
                    b.x1 as i64,
                    b.y1 as i64,
                    b.x2 as i64,
                    b.y2 as i64,
                    width,
                    height,
                )
            })
            .collect();
        debug!("{} regions after suppression", boxes.len());
        Ok(boxes)
    }
}

/// Anchors scoring at least `confidence`, mapped into source pixels
pub(crate) fn decode_predictions(
    data: &[f32],
    dims: &[i64],
    confidence: f32,
    scale: (f32, f32),
) -> Result<Vec<ScoredBox>> {
    if dims.len() != 3 || dims[1] < 5 {
        return Err(DetectError::Inference(format!(
            "unexpected output shape {dims:?}, want [1, 4 + classes, anchors]"
        )));
    }
    let features = dims[1] as usize;
    let anchors = dims[2] as usize;
    if data.len() < features * anchors {
        return Err(DetectError::Inference(format!(
            "output holds {} values, shape {dims:?} needs {}",
            data.len(),
            features * anchors
        )));
    }

    let feature = |f: usize, a: usize| data[f * anchors + a];
    let mut boxes = Vec::new();
    for a in 0..anchors {
        let score = (4..features).map(|f| feature(f, a)).fold(0.0f32, f32::max);
        if score < confidence {
            continue;
        }
        let (cx, cy, w, h) = (feature(0, a), feature(1, a), feature(2, a), feature(3, a));
        boxes.push(ScoredBox {
            x1: (cx - w / 2.0) * scale.0,
            y1: (cy - h / 2.0) * scale.1,
            x2: (cx + w / 2.0) * scale.0,
            y2: (cy + h / 2.0) * scale.1,
            confidence: score,
        });
    }
    Ok(boxes)
}

/// Greedy class-agnostic NMS, highest confidence first.
///
/// Equal scores are ordered top-to-bottom, then left-to-right, so the
/// output order is stable.
pub(crate) fn non_max_suppression(mut boxes: Vec<ScoredBox>, iou_threshold: f32) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.y1.total_cmp(&b.y1))
            .then(a.x1.total_cmp(&b.x1))
    });
    let mut keep: Vec<ScoredBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
