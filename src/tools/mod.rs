//! Helpers shared by the command-line front end and the benches.

use crate::error::Result;
use crate::models::ResultSet;
use crate::pipeline::load_image;
use crate::preprocess::PreprocessingBank;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Outline colour for accepted detections
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline thickness in pixels
const BOX_THICKNESS: i32 = 4;

fn max_dim_from_env() -> Option<u32> {
    env::var("SHEETQR_MAX_DIM")
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
}

/// Load an image as RGB, shrinking it when `SHEETQR_MAX_DIM` is set and
/// the longer side exceeds it.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let rgb = load_image(path.as_ref())?;
    let Some(max_dim) = max_dim_from_env() else {
        return Ok(rgb);
    };
    let (w, h) = rgb.dimensions();
    if w.max(h) <= max_dim {
        return Ok(rgb);
    }
    let scale = max_dim as f32 / w.max(h) as f32;
    let (nw, nh) = (
        ((w as f32 * scale).round() as u32).max(1),
        ((h as f32 * scale).round() as u32).max(1),
    );
    Ok(image::imageops::resize(&rgb, nw, nh, image::imageops::FilterType::Triangle))
}

/// Copy of `image` with a green frame around every detection
pub fn annotate(image: &RgbImage, codes: &ResultSet) -> RgbImage {
    let mut out = image.clone();
    for code in codes {
        let r = code.rect;
        for t in 0..BOX_THICKNESS {
            let rect = Rect::at(r.x as i32 - t, r.y as i32 - t)
                .of_size(r.width + 2 * t as u32, r.height + 2 * t as u32);
            draw_hollow_rect_mut(&mut out, rect, BOX_COLOR);
        }
    }
    out
}

/// Write every preprocessing variant of `image` into `out_dir` as PNG,
/// named `<index>_<tag>.png`
pub fn save_variants(image: &RgbImage, out_dir: &Path) -> image::ImageResult<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let bank = PreprocessingBank::default();
    let mut written = Vec::new();
    for (index, variant) in bank.iter(image).enumerate() {
        let path = out_dir.join(format!("{index}_{}.png", variant.kind.tag()));
        variant.image.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// Default dataset root from the environment
pub fn dataset_root_from_env() -> PathBuf {
    env::var("SHEETQR_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Image paths under `root`, sorted, optionally truncated to `limit`
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp") {
                    images.push(path);
                }
            }
        }
    }

    images
}
