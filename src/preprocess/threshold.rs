//! Global and adaptive thresholds producing 0/255 rasters.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};

/// Binary image at Otsu's level: above the level → 255, else 0
pub fn otsu_threshold(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::Binary)
}

/// Adaptive threshold against a Gaussian-weighted local mean.
///
/// `block_size` is the odd side length of the neighbourhood; a pixel turns
/// white when it exceeds the weighted mean minus `c`. The Gaussian sigma is
/// derived from the block size as `0.3 * ((block_size - 1) / 2 - 1) + 0.8`.
pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let block_size = block_size.max(3) | 1;
    let kernel = gaussian_kernel(block_size);
    let mean = separable_blur(gray, &kernel);
    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        let local = mean[idx].round() as i32;
        let value = gray.get_pixel(x, y)[0] as i32;
        if value > local - c {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Normalized 1D Gaussian of odd length `size`
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / two_sigma_sq).exp())
        .collect();
    let total: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= total;
    }
    kernel
}

/// Horizontal then vertical convolution with edge replication
fn separable_blur(gray: &GrayImage, kernel: &[f32]) -> Vec<f32> {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    let half = (kernel.len() / 2) as isize;
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;
    let src = gray.as_raw();

    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = clamp(x as isize + k as isize - half, width);
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * width + x] = acc;
        }
    }

    let mut out = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = clamp(y as isize + k as isize - half, height);
                acc += horizontal[sy * width + x] * weight;
            }
            out[y * width + x] = acc;
        }
    }
    out
}
