//! Grayscale → BitMatrix binarization (true = dark)
use crate::models::BitMatrix;
use image::GrayImage;

/// Global binarization at Otsu's level
pub fn otsu_binarize(gray: &GrayImage) -> BitMatrix {
    let level = imageproc::contrast::otsu_level(gray);
    threshold_binarize(gray, level)
}

/// Pixels at or below `threshold` become dark
pub fn threshold_binarize(gray: &GrayImage, threshold: u8) -> BitMatrix {
    BitMatrix::from_fn(gray.width() as usize, gray.height() as usize, |x, y| {
        gray.get_pixel(x as u32, y as u32)[0] <= threshold
    })
}

/// Local-mean binarization over a `(2r+1)²` window using an integral image.
///
/// A pixel is dark when it is below the window mean minus `bias`.
pub fn adaptive_binarize(gray: &GrayImage, radius: u32, bias: i32) -> BitMatrix {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    let integral = integral_image(gray);
    let stride = width + 1;
    let r = radius as usize;

    BitMatrix::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(r);
        let y0 = y.saturating_sub(r);
        let x1 = (x + r + 1).min(width);
        let y1 = (y + r + 1).min(height);
        let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
            - integral[y0 * stride + x1]
            - integral[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        let value = gray.get_pixel(x as u32, y as u32)[0] as i64;
        let mean = (sum / count) as i64;
        value < mean - bias as i64
    })
}

/// Summed-area table with a zero first row/column
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    let stride = width + 1;
    let mut table = vec![0u64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }
    table
}
