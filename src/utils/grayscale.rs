//! Grayscale conversion with BT.601 weights
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (77*R + 150*G + 29*B) >> 8

use image::{DynamicImage, GrayImage, RgbImage};

/// Coefficients for grayscale conversion; they sum to 256
const COEF_R: u32 = 77;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Convert an RGB raster to 8-bit luminance
pub fn rgb_to_luma(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let mut gray = Vec::with_capacity(width as usize * height as usize);
    for px in rgb.as_raw().chunks_exact(3) {
        gray.push(luma_of(px[0], px[1], px[2]));
    }
    // Buffer length equals width * height by construction
    GrayImage::from_raw(width, height, gray).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Luminance view of any decoded image; 8-bit gray input is copied as-is
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        DynamicImage::ImageRgb8(rgb) => rgb_to_luma(rgb),
        other => rgb_to_luma(&other.to_rgb8()),
    }
}

#[inline]
fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_primary_colors() {
        let mut rgb = RgbImage::new(4, 1);
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));
        rgb.put_pixel(1, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(2, 0, Rgb([0, 255, 0]));
        rgb.put_pixel(3, 0, Rgb([0, 0, 255]));
        let gray = rgb_to_luma(&rgb);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 76);
        assert_eq!(gray.get_pixel(2, 0)[0], 149);
        assert_eq!(gray.get_pixel(3, 0)[0], 28);
    }

    #[test]
    fn test_gray_passthrough() {
        let gray = GrayImage::from_pixel(3, 2, image::Luma([42]));
        let out = to_luma(&DynamicImage::ImageLuma8(gray.clone()));
        assert_eq!(out, gray);
    }
}
