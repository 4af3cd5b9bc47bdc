//! Grayscale 3x3 dilation (local max) and erosion (local min).
//! Pixels outside the image do not take part in the window.

use image::GrayImage;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

/// One pass of 3x3 dilation: bright regions grow
pub fn dilate3x3(gray: &GrayImage) -> GrayImage {
    grayscale_dilate(gray, &Mask::square(1))
}

/// One pass of 3x3 erosion: dark regions grow
pub fn erode3x3(gray: &GrayImage) -> GrayImage {
    grayscale_erode(gray, &Mask::square(1))
}
