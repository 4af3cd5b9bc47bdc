//! Utility functions for image processing
//!
//! - Grayscale conversion (BT.601 luminance)
//! - Binarization (Otsu, fixed threshold, local mean)
//! - Geometry (perspective transforms, quad rectification)

pub mod binarization;
pub mod geometry;
pub mod grayscale;
