//! Preprocessing bank: seven independent rasters derived from one source.
//!
//! Each variant is a pure function of the input; none depends on another.
//! Together they cover upscaling for small symbols, local and global
//! binarization for uneven light, contrast equalization for washed-out
//! prints, and morphology for thin or bleeding ink.

pub mod clahe;
pub mod morphology;
pub mod threshold;

use crate::utils::grayscale::rgb_to_luma;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

/// Which transform produced a variant, in bank order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Source raster unchanged
    Identity,
    /// 2x bicubic upscale
    Upscale2x,
    /// Gaussian-weighted adaptive threshold (block 31, C = 10)
    AdaptiveThreshold,
    /// Global Otsu threshold
    Otsu,
    /// CLAHE (clip 2.0, 8x8 tiles)
    Clahe,
    /// 3x3 dilation, one pass
    Dilate,
    /// 3x3 erosion, one pass
    Erode,
}

impl VariantKind {
    /// All variants in the order they are tried
    pub const ALL: [VariantKind; 7] = [
        VariantKind::Identity,
        VariantKind::Upscale2x,
        VariantKind::AdaptiveThreshold,
        VariantKind::Otsu,
        VariantKind::Clahe,
        VariantKind::Dilate,
        VariantKind::Erode,
    ];

    /// Short tag used in logs and file names
    pub fn tag(&self) -> &'static str {
        match self {
            VariantKind::Identity => "identity",
            VariantKind::Upscale2x => "upscale2x",
            VariantKind::AdaptiveThreshold => "adaptive",
            VariantKind::Otsu => "otsu",
            VariantKind::Clahe => "clahe",
            VariantKind::Dilate => "dilate",
            VariantKind::Erode => "erode",
        }
    }

    /// Pixels in the variant per pixel of the source, per axis
    pub fn scale(&self) -> f32 {
        match self {
            VariantKind::Upscale2x => 2.0,
            _ => 1.0,
        }
    }
}

/// One transformed raster
#[derive(Debug, Clone)]
pub struct ImageVariant {
    /// Producing transform
    pub kind: VariantKind,
    /// Transformed raster (RGB for identity/upscale, gray otherwise)
    pub image: DynamicImage,
}

/// Parameters of the fixed transform set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessingBank {
    /// Adaptive threshold neighbourhood (odd)
    pub adaptive_block: u32,
    /// Adaptive threshold offset
    pub adaptive_c: i32,
    /// CLAHE clip limit
    pub clahe_clip: f32,
    /// CLAHE tiles per axis
    pub clahe_grid: u32,
}

impl Default for PreprocessingBank {
    fn default() -> Self {
        Self {
            adaptive_block: 31,
            adaptive_c: 10,
            clahe_clip: 2.0,
            clahe_grid: 8,
        }
    }
}

impl PreprocessingBank {
    /// All seven variants, in order
    pub fn variants(&self, image: &RgbImage) -> Vec<ImageVariant> {
        self.iter(image).collect()
    }

    /// Lazily render variants so each can be dropped after use
    pub fn iter<'a>(&'a self, image: &'a RgbImage) -> impl Iterator<Item = ImageVariant> + 'a {
        let gray = rgb_to_luma(image);
        VariantKind::ALL
            .into_iter()
            .map(move |kind| self.render(kind, image, &gray))
    }

    /// Render a single variant from the source and its luminance
    pub fn render(&self, kind: VariantKind, image: &RgbImage, gray: &GrayImage) -> ImageVariant {
        let image = match kind {
            VariantKind::Identity => DynamicImage::ImageRgb8(image.clone()),
            VariantKind::Upscale2x => DynamicImage::ImageRgb8(imageops::resize(
                image,
                image.width() * 2,
                image.height() * 2,
                FilterType::CatmullRom,
            )),
            VariantKind::AdaptiveThreshold => DynamicImage::ImageLuma8(
                threshold::adaptive_gaussian_threshold(gray, self.adaptive_block, self.adaptive_c),
            ),
            VariantKind::Otsu => DynamicImage::ImageLuma8(threshold::otsu_threshold(gray)),
            VariantKind::Clahe => DynamicImage::ImageLuma8(clahe::clahe(
                gray,
                self.clahe_clip,
                self.clahe_grid,
                self.clahe_grid,
            )),
            VariantKind::Dilate => DynamicImage::ImageLuma8(morphology::dilate3x3(gray)),
            VariantKind::Erode => DynamicImage::ImageLuma8(morphology::erode3x3(gray)),
        };
        ImageVariant { kind, image }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample() -> RgbImage {
        RgbImage::from_fn(24, 16, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([30, 40, 50])
            } else {
                Rgb([220, 210, 200])
            }
        })
    }

    #[test]
    fn test_bank_produces_seven_ordered_variants() {
        let variants = PreprocessingBank::default().variants(&sample());
        let kinds: Vec<VariantKind> = variants.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, VariantKind::ALL.to_vec());
    }

    #[test]
    fn test_variant_dimensions_follow_scale() {
        for variant in PreprocessingBank::default().variants(&sample()) {
            let scale = variant.kind.scale() as u32;
            assert_eq!(variant.image.width(), 24 * scale, "{}", variant.kind.tag());
            assert_eq!(variant.image.height(), 16 * scale, "{}", variant.kind.tag());
        }
    }

    #[test]
    fn test_identity_is_unchanged() {
        let source = sample();
        let variants = PreprocessingBank::default().variants(&source);
        assert_eq!(variants[0].image.as_rgb8(), Some(&source));
    }

    #[test]
    fn test_bank_is_deterministic() {
        let source = sample();
        let bank = PreprocessingBank::default();
        let a = bank.variants(&source);
        let b = bank.variants(&source);
        for (va, vb) in a.iter().zip(b.iter()) {
            assert_eq!(va.image.as_bytes(), vb.image.as_bytes(), "{}", va.kind.tag());
        }
    }

    #[test]
    fn test_binary_variants_only_contain_extremes() {
        let variants = PreprocessingBank::default().variants(&sample());
        for kind in [VariantKind::AdaptiveThreshold, VariantKind::Otsu] {
            let gray = variants
                .iter()
                .find(|v| v.kind == kind)
                .and_then(|v| v.image.as_luma8())
                .unwrap();
            assert!(gray.pixels().all(|p| p[0] == 0 || p[0] == 255));
        }
    }
}
