//! Merging decode attempts into one payload-unique result set.
//!
//! Attempts arrive in tie-break order (region, then variant, then backend)
//! and the first decode of a payload wins. Geometry is mapped from the
//! raster the backend saw back into source pixels before anything is kept.

use crate::backends::Symbol;
use crate::models::{BoundingBox, DetectedCode, Quad, ResultSet};
use crate::utils::geometry::rectify;
use image::RgbImage;
use image::imageops::crop_imm;

/// Overlap (of the smaller box) above which two detections are one code
const SAME_CODE_OVERLAP: f32 = 0.5;

/// Where a backend's raster sits inside the source image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Source pixel of the raster's top-left corner
    pub origin: (f32, f32),
    /// Raster pixels per source pixel
    pub scale: f32,
}

impl Placement {
    /// The raster is the source itself
    #[cfg(test)]
    pub(crate) fn source() -> Self {
        Self::scaled(1.0)
    }

    /// A whole-image variant resampled by `scale`
    pub fn scaled(scale: f32) -> Self {
        Self {
            origin: (0.0, 0.0),
            scale,
        }
    }

    /// An unscaled crop starting at the region's corner
    pub fn region(region: &BoundingBox) -> Self {
        Self {
            origin: (region.x as f32, region.y as f32),
            scale: 1.0,
        }
    }
}

/// What happened to one symbol offered to the merger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new entry was appended
    Added,
    /// The payload was already present; the later find was discarded
    Duplicate,
    /// Unreadable geometry that policy or overlap excluded, or a rect
    /// with no area inside the image
    Discarded,
}

/// Accumulates one scan's results
pub struct Merger<'a> {
    source: &'a RgbImage,
    results: ResultSet,
    record_unreadable: bool,
}

impl<'a> Merger<'a> {
    /// Empty merger over `source`
    pub fn new(source: &'a RgbImage, record_unreadable: bool) -> Self {
        Self {
            source,
            results: ResultSet::new(),
            record_unreadable,
        }
    }

    /// Offer one backend symbol found in a raster placed at `placement`
    pub fn accept(&mut self, symbol: Symbol, placement: &Placement) -> MergeOutcome {
        if let Some(payload) = symbol.payload.as_deref() {
            if self.results.contains_payload(payload) {
                return MergeOutcome::Duplicate;
            }
        } else if !self.record_unreadable {
            return MergeOutcome::Discarded;
        }

        let (width, height) = self.source.dimensions();
        let quad = symbol.quad.to_parent(placement.origin, placement.scale);
        let Some(rect) = BoundingBox::enclosing(&quad, width, height) else {
            return MergeOutcome::Discarded;
        };

        match symbol.payload {
            Some(payload) => {
                // A successful read replaces earlier "unreadable" sightings of it
                self.results
                    .remove_unreadable_where(|c| c.rect.overlap_ratio(&rect) > SAME_CODE_OVERLAP);
                let crop = self.crop(&quad, &rect);
                self.results.insert_decoded(DetectedCode {
                    payload: Some(payload),
                    rect,
                    crop,
                });
                MergeOutcome::Added
            }
            None => {
                if self
                    .results
                    .iter()
                    .any(|c| c.rect.overlap_ratio(&rect) > SAME_CODE_OVERLAP)
                {
                    return MergeOutcome::Discarded;
                }
                let crop = self.crop(&quad, &rect);
                self.results.insert_unreadable(DetectedCode {
                    payload: None,
                    rect,
                    crop,
                });
                MergeOutcome::Added
            }
        }
    }

    /// Perspective-rectified crop, or the plain rect when the warp degenerates
    fn crop(&self, quad: &Quad, rect: &BoundingBox) -> RgbImage {
        rectify(self.source, quad)
            .unwrap_or_else(|| crop_imm(self.source, rect.x, rect.y, rect.width, rect.height).to_image())
    }

    #[cfg(test)]
    pub(crate) fn results(&self) -> &ResultSet {
        &self.results
    }

    /// Distinct decoded payloads so far
    pub fn unique_payloads(&self) -> usize {
        self.results.unique_payloads()
    }

    /// Hand the results to the caller
    pub fn finish(self) -> ResultSet {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn source() -> RgbImage {
        RgbImage::from_pixel(400, 400, Rgb([250, 250, 250]))
    }

    fn square(x: f32, y: f32, side: f32) -> Quad {
        Quad::from_rect(x, y, side, side)
    }

    #[test]
    fn test_region_offset_is_applied() {
        let image = source();
        let mut merger = Merger::new(&image, false);
        let region = BoundingBox::new(100, 200, 120, 120);
        let outcome = merger.accept(
            Symbol::decoded("A".into(), square(10.0, 10.0, 50.0)),
            &Placement::region(&region),
        );
        assert_eq!(outcome, MergeOutcome::Added);
        let code = merger.results().get("A").unwrap();
        assert_eq!(code.rect, BoundingBox::new(110, 210, 50, 50));
        assert_eq!(code.crop.dimensions(), (50, 50));
    }

    #[test]
    fn test_scaled_variant_maps_back() {
        let image = source();
        let mut merger = Merger::new(&image, false);
        merger.accept(
            Symbol::decoded("A".into(), square(40.0, 60.0, 100.0)),
            &Placement::scaled(2.0),
        );
        assert_eq!(merger.results().get("A").unwrap().rect, BoundingBox::new(20, 30, 50, 50));
    }

    #[test]
    fn test_first_decode_wins() {
        let image = source();
        let mut merger = Merger::new(&image, false);
        merger.accept(Symbol::decoded("A".into(), square(0.0, 0.0, 30.0)), &Placement::source());
        let outcome = merger.accept(
            Symbol::decoded("A".into(), square(200.0, 200.0, 80.0)),
            &Placement::source(),
        );
        assert_eq!(outcome, MergeOutcome::Duplicate);
        assert_eq!(merger.results().len(), 1);
        assert_eq!(merger.results().get("A").unwrap().rect.x, 0);
    }

    #[test]
    fn test_unreadable_respects_policy() {
        let image = source();
        let mut merger = Merger::new(&image, false);
        let outcome = merger.accept(Symbol::unreadable(square(5.0, 5.0, 40.0)), &Placement::source());
        assert_eq!(outcome, MergeOutcome::Discarded);
        assert!(merger.results().is_empty());

        let mut merger = Merger::new(&image, true);
        let outcome = merger.accept(Symbol::unreadable(square(5.0, 5.0, 40.0)), &Placement::source());
        assert_eq!(outcome, MergeOutcome::Added);
        assert!(merger.results().has_unreadable());
    }

    #[test]
    fn test_unreadable_sightings_collapse() {
        let image = source();
        let mut merger = Merger::new(&image, true);
        merger.accept(Symbol::unreadable(square(5.0, 5.0, 40.0)), &Placement::source());
        let again = merger.accept(Symbol::unreadable(square(8.0, 6.0, 40.0)), &Placement::source());
        assert_eq!(again, MergeOutcome::Discarded);
        assert_eq!(merger.results().len(), 1);
    }

    #[test]
    fn test_decode_supersedes_unreadable() {
        let image = source();
        let mut merger = Merger::new(&image, true);
        merger.accept(Symbol::unreadable(square(5.0, 5.0, 40.0)), &Placement::source());
        merger.accept(Symbol::unreadable(square(300.0, 300.0, 40.0)), &Placement::source());
        merger.accept(Symbol::decoded("X".into(), square(6.0, 6.0, 38.0)), &Placement::source());

        let results = merger.finish();
        assert_eq!(results.len(), 2);
        assert_eq!(results.unique_payloads(), 1);
        let rects: Vec<u32> = results.iter().map(|c| c.rect.x).collect();
        assert_eq!(rects, vec![300, 6]);
    }

    #[test]
    fn test_rect_outside_image_is_discarded() {
        let image = source();
        let mut merger = Merger::new(&image, false);
        let outcome = merger.accept(
            Symbol::decoded("far".into(), square(500.0, 500.0, 20.0)),
            &Placement::source(),
        );
        assert_eq!(outcome, MergeOutcome::Discarded);
    }
}
