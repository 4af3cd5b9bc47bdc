//! Geometric reader: finder patterns → outline → rectified read.
//!
//! The symbol is located from its three finder patterns, warped onto a
//! clean square with a white quiet zone, and only then decoded. At most
//! one symbol is reported per call.

use super::{DecodeBackend, Symbol, read_grids};
use crate::detector::finder::{FinderDetector, FinderPattern};
use crate::detector::grouping::{SymbolGeometry, candidate_geometries};
use crate::models::Quad;
use crate::utils::binarization::{adaptive_binarize, otsu_binarize};
use crate::utils::geometry::warp_to_square;
use image::{GrayImage, Luma};

/// Finder-pattern based single-symbol reader
#[derive(Debug, Clone, Copy)]
pub struct GeometricBackend {
    /// Candidate finder triples tried before giving up
    pub max_groups: usize,
    /// Resolution of the rectified symbol
    pub pixels_per_module: u32,
    /// Quiet zone added around the rectified symbol, in modules
    pub quiet_zone: u32,
}

impl Default for GeometricBackend {
    fn default() -> Self {
        Self {
            max_groups: 8,
            pixels_per_module: 6,
            quiet_zone: 4,
        }
    }
}

impl GeometricBackend {
    fn finder_patterns(gray: &GrayImage) -> Vec<FinderPattern> {
        let patterns = FinderDetector::detect(&otsu_binarize(gray));
        if patterns.len() >= 3 {
            return patterns;
        }
        // Uneven light defeats a global level
        let fallback = FinderDetector::detect(&adaptive_binarize(gray, 15, 8));
        if fallback.len() > patterns.len() {
            fallback
        } else {
            patterns
        }
    }

    /// Rectify the symbol described by `geometry` and try to read it
    fn read(&self, gray: &GrayImage, geometry: &SymbolGeometry) -> Option<String> {
        let size = geometry.dimension as u32 * self.pixels_per_module;
        let margin = self.quiet_zone * self.pixels_per_module;
        let warped = warp_to_square(gray, &geometry.outer_corners(), size, margin, Luma([255]))?;
        read_grids(&warped).into_iter().next().map(|(payload, _)| payload)
    }
}

impl DecodeBackend for GeometricBackend {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn decode(&self, gray: &GrayImage) -> Vec<Symbol> {
        let patterns = Self::finder_patterns(gray);
        let geometries = candidate_geometries(&patterns, self.max_groups);
        let Some(best) = geometries.first() else {
            return Vec::new();
        };

        for geometry in &geometries {
            if let Some(payload) = self.read(gray, geometry) {
                return vec![Symbol::decoded(payload, Quad::new(geometry.outer_corners()))];
            }
        }

        tracing::trace!(
            groups = geometries.len(),
            "symbol outline found but no group decoded"
        );
        vec![Symbol::unreadable(Quad::new(best.outer_corners()))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three finder patterns and nothing else: located, never readable
    fn finders_only(unit: u32, origin: u32) -> GrayImage {
        let dim = 21;
        let size = origin * 2 + dim * unit;
        GrayImage::from_fn(size, size, |x, y| {
            if x < origin || y < origin || x >= origin + dim * unit || y >= origin + dim * unit {
                return Luma([255]);
            }
            let (mx, my) = ((x - origin) / unit, (y - origin) / unit);
            let local = |m: u32| if m >= dim - 7 { Some(m - (dim - 7)) } else if m < 7 { Some(m) } else { None };
            let in_finder = match (mx, my) {
                (mx, my) if mx < 7 && my < 7 => Some((mx, my)),
                (mx, my) if mx >= dim - 7 && my < 7 => local(mx).map(|lx| (lx, my)),
                (mx, my) if mx < 7 && my >= dim - 7 => local(my).map(|ly| (mx, ly)),
                _ => None,
            };
            match in_finder {
                Some((fx, fy)) => {
                    let ring = fx == 0 || fx == 6 || fy == 0 || fy == 6;
                    let stone = (2..=4).contains(&fx) && (2..=4).contains(&fy);
                    if ring || stone { Luma([0]) } else { Luma([255]) }
                }
                None => Luma([255]),
            }
        })
    }

    #[test]
    fn test_unreadable_outline_reported() {
        let gray = finders_only(5, 20);
        let symbols = GeometricBackend::default().decode(&gray);
        assert_eq!(symbols.len(), 1);
        assert!(symbols[0].payload.is_none());

        // Outline should hug the 105 px symbol starting at (20, 20)
        let (x0, y0, x1, y1) = symbols[0].quad.envelope();
        assert!((x0 - 20.0).abs() < 3.0, "x0 = {x0}");
        assert!((y0 - 20.0).abs() < 3.0, "y0 = {y0}");
        assert!((x1 - 125.0).abs() < 3.0, "x1 = {x1}");
        assert!((y1 - 125.0).abs() < 3.0, "y1 = {y1}");
    }
}
