//! Multi-symbol reader: every decodable grid in one pass.

use super::{DecodeBackend, Symbol, read_grids};
use crate::models::{Point, Quad};
use image::GrayImage;

/// Finds and decodes all symbols in a raster at once.
///
/// Grids that are located but fail error correction are skipped; this
/// backend only reports readable symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiSymbolBackend;

impl DecodeBackend for MultiSymbolBackend {
    fn name(&self) -> &'static str {
        "multi"
    }

    fn decode(&self, gray: &GrayImage) -> Vec<Symbol> {
        read_grids(gray)
            .into_iter()
            .map(|(payload, bounds)| Symbol::decoded(payload, quad_from_bounds(&bounds)))
            .collect()
    }
}

fn quad_from_bounds(bounds: &[rqrr::Point; 4]) -> Quad {
    Quad::new(bounds.map(|p| Point::new(p.x as f32, p.y as f32)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_from_bounds() {
        let bounds = [
            rqrr::Point { x: 1, y: 2 },
            rqrr::Point { x: 30, y: 2 },
            rqrr::Point { x: 30, y: 31 },
            rqrr::Point { x: 1, y: 31 },
        ];
        let quad = quad_from_bounds(&bounds);
        assert_eq!(quad.envelope(), (1.0, 2.0, 30.0, 31.0));
    }
}
