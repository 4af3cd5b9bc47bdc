use super::Quad;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Integer box in source-image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels (> 0 once accepted)
    pub width: u32,
    /// Height in pixels (> 0 once accepted)
    pub height: u32,
}

impl BoundingBox {
    /// Create a box without clipping
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates, clipped to `[0, bound_w] x [0, bound_h]`.
    ///
    /// Returns `None` when the clipped box has no area.
    pub fn from_corners(x1: i64, y1: i64, x2: i64, y2: i64, bound_w: u32, bound_h: u32) -> Option<Self> {
        let cx1 = x1.clamp(0, bound_w as i64);
        let cy1 = y1.clamp(0, bound_h as i64);
        let cx2 = x2.clamp(0, bound_w as i64);
        let cy2 = y2.clamp(0, bound_h as i64);
        if cx2 <= cx1 || cy2 <= cy1 {
            return None;
        }
        Some(Self::new(
            cx1 as u32,
            cy1 as u32,
            (cx2 - cx1) as u32,
            (cy2 - cy1) as u32,
        ))
    }

    /// Envelope of a quadrilateral, rounded outward and clipped
    pub fn enclosing(quad: &Quad, bound_w: u32, bound_h: u32) -> Option<Self> {
        let (x0, y0, x1, y1) = quad.envelope();
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        Self::from_corners(
            x0.floor() as i64,
            y0.floor() as i64,
            x1.ceil() as i64,
            y1.ceil() as i64,
            bound_w,
            bound_h,
        )
    }

    /// Clip an existing box to image bounds
    pub fn clipped(&self, bound_w: u32, bound_h: u32) -> Option<Self> {
        Self::from_corners(
            self.x as i64,
            self.y as i64,
            self.right() as i64,
            self.bottom() as i64,
            bound_w,
            bound_h,
        )
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in pixels
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Area shared with another box
    pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return 0;
        }
        (x2 - x1) as u64 * (y2 - y1) as u64
    }

    /// Intersection divided by the smaller of the two areas
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f32 / smaller as f32
    }
}

/// One located code. `payload == None` marks a symbol that was found
/// geometrically but could not be decoded.
#[derive(Debug, Clone)]
pub struct DetectedCode {
    /// Decoded text, if any
    pub payload: Option<String>,
    /// Envelope in source-image pixels
    pub rect: BoundingBox,
    /// Rectified crop taken from the source raster
    pub crop: RgbImage,
}

impl DetectedCode {
    /// Whether the payload was decoded
    pub fn is_readable(&self) -> bool {
        self.payload.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_clips_to_bounds() {
        let b = BoundingBox::from_corners(-5, 10, 120, 40, 100, 100).unwrap();
        assert_eq!(b, BoundingBox::new(0, 10, 100, 30));
    }

    #[test]
    fn test_from_corners_rejects_empty() {
        assert!(BoundingBox::from_corners(10, 10, 10, 20, 100, 100).is_none());
        assert!(BoundingBox::from_corners(150, 10, 200, 20, 100, 100).is_none());
    }

    #[test]
    fn test_enclosing_rounds_outward() {
        let quad = Quad::from_rect(10.4, 10.6, 49.2, 49.0);
        let b = BoundingBox::enclosing(&quad, 200, 200).unwrap();
        assert_eq!(b, BoundingBox::new(10, 10, 50, 50));
    }

    #[test]
    fn test_overlap_ratio() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let inner = BoundingBox::new(2, 2, 4, 4);
        let apart = BoundingBox::new(20, 20, 5, 5);
        assert_eq!(a.overlap_ratio(&inner), 1.0);
        assert_eq!(a.overlap_ratio(&apart), 0.0);
        let half = BoundingBox::new(5, 0, 10, 10);
        assert!((a.overlap_ratio(&half) - 0.5).abs() < 1e-6);
    }
}
