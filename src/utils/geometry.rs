//! Perspective transforms and quad rectification

use crate::models::{Point, Quad};
use image::{ImageBuffer, Pixel, RgbImage};

/// Homography mapping one plane onto another (h33 fixed to 1)
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    h: [f64; 8],
}

impl PerspectiveTransform {
    /// Transform taking each `src[i]` to `dst[i]`; `None` if the corners are degenerate
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Direct linear transform: two equations per correspondence
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);
            a[2 * i] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy, dx];
            a[2 * i + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy, dy];
        }
        solve_augmented(a).map(|h| Self { h })
    }

    /// Map a point through the transform
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let h = &self.h;
        let w = h[6] * x + h[7] * y + 1.0;
        if w.abs() < 1e-12 {
            return Point::new(f32::NAN, f32::NAN);
        }
        Point::new(
            ((h[0] * x + h[1] * y + h[2]) / w) as f32,
            ((h[3] * x + h[4] * y + h[5]) / w) as f32,
        )
    }
}

/// Gauss-Jordan elimination with partial pivoting on an 8x9 augmented matrix
fn solve_augmented(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-10 {
            return None;
        }
        a.swap(col, pivot);
        let lead = a[col][col];
        for v in a[col].iter_mut() {
            *v /= lead;
        }
        let pivot_row = a[col];
        for (row, line) in a.iter_mut().enumerate() {
            if row == col || line[col] == 0.0 {
                continue;
            }
            let factor = line[col];
            for (v, p) in line.iter_mut().zip(pivot_row.iter()) {
                *v -= factor * p;
            }
        }
    }
    let mut h = [0.0f64; 8];
    for (i, v) in h.iter_mut().enumerate() {
        *v = a[i][8];
    }
    Some(h)
}

/// Bilinear sample of every channel at a sub-pixel position; false outside
fn sample_bilinear<P>(src: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32, out: &mut [u8]) -> bool
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = src.dimensions();
    if !(x.is_finite() && y.is_finite()) || x < -0.5 || y < -0.5 {
        return false;
    }
    let fx = (x - 0.5).max(0.0);
    let fy = (y - 0.5).max(0.0);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    if x0 >= w || y0 >= h {
        return false;
    }
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;
    let p00 = src.get_pixel(x0, y0).channels();
    let p10 = src.get_pixel(x1, y0).channels();
    let p01 = src.get_pixel(x0, y1).channels();
    let p11 = src.get_pixel(x1, y1).channels();
    for (c, slot) in out.iter_mut().enumerate() {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        *slot = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    true
}

/// Warp the region bounded by `corners` (TL, TR, BR, BL) into an axis-aligned
/// `size x size` square, surrounded by `margin` pixels of `fill`.
pub fn warp_to_square<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    corners: &[Point; 4],
    size: u32,
    margin: u32,
    fill: P,
) -> Option<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    warp_rect(src, corners, size, size, margin, fill)
}

fn warp_rect<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    corners: &[Point; 4],
    out_w: u32,
    out_h: u32,
    margin: u32,
    fill: P,
) -> Option<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    if out_w == 0 || out_h == 0 {
        return None;
    }
    let (w, h) = (out_w as f32, out_h as f32);
    let target = [
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ];
    // Inverse mapping: output pixel centre -> source position
    let back = PerspectiveTransform::from_points(&target, corners)?;
    let channels = P::CHANNEL_COUNT as usize;
    let mut scratch = [0u8; 4];
    let total_w = out_w + 2 * margin;
    let total_h = out_h + 2 * margin;
    Some(ImageBuffer::from_fn(total_w, total_h, |ox, oy| {
        if ox < margin || oy < margin || ox >= margin + out_w || oy >= margin + out_h {
            return fill;
        }
        let local = Point::new((ox - margin) as f32 + 0.5, (oy - margin) as f32 + 0.5);
        let at = back.transform(&local);
        if sample_bilinear(src, at.x, at.y, &mut scratch[..channels]) {
            *P::from_slice(&scratch[..channels])
        } else {
            fill
        }
    }))
}

/// Perspective-rectified crop of a quadrilateral.
///
/// Output width is the longer of the top/bottom edges and height the longer
/// of the left/right edges, so the crop keeps the symbol's resolution.
pub fn rectify(image: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let corners = quad.ordered();
    let [tl, tr, br, bl] = corners;
    let out_w = tl.distance(&tr).max(bl.distance(&br)).round() as u32;
    let out_h = tl.distance(&bl).max(tr.distance(&br)).round() as u32;
    if out_w < 2 || out_h < 2 {
        return None;
    }
    warp_rect(image, &corners, out_w, out_h, 0, image::Rgb([255, 255, 255]))
}
